// Alarm-Modus - blinkt einen Fehler-Status bis BOOT gedrückt wird
use defmt::{info, warn};
use embassy_time::{Duration, Instant, Timer};
use effekt_core::{AlertMode, AlertStep, PixelBuffer, SmartLedWriter, StatusCode};
use rgb::RGB8;

use crate::config::{ALERT_MAX_CYCLES, ALERT_POLL_MS};

/// Alarm Logic - blockiert den Effekt-Loop bis Tastendruck oder Aufgabe
///
/// Die Ablaufsteuerung (`AlertMode`) liegt in effekt-core, hier werden nur
/// Uhr, Taste und LED angeschlossen.
///
/// # Parameter
/// - `led`: Status-LED oder, falls geteilt, der Strip
/// - `code`: anzuzeigender Fehler-Status
/// - `pressed`: liefert den aktuellen Zustand des BOOT-Buttons
pub async fn alert_logic<W, const N: usize>(
    led: &mut PixelBuffer<W, N>,
    code: StatusCode,
    pressed: impl Fn() -> bool,
) where
    W: SmartLedWriter,
{
    warn!("Alert: {} (press BOOT to continue)", code.as_str());

    let mut alert = AlertMode::new(code, ALERT_MAX_CYCLES);
    let mut shown: Option<bool> = None;

    loop {
        match alert.poll(Instant::now().as_millis(), pressed()) {
            AlertStep::Show { color, on } => {
                if shown != Some(on) {
                    led.fill(if on { RGB8::from(color) } else { RGB8::default() });
                    if led.flush().is_err() {
                        warn!("Alert: LED write failed");
                    }
                    shown = Some(on);
                }
            }
            AlertStep::Escaped => {
                info!("Alert: Escaped by button");
                break;
            }
            AlertStep::GaveUp => {
                info!("Alert: Gave up after {} cycles", ALERT_MAX_CYCLES);
                break;
            }
        }
        Timer::after(Duration::from_millis(ALERT_POLL_MS)).await;
    }

    led.fill(RGB8::default());
    let _ = led.flush();
}
