// Effekt Task - Skripte abspielen, Steuer-Nachrichten anwenden, Status-LED
use defmt::{error, info, warn};
use embassy_time::{Duration, Instant, Timer};
use esp_hal::Blocking;
use esp_hal::gpio::AnyPin;
use esp_hal::peripherals::RMT;
use esp_hal::rmt::{PulseCode, Rmt};
use esp_hal::time::Rate;
use esp_hal_smartled::smart_led_buffer;
use esp_storage::FlashStorage;
use static_cell::StaticCell;

use effekt_core::status::STATUS_BRIGHTNESS;
use effekt_core::{
    DISPATCH_BATCH, DeviceContext, DispatchOutcome, InboundMessage, LoopPolicy, PixelBuffer,
    RestoreOutcome, ScriptStore, SmartLedWriter, StatusCode,
};

use crate::config::{
    LOOP_PERIOD_MS, RMT_CLOCK_MHZ, SCRIPT_FLASH_OFFSET, STRIP_BRIGHTNESS, STRIP_CAPACITY,
};
use crate::hal::{BootButton, FlashScriptStore, RmtLedWriter, rmt_buffer_size};
use crate::tasks::alert::alert_logic;
use crate::{InboundReceiver, StatusSignal};

const STRIP_BUFFER_SIZE: usize = rmt_buffer_size(STRIP_CAPACITY);
const STATUS_BUFFER_SIZE: usize = rmt_buffer_size(1);

type StripWriter = RmtLedWriter<'static, STRIP_BUFFER_SIZE>;
type StatusWriter = RmtLedWriter<'static, STATUS_BUFFER_SIZE>;

static STRIP_BUFFER: StaticCell<[PulseCode; STRIP_BUFFER_SIZE]> = StaticCell::new();
static STATUS_BUFFER: StaticCell<[PulseCode; STATUS_BUFFER_SIZE]> = StaticCell::new();

/// Hardware für den Effekt-Loop
pub struct EffectsResources {
    pub rmt: RMT<'static>,
    pub strip_pin: AnyPin<'static>,
    /// `None`: Strip liegt auf der Onboard-LED
    pub status_pin: Option<AnyPin<'static>>,
    pub flash: FlashStorage<'static>,
    pub button: BootButton,
}

/// Effekt Logic - Testbare Schleife ohne Hardware-Abhängigkeit
///
/// Reihenfolge pro Durchlauf:
/// 1. Status übernehmen und Heartbeat schreiben
/// 2. höchstens `DISPATCH_BATCH` Steuer-Nachrichten anwenden
/// 3. Boot- und Event-Skript weiterschalten, sichtbare Ebene flushen
/// 4. Heartbeat zur halben Periode, dann bis zum Ende des Zeitbudgets schlafen
///
/// # Parameter
/// - `ctx`: alle Geräte-Handles (Strip, Status-LED, Skript-Speicher)
/// - `inbound`: Steuer-Nachrichten vom Netzwerk-Task
/// - `status`: Verbindungsstatus vom Netzwerk-Task
pub async fn effects_logic<W, SW, S, const N: usize>(
    mut ctx: DeviceContext<W, SW, S, N>,
    inbound: InboundReceiver,
    status: &'static StatusSignal,
) -> !
where
    W: SmartLedWriter,
    SW: SmartLedWriter,
    S: ScriptStore,
{
    match ctx.restore() {
        RestoreOutcome::Persisted => info!(
            "Effekt: Restored boot script ({} commands)",
            ctx.boot().manager().script().map_or(0, |s| s.len())
        ),
        RestoreOutcome::Default(e) => info!("Effekt: No stored boot script ({}), using default", e),
    }
    warn_coverage(&ctx);

    let period = Duration::from_millis(LOOP_PERIOD_MS);
    let mut last_render = Instant::now();

    loop {
        let started = Instant::now();

        refresh_status(&mut ctx, status, started);

        for _ in 0..DISPATCH_BATCH {
            let Ok(msg) = inbound.try_receive() else {
                break;
            };
            apply_message(&mut ctx, &msg);
        }

        let now = Instant::now();
        let elapsed = (now - last_render).as_micros() as f32 / 1_000_000.0;
        last_render = now;
        if ctx.render(elapsed).is_err() {
            error!("Effekt: Failed to write strip");
        }

        if Instant::now() > started + period {
            warn!("Effekt: Loop overran {} ms budget", LOOP_PERIOD_MS);
        }

        // Zweite Hälfte des Heartbeats
        Timer::at(started + period / 2).await;
        refresh_status(&mut ctx, status, Instant::now());

        Timer::at(started + period).await;
    }
}

/// Neuen Verbindungsstatus übernehmen und Status-LED aktualisieren
fn refresh_status<W, SW, S, const N: usize>(
    ctx: &mut DeviceContext<W, SW, S, N>,
    status: &StatusSignal,
    now: Instant,
) where
    W: SmartLedWriter,
    SW: SmartLedWriter,
    S: ScriptStore,
{
    if let Some(code) = status.try_take() {
        ctx.set_status(code);
    }
    if ctx.update_status(now.as_millis()).is_err() {
        warn!("Status: Failed to write status LED");
    }
}

/// Eine Steuer-Nachricht anwenden, Fehler betreffen nur diese Nachricht
fn apply_message<W, SW, S, const N: usize>(
    ctx: &mut DeviceContext<W, SW, S, N>,
    msg: &InboundMessage,
) where
    W: SmartLedWriter,
    SW: SmartLedWriter,
    S: ScriptStore,
{
    match ctx.dispatch(msg) {
        Ok(DispatchOutcome::DuplicateTrigger) => {}
        Ok(outcome) => {
            info!("Effekt: {}", outcome);
            if matches!(
                outcome,
                DispatchOutcome::Length(_)
                    | DispatchOutcome::BootScript(_)
                    | DispatchOutcome::EventScript(_)
            ) {
                warn_coverage(ctx);
            }
        }
        Err(e) => warn!("Effekt: {} rejected: {}", msg.topic, e),
    }
}

/// SlowFill-Segmente, die nicht zur aktuellen Länge passen, melden
fn warn_coverage<W, SW, S, const N: usize>(ctx: &DeviceContext<W, SW, S, N>)
where
    W: SmartLedWriter,
    SW: SmartLedWriter,
    S: ScriptStore,
{
    let length = ctx.strip().len();
    let scripts = [
        ("boot", ctx.boot().manager().script()),
        ("event", ctx.event().manager().script()),
    ];
    for (name, script) in scripts {
        if let Some(mismatch) = script.and_then(|s| s.coverage_mismatch(length)) {
            warn!(
                "Effekt: {} script command {} covers {} of {} pixels",
                name, mismatch.command_index, mismatch.covered, mismatch.length
            );
        }
    }
}

/// Effekt Task - Embassy Task für parallele Ausführung
///
/// Dieser Task übernimmt die Hardware-Initialisierung, zeigt bei einem
/// Startfehler den Alarm-Modus an und ruft dann die testbare
/// `effects_logic()` Funktion auf.
///
/// # Parameter
/// - `res`: RMT, Pins, Flash und BOOT-Button
/// - `strip_length`: konfigurierte Anzahl LEDs
/// - `alert`: Startfehler, der vor dem Loop angezeigt wird
/// - `inbound`: Steuer-Nachrichten vom Netzwerk-Task
/// - `status`: Verbindungsstatus vom Netzwerk-Task
#[embassy_executor::task]
pub async fn effects_task(
    res: EffectsResources,
    strip_length: usize,
    alert: Option<StatusCode>,
    inbound: InboundReceiver,
    status: &'static StatusSignal,
) {
    let rmt: Rmt<'static, Blocking> = match Rmt::new(res.rmt, Rate::from_mhz(RMT_CLOCK_MHZ)) {
        Ok(rmt) => rmt,
        Err(e) => {
            error!("Effekt: RMT init failed: {}", defmt::Debug2Format(&e));
            return;
        }
    };

    let strip_writer: StripWriter = RmtLedWriter::new(
        rmt.channel0,
        res.strip_pin,
        STRIP_BUFFER.init(smart_led_buffer!(STRIP_CAPACITY)),
        false,
    );
    let mut strip: PixelBuffer<StripWriter, STRIP_CAPACITY> =
        PixelBuffer::new(strip_writer, strip_length, STRIP_BRIGHTNESS);

    let mut status_led: Option<PixelBuffer<StatusWriter, 1>> = match res.status_pin {
        Some(pin) => {
            let writer: StatusWriter = RmtLedWriter::new(
                rmt.channel1,
                pin,
                STATUS_BUFFER.init(smart_led_buffer!(1)),
                true,
            );
            Some(PixelBuffer::new(writer, 1, STATUS_BRIGHTNESS))
        }
        None => None,
    };

    if let Some(code) = alert {
        let button = &res.button;
        match status_led.as_mut() {
            Some(led) => alert_logic(led, code, || button.is_pressed()).await,
            None => alert_logic(&mut strip, code, || button.is_pressed()).await,
        }
    }

    let store = FlashScriptStore::new(res.flash, SCRIPT_FLASH_OFFSET);
    let ctx = DeviceContext::new(strip, status_led, store, LoopPolicy::Hold);

    info!(
        "Effekt: Strip ready ({} LEDs, status LED {})",
        strip_length,
        if ctx.status_led().is_some() { "separate" } else { "shared" }
    );
    effects_logic(ctx, inbound, status).await
}
