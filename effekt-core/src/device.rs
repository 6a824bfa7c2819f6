//! DeviceContext - besitzt alle Geräte-Handles und führt einen Loop-Durchlauf aus
//!
//! Reihenfolge pro Durchlauf (vom Firmware-Task getaktet):
//! 1. [`DeviceContext::update_status`]
//! 2. [`DeviceContext::dispatch`] für maximal [`DISPATCH_BATCH`] Nachrichten
//! 3. [`DeviceContext::render`]: Boot-Tick, Event-Tick, Compositing, Flush
//!
//! Compositing: Event überschreibt Boot. Ein erfolgreicher Trigger macht die
//! Event-Ebene sichtbar, ein neu geladenes Skript (Boot oder Event) schaltet
//! zurück auf die Boot-Ebene.

use crate::buffer::{PixelBuffer, RangeError};
use crate::connectivity::TriggerFilter;
use crate::manager::{BootScript, EventScript, LoadOutcome, RestoreOutcome};
use crate::script::ScriptSyntaxError;
use crate::sequencer::LoopPolicy;
use crate::status::{StatusCode, StatusIndicator};
use crate::storage::StoreError;
use crate::traits::{LedError, ScriptStore, SmartLedWriter};
use crate::types::{ControlTopic, InboundMessage};

/// Maximale Anzahl Nachrichten pro Loop-Durchlauf
pub const DISPATCH_BATCH: usize = 4;

/// Ergebnis einer erfolgreich verarbeiteten Nachricht
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchOutcome {
    Length(usize),
    Brightness(f32),
    BootScript(LoadOutcome),
    EventScript(LoadOutcome),
    /// Neuer Token, `started == false` wenn kein Event-Skript geladen ist
    Triggered { started: bool },
    /// Gleicher Token wie zuletzt
    DuplicateTrigger,
}

/// Fehler beim Verarbeiten einer einzelnen Nachricht
///
/// Betrifft nie andere Nachrichten oder den Loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Payload ist keine gültige Zahl
    InvalidNumber,
    Range(RangeError),
    Syntax(ScriptSyntaxError),
    /// Boot-Skript ist aktiv, wurde aber nicht gespeichert
    Storage(StoreError),
}

impl From<RangeError> for DispatchError {
    fn from(e: RangeError) -> Self {
        DispatchError::Range(e)
    }
}

impl From<ScriptSyntaxError> for DispatchError {
    fn from(e: ScriptSyntaxError) -> Self {
        DispatchError::Syntax(e)
    }
}

impl core::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DispatchError::InvalidNumber => write!(f, "payload is not a number"),
            DispatchError::Range(e) => write!(f, "{}", e),
            DispatchError::Syntax(e) => write!(f, "{}", e),
            DispatchError::Storage(e) => write!(f, "script active but not stored: {}", e),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DispatchError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            DispatchError::InvalidNumber => defmt::write!(fmt, "InvalidNumber"),
            DispatchError::Range(e) => defmt::write!(fmt, "Range({})", e),
            DispatchError::Syntax(e) => defmt::write!(fmt, "Syntax({})", e),
            DispatchError::Storage(e) => defmt::write!(fmt, "Storage({})", e),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DispatchOutcome {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            DispatchOutcome::Length(n) => defmt::write!(fmt, "Length({})", n),
            DispatchOutcome::Brightness(b) => defmt::write!(fmt, "Brightness({})", b),
            DispatchOutcome::BootScript(o) => defmt::write!(fmt, "BootScript({})", o),
            DispatchOutcome::EventScript(o) => defmt::write!(fmt, "EventScript({})", o),
            DispatchOutcome::Triggered { started } => {
                defmt::write!(fmt, "Triggered {{ started: {} }}", started)
            }
            DispatchOutcome::DuplicateTrigger => defmt::write!(fmt, "DuplicateTrigger"),
        }
    }
}

/// Alle Geräte-Handles in einem Wert, gehört dem Effekt-Loop
///
/// - `W`: Writer des Effekt-Strips
/// - `SW`: Writer der Status-LED
/// - `S`: Speicher für das Boot-Skript
pub struct DeviceContext<W, SW, S, const N: usize>
where
    W: SmartLedWriter,
    SW: SmartLedWriter,
    S: ScriptStore,
{
    strip: PixelBuffer<W, N>,
    status_led: Option<PixelBuffer<SW, 1>>,
    status: StatusIndicator,
    boot: BootScript<S, N>,
    event: EventScript<N>,
    triggers: TriggerFilter,
    event_visible: bool,
}

impl<W, SW, S, const N: usize> DeviceContext<W, SW, S, N>
where
    W: SmartLedWriter,
    SW: SmartLedWriter,
    S: ScriptStore,
{
    /// `status_led == None`: Strip und Status-LED sind dasselbe Gerät,
    /// der Heartbeat wird unterdrückt.
    pub fn new(
        strip: PixelBuffer<W, N>,
        status_led: Option<PixelBuffer<SW, 1>>,
        store: S,
        policy: LoopPolicy,
    ) -> Self {
        let shared = status_led.is_none();
        Self {
            strip,
            status_led,
            status: StatusIndicator::new(shared),
            boot: BootScript::new(store, policy),
            event: EventScript::new(policy),
            triggers: TriggerFilter::new(),
            event_visible: false,
        }
    }

    pub fn strip(&self) -> &PixelBuffer<W, N> {
        &self.strip
    }

    pub fn status_led(&self) -> Option<&PixelBuffer<SW, 1>> {
        self.status_led.as_ref()
    }

    pub fn boot(&self) -> &BootScript<S, N> {
        &self.boot
    }

    pub fn event(&self) -> &EventScript<N> {
        &self.event
    }

    pub fn status(&self) -> StatusCode {
        self.status.code()
    }

    /// `true` wenn gerade die Event-Ebene angezeigt wird
    pub fn event_visible(&self) -> bool {
        self.event_visible
    }

    /// Boot-Skript aus dem Speicher laden (einmal beim Start)
    pub fn restore(&mut self) -> RestoreOutcome {
        self.boot.load_persisted()
    }

    pub fn set_status(&mut self, code: StatusCode) {
        self.status.set_code(code);
    }

    /// Heartbeat auf die Status-LED schreiben
    pub fn update_status(&mut self, now_ms: u64) -> Result<(), LedError> {
        let (Some(frame), Some(led)) = (self.status.update(now_ms), self.status_led.as_mut())
        else {
            return Ok(());
        };
        // update() liefert nur STATUS_BRIGHTNESS oder die Hälfte, ein RangeError
        // ist ausgeschlossen und wird verworfen
        let _ = led.set_brightness(frame.brightness);
        led.fill(frame.color);
        led.flush()
    }

    /// Verarbeitet genau eine Steuer-Nachricht
    pub fn dispatch(&mut self, msg: &InboundMessage) -> Result<DispatchOutcome, DispatchError> {
        let payload = msg.payload.as_str();
        match msg.topic {
            ControlTopic::Length => {
                let length: usize = payload
                    .trim()
                    .parse()
                    .map_err(|_| DispatchError::InvalidNumber)?;
                self.strip.set_length(length)?;
                Ok(DispatchOutcome::Length(length))
            }
            ControlTopic::Brightness => {
                let brightness: f32 = payload
                    .trim()
                    .parse()
                    .map_err(|_| DispatchError::InvalidNumber)?;
                self.strip.set_brightness(brightness)?;
                Ok(DispatchOutcome::Brightness(brightness))
            }
            ControlTopic::InitScript => match self.boot.load(payload)? {
                LoadOutcome::Unchanged => Ok(DispatchOutcome::BootScript(LoadOutcome::Unchanged)),
                LoadOutcome::NotPersisted(e) => {
                    self.event_visible = false;
                    Err(DispatchError::Storage(e))
                }
                outcome => {
                    self.event_visible = false;
                    Ok(DispatchOutcome::BootScript(outcome))
                }
            },
            ControlTopic::EventScript => {
                let outcome = self.event.load(payload)?;
                if outcome != LoadOutcome::Unchanged {
                    self.event_visible = false;
                }
                Ok(DispatchOutcome::EventScript(outcome))
            }
            ControlTopic::EventTrigger => {
                if self.triggers.is_repeat(payload) {
                    return Ok(DispatchOutcome::DuplicateTrigger);
                }
                // Nur ein Trigger, der wirklich startet, verbraucht den Payload
                let started = self.event.trigger();
                if started {
                    self.triggers.remember(payload);
                    self.event_visible = true;
                }
                Ok(DispatchOutcome::Triggered { started })
            }
        }
    }

    /// Beide Sequencer weiterschalten, sichtbare Ebene übernehmen, flushen
    pub fn render(&mut self, elapsed: f32) -> Result<(), LedError> {
        let length = self.strip.len();
        self.boot.tick(elapsed, length);
        self.event.tick(elapsed, length);
        let frame = if self.event_visible {
            self.event.frame()
        } else {
            self.boot.frame()
        };
        self.strip.write_frame(frame);
        self.strip.flush()
    }
}
