//! StatusIndicator - Gerätezustand als Farbe auf einer eigenen Status-LED
//!
//! Zwei unabhängige Verhalten:
//! - Heartbeat: 1 s Periode, halbe Helligkeit in der zweiten Hälfte
//! - [`AlertMode`]: blinkt die Statusfarbe und wartet begrenzt auf einen Tastendruck

use rgb::RGB8;

/// Periode des Heartbeats in Millisekunden
pub const HEARTBEAT_PERIOD_MS: u64 = 1_000;

/// Grundhelligkeit der Status-LED
pub const STATUS_BRIGHTNESS: f32 = 0.1;

/// Halbe Periode des Alarm-Blinkens in Millisekunden
pub const ALERT_HALF_PERIOD_MS: u64 = 500;

/// Gerätezustand, jeder Code hat eine feste Farbe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusCode {
    Ok,
    LinkFailed,
    BrokerFailed,
    BrokerRetrying,
}

impl StatusCode {
    pub const fn color(self) -> RGB8 {
        match self {
            StatusCode::Ok => RGB8::new(0, 255, 0),
            StatusCode::LinkFailed => RGB8::new(255, 0, 0),
            StatusCode::BrokerFailed => RGB8::new(255, 40, 0),
            StatusCode::BrokerRetrying => RGB8::new(0, 0, 255),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Ok => "Ok",
            StatusCode::LinkFailed => "LinkFailed",
            StatusCode::BrokerFailed => "BrokerFailed",
            StatusCode::BrokerRetrying => "BrokerRetrying",
        }
    }
}

/// Was die Status-LED gerade zeigen soll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusFrame {
    pub color: RGB8,
    pub brightness: f32,
}

pub struct StatusIndicator {
    code: StatusCode,
    shared_with_strip: bool,
}

impl StatusIndicator {
    /// `shared_with_strip`: Status-LED und Effekt-Strip sind dasselbe Gerät
    pub fn new(shared_with_strip: bool) -> Self {
        Self {
            code: StatusCode::Ok,
            shared_with_strip,
        }
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn set_code(&mut self, code: StatusCode) {
        self.code = code;
    }

    pub fn is_shared(&self) -> bool {
        self.shared_with_strip
    }

    /// Heartbeat-Frame für den Zeitpunkt `now_ms`
    ///
    /// `None` wenn die LED mit dem Strip geteilt wird (Effekte nicht überschreiben).
    pub fn update(&self, now_ms: u64) -> Option<StatusFrame> {
        if self.shared_with_strip {
            return None;
        }
        let second_half = now_ms % HEARTBEAT_PERIOD_MS >= HEARTBEAT_PERIOD_MS / 2;
        let brightness = if second_half {
            STATUS_BRIGHTNESS / 2.0
        } else {
            STATUS_BRIGHTNESS
        };
        Some(StatusFrame {
            color: self.code.color(),
            brightness,
        })
    }
}

/// Schritt des Alarm-Modus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlertStep {
    /// Farbe anzeigen (`on`) oder LED aus
    Show { color: [u8; 3], on: bool },
    /// Taste gedrückt, Alarm beendet
    Escaped,
    /// Maximale Anzahl Zyklen erreicht
    GaveUp,
}

/// Blockierender Diagnose-Modus als begrenzte State Machine
///
/// Uhr und Taste werden von außen eingespeist, damit der Ablauf ohne
/// Hardware testbar ist.
pub struct AlertMode {
    color: RGB8,
    max_cycles: u32,
    started_ms: Option<u64>,
}

impl AlertMode {
    pub fn new(code: StatusCode, max_cycles: u32) -> Self {
        Self {
            color: code.color(),
            max_cycles,
            started_ms: None,
        }
    }

    /// Nächster Schritt zum Zeitpunkt `now_ms` mit aktuellem Tastenzustand
    pub fn poll(&mut self, now_ms: u64, button_pressed: bool) -> AlertStep {
        if button_pressed {
            return AlertStep::Escaped;
        }
        let started = *self.started_ms.get_or_insert(now_ms);
        let half_periods = now_ms.saturating_sub(started) / ALERT_HALF_PERIOD_MS;
        if half_periods >= 2 * self.max_cycles as u64 {
            return AlertStep::GaveUp;
        }
        AlertStep::Show {
            color: self.color.into(),
            on: half_periods % 2 == 0,
        }
    }
}
