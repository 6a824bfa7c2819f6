//! Hardware Abstraction Traits
//!
//! Diese Traits definieren Schnittstellen für Hardware-Zugriff
//! ohne konkrete Implementierung.

use rgb::RGB8;

use crate::storage::StoreError;

/// Fehler-Typ für LED-Operationen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedError {
    WriteFailed,
}

impl core::fmt::Display for LedError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LedError::WriteFailed => write!(f, "LED write failed"),
        }
    }
}

/// Trait für SmartLED Hardware-Zugriff
///
/// Abstrahiert den Zugriff auf RGB LEDs (WS2812/Neopixel), egal ob
/// externer Strip oder einzelne Onboard-LED.
///
/// # Implementierungen
/// - **Production:** RmtLedWriter (ESP32 RMT Peripheral)
/// - **Testing:** MockLedWriter (in-memory Mock)
pub trait SmartLedWriter: Send {
    /// Schreibt einen kompletten Frame (bereits helligkeitskorrigiert) auf die LEDs
    ///
    /// # Fehlerbehandlung
    /// Gibt `LedError::WriteFailed` zurück wenn Hardware-Zugriff fehlschlägt
    fn write(&mut self, colors: &[RGB8]) -> Result<(), LedError>;

    /// `true` wenn Änderungen sofort beim Schreiben übernommen werden sollen
    /// (Onboard-Indikator). `PixelBuffer::flush()` ist dann ein No-Op.
    fn writes_immediately(&self) -> bool {
        false
    }
}

/// Nichtflüchtiger Speicher für genau einen Skript-Slot
///
/// Der Slot enthält einen kodierten Datensatz (siehe [`crate::storage`]).
pub trait ScriptStore {
    /// Liest den rohen Slot-Inhalt in `buf`
    fn read(&mut self, buf: &mut [u8]) -> Result<(), StoreError>;

    /// Schreibt `data` an den Anfang des Slots
    fn write(&mut self, data: &[u8]) -> Result<(), StoreError>;
}
