//! PixelBuffer
//!
//! In-Memory Farb-Array plus Flush-Primitive zur Hardware. Abstrahiert über
//! verschiedene Ziele (externer Strip vs. einzelne Onboard-LED) via
//! [`SmartLedWriter`].

use heapless::Vec;
use rgb::RGB8;

use crate::logic::scale_color;
use crate::traits::{LedError, SmartLedWriter};

/// Ungültige Länge oder Helligkeit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangeError {
    Length,
    Brightness,
}

impl core::fmt::Display for RangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RangeError::Length => write!(f, "length out of range"),
            RangeError::Brightness => write!(f, "brightness out of range"),
        }
    }
}

/// Farb-Buffer für bis zu `N` Pixel
///
/// Invariante: `1 <= length <= max_length <= N` und `colors.len() == length`.
pub struct PixelBuffer<W: SmartLedWriter, const N: usize> {
    writer: W,
    max_length: usize,
    brightness: f32,
    colors: Vec<RGB8, N>,
}

impl<W: SmartLedWriter, const N: usize> PixelBuffer<W, N> {
    /// Erstellt einen schwarzen Buffer mit `length == max_length`
    ///
    /// `max_length` wird auf `1..=N` begrenzt.
    pub fn new(writer: W, max_length: usize, brightness: f32) -> Self {
        let max_length = max_length.clamp(1, N.max(1));
        let mut colors = Vec::new();
        colors.resize(max_length, RGB8::default()).ok();
        Self {
            writer,
            max_length,
            brightness: brightness.clamp(0.0, 1.0),
            colors,
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn colors(&self) -> &[RGB8] {
        &self.colors
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Setzt die aktive Pixel-Anzahl, vorhandene Farben bleiben erhalten
    pub fn set_length(&mut self, length: usize) -> Result<(), RangeError> {
        if length < 1 || length > self.max_length {
            return Err(RangeError::Length);
        }
        self.colors
            .resize(length, RGB8::default())
            .map_err(|_| RangeError::Length)?;
        self.push_if_immediate();
        Ok(())
    }

    /// Setzt die Helligkeit, nur Werte aus `[0, 1]` werden akzeptiert
    pub fn set_brightness(&mut self, brightness: f32) -> Result<(), RangeError> {
        if !(0.0..=1.0).contains(&brightness) {
            return Err(RangeError::Brightness);
        }
        self.brightness = brightness;
        self.push_if_immediate();
        Ok(())
    }

    /// Setzt ein einzelnes Pixel (Index außerhalb von `length` wird ignoriert)
    pub fn write(&mut self, index: usize, color: RGB8) {
        if let Some(pixel) = self.colors.get_mut(index) {
            *pixel = color;
            self.push_if_immediate();
        }
    }

    /// Setzt alle Pixel auf eine Farbe
    pub fn fill(&mut self, color: RGB8) {
        self.colors.iter_mut().for_each(|pixel| *pixel = color);
        self.push_if_immediate();
    }

    /// Übernimmt einen kompletten Frame in einem Schritt
    ///
    /// Fehlende Pixel werden schwarz, überzählige ignoriert.
    pub fn write_frame(&mut self, frame: &[RGB8]) {
        for (i, pixel) in self.colors.iter_mut().enumerate() {
            *pixel = frame.get(i).copied().unwrap_or_default();
        }
        self.push_if_immediate();
    }

    /// Schiebt Farben und Helligkeit zur Hardware
    ///
    /// Für Backends mit sofortiger Übernahme ein No-Op.
    pub fn flush(&mut self) -> Result<(), LedError> {
        if self.writer.writes_immediately() {
            return Ok(());
        }
        self.push()
    }

    fn push_if_immediate(&mut self) {
        if self.writer.writes_immediately() {
            // Sofort-Backend: Fehler hier sind nicht behebbar, der nächste Write versucht es erneut
            let _ = self.push();
        }
    }

    fn push(&mut self) -> Result<(), LedError> {
        let mut scaled: Vec<RGB8, N> = Vec::new();
        for &color in self.colors.iter() {
            scaled
                .push(scale_color(color, self.brightness))
                .map_err(|_| LedError::WriteFailed)?;
        }
        self.writer.write(&scaled)
    }
}
