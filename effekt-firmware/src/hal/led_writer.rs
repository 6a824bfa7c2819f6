// SmartLED Writer für ESP32 RMT
//
// Implementiert den SmartLedWriter Trait aus effekt-core für WS2812 LEDs
// an einem beliebigen Ausgang. Strip und Status-LED teilen sich das RMT
// Peripheral über getrennte Kanäle.

use effekt_core::{LedError, SmartLedWriter};
use esp_hal::Blocking;
use esp_hal::gpio::interconnect::PeripheralOutput;
use esp_hal::rmt::{PulseCode, TxChannelCreator};
use esp_hal_smartled::SmartLedsAdapter;
use rgb::RGB8;
use smart_leds_trait::SmartLedsWrite;

/// RMT Buffer-Größe für `leds` LEDs (3 Farben * 8 Bits pro LED + 1 Reset)
pub const fn rmt_buffer_size(leds: usize) -> usize {
    leds * 24 + 1
}

/// Real Hardware LED Writer
///
/// Nutzt einen RMT Kanal um WS2812 LEDs anzusteuern.
///
/// Hinweis: Der Buffer muss so lange leben wie der Writer, daher wird er
/// außerhalb erstellt (`smart_led_buffer!`) und als Parameter übergeben.
pub struct RmtLedWriter<'a, const BUFFER_SIZE: usize> {
    led: SmartLedsAdapter<'a, BUFFER_SIZE>,
    immediate: bool,
}

impl<'a, const BUFFER_SIZE: usize> RmtLedWriter<'a, BUFFER_SIZE> {
    /// Erstellt einen neuen RmtLedWriter
    ///
    /// # Parameter
    /// - `channel`: RMT TX-Kanal (z.B. `rmt.channel0`)
    /// - `pin`: GPIO für die LED-Datenleitung
    /// - `buffer`: Buffer für LED-Daten (erstellt mit `smart_led_buffer!`)
    /// - `immediate`: Onboard-Indikator, jede Änderung wird sofort sichtbar
    pub fn new<C, O>(
        channel: C,
        pin: O,
        buffer: &'a mut [PulseCode; BUFFER_SIZE],
        immediate: bool,
    ) -> Self
    where
        C: TxChannelCreator<'a, Blocking>,
        O: PeripheralOutput<'a>,
    {
        Self {
            led: SmartLedsAdapter::new(channel, pin, buffer),
            immediate,
        }
    }
}

impl<const BUFFER_SIZE: usize> SmartLedWriter for RmtLedWriter<'_, BUFFER_SIZE> {
    fn write(&mut self, colors: &[RGB8]) -> Result<(), LedError> {
        self.led
            .write(colors.iter().copied())
            .map_err(|_| LedError::WriteFailed)
    }

    fn writes_immediately(&self) -> bool {
        self.immediate
    }
}
