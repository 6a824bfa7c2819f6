// BOOT-Button (GPIO9) als Eingang mit Pull-Up

use esp_hal::gpio::{Input, InputConfig, InputPin, Pull};

pub struct BootButton {
    input: Input<'static>,
}

impl BootButton {
    pub fn new(pin: impl InputPin + 'static) -> Self {
        let input = Input::new(pin, InputConfig::default().with_pull(Pull::Up));
        Self { input }
    }

    /// Taste zieht den Pin auf Low
    pub fn is_pressed(&self) -> bool {
        self.input.is_low()
    }
}
