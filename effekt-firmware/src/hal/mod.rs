// Hardware Abstraction Layer (HAL) Module
//
// Implementiert die Traits aus effekt-core für die echte Hardware.
// Die Logik selbst liegt in effekt-core und wird dort getestet.

pub mod button;
pub mod flash_store;
pub mod led_writer;

pub use button::BootButton;
pub use flash_store::FlashScriptStore;
pub use led_writer::{RmtLedWriter, rmt_buffer_size};
