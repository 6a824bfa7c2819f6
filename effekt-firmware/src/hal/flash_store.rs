// Boot-Skript-Slot im internen Flash
//
// Ein Sektor ab SCRIPT_FLASH_OFFSET. Schreiben löscht den Sektor und
// schreibt den Datensatz neu, Lesen liefert den rohen Inhalt.

use effekt_core::storage::RECORD_CAPACITY;
use effekt_core::{ScriptStore, StoreError};
use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use esp_storage::FlashStorage;

/// Flash-Sektorgröße des ESP32-C6
const SECTOR_SIZE: u32 = 4096;

/// Schreib-Ausrichtung von FlashStorage
const WORD_SIZE: usize = 4;

// Datensatz muss in einen Sektor und in ganze Worte passen
const _: () = assert!(RECORD_CAPACITY <= SECTOR_SIZE as usize);
const _: () = assert!(RECORD_CAPACITY % WORD_SIZE == 0);

pub struct FlashScriptStore {
    flash: FlashStorage<'static>,
    offset: u32,
}

impl FlashScriptStore {
    /// `offset` muss auf einen Sektor ausgerichtet sein
    pub fn new(flash: FlashStorage<'static>, offset: u32) -> Self {
        Self { flash, offset }
    }
}

impl ScriptStore for FlashScriptStore {
    fn read(&mut self, buf: &mut [u8]) -> Result<(), StoreError> {
        if buf.len() > RECORD_CAPACITY {
            return Err(StoreError::TooLarge);
        }
        let aligned = buf.len().next_multiple_of(WORD_SIZE);
        let mut raw = [0u8; RECORD_CAPACITY];
        self.flash
            .read(self.offset, &mut raw[..aligned])
            .map_err(|_| StoreError::Driver)?;
        buf.copy_from_slice(&raw[..buf.len()]);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StoreError> {
        if data.len() > RECORD_CAPACITY {
            return Err(StoreError::TooLarge);
        }
        // Rest mit 0xFF auffüllen (gelöschter Zustand)
        let aligned = data.len().next_multiple_of(WORD_SIZE);
        let mut raw = [0xFFu8; RECORD_CAPACITY];
        raw[..data.len()].copy_from_slice(data);

        self.flash
            .erase(self.offset, self.offset + SECTOR_SIZE)
            .map_err(|_| StoreError::Driver)?;
        self.flash
            .write(self.offset, &raw[..aligned])
            .map_err(|_| StoreError::Driver)
    }
}
