//! Gemeinsame Mocks für die Integration Tests

#![allow(dead_code)]

use effekt_core::storage::RECORD_CAPACITY;
use effekt_core::{
    DeviceContext, LedError, LoopPolicy, PixelBuffer, ScriptStore, SmartLedWriter, StoreError,
};
use rgb::RGB8;

pub const STRIP_LEN: usize = 20;

// ============================================================================
// Mock LED Writer
// ============================================================================

#[derive(Default)]
pub struct MockLedWriter {
    pub last_frame: Vec<RGB8>,
    pub write_count: usize,
    pub fail_next_write: bool,
    pub immediate: bool,
}

impl MockLedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verhält sich wie die Onboard-LED (sofortige Übernahme)
    pub fn immediate() -> Self {
        Self {
            immediate: true,
            ..Self::default()
        }
    }
}

impl SmartLedWriter for MockLedWriter {
    fn write(&mut self, colors: &[RGB8]) -> Result<(), LedError> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(LedError::WriteFailed);
        }

        self.last_frame = colors.to_vec();
        self.write_count += 1;
        Ok(())
    }

    fn writes_immediately(&self) -> bool {
        self.immediate
    }
}

// ============================================================================
// In-Memory Script Store
// ============================================================================

pub struct MemoryStore {
    pub data: Vec<u8>,
    pub write_count: usize,
    pub fail_writes: bool,
}

impl MemoryStore {
    /// Frisch gelöschter Flash
    pub fn erased() -> Self {
        Self {
            data: vec![0xFF; RECORD_CAPACITY],
            write_count: 0,
            fail_writes: false,
        }
    }
}

impl ScriptStore for MemoryStore {
    fn read(&mut self, buf: &mut [u8]) -> Result<(), StoreError> {
        let n = buf.len().min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Driver);
        }
        if data.len() > self.data.len() {
            return Err(StoreError::TooLarge);
        }
        self.data[..data.len()].copy_from_slice(data);
        self.write_count += 1;
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub type TestDevice = DeviceContext<MockLedWriter, MockLedWriter, MemoryStore, STRIP_LEN>;

pub fn device_with_store(store: MemoryStore) -> TestDevice {
    DeviceContext::new(
        PixelBuffer::new(MockLedWriter::new(), STRIP_LEN, 1.0),
        Some(PixelBuffer::new(MockLedWriter::immediate(), 1, 0.1)),
        store,
        LoopPolicy::Hold,
    )
}

pub fn device() -> TestDevice {
    device_with_store(MemoryStore::erased())
}

pub const RED: RGB8 = RGB8 { r: 255, g: 0, b: 0 };
pub const GREEN: RGB8 = RGB8 { r: 0, g: 255, b: 0 };
pub const BLUE: RGB8 = RGB8 { r: 0, g: 0, b: 255 };
pub const OFF: RGB8 = RGB8 { r: 0, g: 0, b: 0 };
