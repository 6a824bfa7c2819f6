//! Datensatz-Format für den persistierten Boot-Skript-Slot
//!
//! ```text
//! Byte 0..4   Magic "AMBI"
//! Byte 4      XOR-Prüfsumme über Byte 0..4 und 6..8
//! Byte 5      XOR-Prüfsumme über die Skript-Bytes
//! Byte 6..8   Skript-Länge (u16, Big Endian)
//! Byte 8..    Skript (UTF-8)
//! ```

use heapless::String;

use crate::script::MAX_SCRIPT_LEN;

pub const RECORD_MAGIC: &[u8; 4] = b"AMBI";
pub const RECORD_HEADER_LEN: usize = 8;

/// Größe eines kompletten Slots in Bytes
pub const RECORD_CAPACITY: usize = RECORD_HEADER_LEN + MAX_SCRIPT_LEN;

/// Fehler beim Lesen/Schreiben des Skript-Slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Hardware-Zugriff fehlgeschlagen
    Driver,
    /// Kein Datensatz vorhanden (falsches Magic)
    Empty,
    /// Header- oder Skript-Prüfsumme stimmt nicht
    Corrupt,
    /// Skript passt nicht in den Slot
    TooLarge,
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StoreError::Driver => write!(f, "storage driver error"),
            StoreError::Empty => write!(f, "no stored script"),
            StoreError::Corrupt => write!(f, "stored script is corrupt"),
            StoreError::TooLarge => write!(f, "script too large for storage"),
        }
    }
}

fn xor(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

fn header_checksum(header: &[u8]) -> u8 {
    xor(&header[0..4]) ^ xor(&header[6..8])
}

/// Kodiert `script` in `out`, gibt die Anzahl geschriebener Bytes zurück
pub fn encode_record(script: &str, out: &mut [u8]) -> Result<usize, StoreError> {
    let bytes = script.as_bytes();
    let total = RECORD_HEADER_LEN + bytes.len();
    if bytes.len() > MAX_SCRIPT_LEN || total > out.len() {
        return Err(StoreError::TooLarge);
    }

    out[0..4].copy_from_slice(RECORD_MAGIC);
    out[6..8].copy_from_slice(&(bytes.len() as u16).to_be_bytes());
    out[4] = header_checksum(&out[..RECORD_HEADER_LEN]);
    out[5] = xor(bytes);
    out[RECORD_HEADER_LEN..total].copy_from_slice(bytes);
    Ok(total)
}

/// Dekodiert einen Datensatz aus dem rohen Slot-Inhalt
pub fn decode_record(raw: &[u8]) -> Result<String<MAX_SCRIPT_LEN>, StoreError> {
    if raw.len() < RECORD_HEADER_LEN || &raw[0..4] != RECORD_MAGIC {
        return Err(StoreError::Empty);
    }
    if raw[4] != header_checksum(&raw[..RECORD_HEADER_LEN]) {
        return Err(StoreError::Corrupt);
    }

    let len = u16::from_be_bytes([raw[6], raw[7]]) as usize;
    if len > MAX_SCRIPT_LEN || RECORD_HEADER_LEN + len > raw.len() {
        return Err(StoreError::Corrupt);
    }
    let payload = &raw[RECORD_HEADER_LEN..RECORD_HEADER_LEN + len];
    if raw[5] != xor(payload) {
        return Err(StoreError::Corrupt);
    }

    let text = core::str::from_utf8(payload).map_err(|_| StoreError::Corrupt)?;
    String::try_from(text).map_err(|_| StoreError::TooLarge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let mut buf = [0u8; 32];
        let n = encode_record("Fill #FF0000 1", &mut buf).unwrap();
        assert_eq!(n, 8 + 14);
        assert_eq!(&buf[0..4], b"AMBI");
        assert_eq!(&buf[6..8], &[0, 14]);
        assert_eq!(&buf[8..n], b"Fill #FF0000 1");
    }

    #[test]
    fn test_decode_reads_back_script() {
        let mut buf = [0xFFu8; 64];
        encode_record("Slide 1 2", &mut buf).unwrap();
        assert_eq!(decode_record(&buf).unwrap().as_str(), "Slide 1 2");
    }

    #[test]
    fn test_erased_flash_is_empty() {
        let buf = [0xFFu8; 64];
        assert_eq!(decode_record(&buf), Err(StoreError::Empty));
    }

    #[test]
    fn test_flipped_payload_byte_is_corrupt() {
        let mut buf = [0u8; 64];
        let n = encode_record("Fill #FF0000 1", &mut buf).unwrap();
        buf[n - 1] ^= 0x01;
        assert_eq!(decode_record(&buf), Err(StoreError::Corrupt));
    }

    #[test]
    fn test_flipped_length_is_corrupt() {
        let mut buf = [0u8; 64];
        encode_record("Fill #FF0000 1", &mut buf).unwrap();
        buf[7] ^= 0x02;
        assert_eq!(decode_record(&buf), Err(StoreError::Corrupt));
    }

    #[test]
    fn test_encode_rejects_small_buffer() {
        let mut buf = [0u8; 10];
        assert_eq!(
            encode_record("Fill #FF0000 1", &mut buf),
            Err(StoreError::TooLarge)
        );
    }
}
