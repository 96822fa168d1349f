//! Wire record shared with existing consumers of the device.
//!
//! Layout (12 bytes, little-endian, no padding):
//!
//! ```text
//! offset  size  field
//!      0     4  timestamp    u32  (low 32 bits of the ms tick count)
//!      4     4  distance_mm  i32
//!      8     4  status_code  i32  (0 = normal, 1 = emergency stop)
//! ```

use crate::error::TransportError;
use crate::safety::StatusCode;
use crate::state::SensorReading;
use serde::{Deserialize, Serialize};

/// The `{timestamp, distance_mm, status_code}` triple as transmitted.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireReading {
    pub timestamp: u32,
    pub distance_mm: i32,
    pub status_code: i32,
}

impl WireReading {
    /// Encoded size in bytes.
    pub const SIZE: usize = 12;

    /// Encodes into the on-wire byte layout.
    pub fn to_le_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.distance_mm.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.status_code.to_le_bytes());
        bytes
    }

    /// Decodes from the on-wire byte layout. Extra trailing bytes are ignored.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self, TransportError> {
        if bytes.len() < Self::SIZE {
            return Err(TransportError::Fault {
                needed: Self::SIZE,
                supplied: bytes.len(),
            });
        }

        let word = |at: usize| [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]];
        let reading = Self {
            timestamp: u32::from_le_bytes(word(0)),
            distance_mm: i32::from_le_bytes(word(4)),
            status_code: i32::from_le_bytes(word(8)),
        };
        reading.status()?;
        Ok(reading)
    }

    /// Returns the typed status.
    pub fn status(&self) -> Result<StatusCode, TransportError> {
        StatusCode::from_code(self.status_code).ok_or(TransportError::InvalidStatus(self.status_code))
    }
}

impl From<SensorReading> for WireReading {
    fn from(reading: SensorReading) -> Self {
        Self {
            // Wraps like a 32-bit jiffies counter
            timestamp: reading.timestamp as u32,
            distance_mm: reading.distance_mm,
            status_code: reading.status_code.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_twelve_bytes() {
        assert_eq!(std::mem::size_of::<WireReading>(), WireReading::SIZE);
        assert_eq!(std::mem::align_of::<WireReading>(), 4);
    }

    #[test]
    fn test_field_order_and_endianness() {
        let wire = WireReading {
            timestamp: 0x0102_0304,
            distance_mm: -2,
            status_code: 1,
        };

        assert_eq!(
            wire.to_le_bytes(),
            [0x04, 0x03, 0x02, 0x01, 0xfe, 0xff, 0xff, 0xff, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_decode_rejects_short_buffer_and_bad_status() {
        assert_eq!(
            WireReading::from_le_bytes(&[0u8; 8]),
            Err(TransportError::Fault { needed: 12, supplied: 8 })
        );

        let mut bytes = WireReading::default().to_le_bytes();
        bytes[8] = 7;
        assert_eq!(WireReading::from_le_bytes(&bytes), Err(TransportError::InvalidStatus(7)));
    }

    #[test]
    fn test_from_reading_truncates_timestamp() {
        let reading = SensorReading {
            timestamp: (1u64 << 32) + 250,
            distance_mm: 8,
            status_code: StatusCode::EmergencyStop,
        };

        let wire = WireReading::from(reading);
        assert_eq!(wire.timestamp, 250);
        assert_eq!(wire.distance_mm, 8);
        assert_eq!(wire.status_code, 1);
        assert_eq!(wire.status(), Ok(StatusCode::EmergencyStop));
    }
}
