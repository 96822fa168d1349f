//! Device boundary - the "get data" and "set mock distance" commands.
//!
//! Command numbers follow the Linux `_IOC` encoding so existing user-space
//! consumers keep working:
//!
//! ```text
//! bits 31-30  direction (1 = write, 2 = read)
//! bits 29-16  argument size
//! bits 15-8   type (magic 'S')
//! bits  7-0   number
//! ```

use crate::error::TransportError;
use crate::interface::SensorHandle;
use crate::wire::WireReading;

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;

const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

/// Magic number of the sensor's command space.
pub const SENSOR_MAGIC: u8 = b'S';

const fn ioc(dir: u32, ty: u8, nr: u8, size: usize) -> u32 {
    (dir << IOC_DIRSHIFT)
        | ((size as u32) << IOC_SIZESHIFT)
        | ((ty as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
}

/// `_IOR(type, nr, size)`
pub const fn ior(ty: u8, nr: u8, size: usize) -> u32 {
    ioc(IOC_READ, ty, nr, size)
}

/// `_IOW(type, nr, size)`
pub const fn iow(ty: u8, nr: u8, size: usize) -> u32 {
    ioc(IOC_WRITE, ty, nr, size)
}

/// Reads the latest `WireReading` into the caller's buffer.
pub const IOCTL_GET_DATA: u32 = ior(SENSOR_MAGIC, 1, WireReading::SIZE);

/// Writes one little-endian `i32` distance from the caller's buffer.
pub const IOCTL_SET_MOCK_DISTANCE: u32 = iow(SENSOR_MAGIC, 2, std::mem::size_of::<i32>());

/// Transport-facing view of a running sensor.
///
/// Cheap to clone; any number of callers may use it concurrently.
#[derive(Debug, Clone)]
pub struct SensorDevice {
    sensor: SensorHandle,
}

impl SensorDevice {
    /// Wraps a sensor handle.
    pub fn new(sensor: SensorHandle) -> Self {
        Self { sensor }
    }

    /// "Get data": the latest reading in wire form.
    pub fn get_data(&self) -> WireReading {
        WireReading::from(self.sensor.read())
    }

    /// "Set mock distance": fault-injects `distance_mm`.
    pub fn set_mock_distance(&self, distance_mm: i32) {
        self.sensor.inject_distance(distance_mm);
    }

    /// Dispatches a raw command against a caller buffer.
    ///
    /// The sensor operation completes before any copy is attempted (get) or
    /// is skipped entirely when the argument cannot be copied in (set), so a
    /// copy fault never leaves the state half-updated.
    pub fn ioctl(&self, cmd: u32, arg: &mut [u8]) -> Result<(), TransportError> {
        match cmd {
            IOCTL_GET_DATA => {
                let bytes = self.get_data().to_le_bytes();
                copy_to_user(arg, &bytes)
            }
            IOCTL_SET_MOCK_DISTANCE => {
                let distance_mm = copy_from_user(arg)?;
                self.set_mock_distance(distance_mm);
                Ok(())
            }
            _ => Err(TransportError::InvalidCommand(cmd)),
        }
    }
}

fn copy_to_user(dst: &mut [u8], src: &[u8]) -> Result<(), TransportError> {
    let supplied = dst.len();
    let dst = dst.get_mut(..src.len()).ok_or(TransportError::Fault {
        needed: src.len(),
        supplied,
    })?;
    dst.copy_from_slice(src);
    Ok(())
}

fn copy_from_user(src: &[u8]) -> Result<i32, TransportError> {
    let bytes: [u8; 4] = src
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or(TransportError::Fault {
            needed: 4,
            supplied: src.len(),
        })?;
    Ok(i32::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorConfig;
    use crate::safety::StatusCode;
    use crate::state::SharedState;

    fn device() -> (SharedState, SensorDevice) {
        let state = SharedState::new(&SensorConfig::default());
        let device = SensorDevice::new(SensorHandle::new(state.clone()));
        (state, device)
    }

    #[test]
    fn test_command_numbers_match_linux_encoding() {
        assert_eq!(IOCTL_GET_DATA, 0x800C_5301);
        assert_eq!(IOCTL_SET_MOCK_DISTANCE, 0x4004_5302);
    }

    #[test]
    fn test_get_data_copies_wire_record() {
        let (_, device) = device();
        let mut buf = [0u8; WireReading::SIZE];

        device.ioctl(IOCTL_GET_DATA, &mut buf).unwrap();

        let wire = WireReading::from_le_bytes(&buf).unwrap();
        assert_eq!(wire.distance_mm, 100);
        assert_eq!(wire.status(), Ok(StatusCode::Normal));
    }

    #[test]
    fn test_set_mock_distance_via_ioctl() {
        let (state, device) = device();
        let mut arg = (-7i32).to_le_bytes();

        device.ioctl(IOCTL_SET_MOCK_DISTANCE, &mut arg).unwrap();

        assert_eq!(state.snapshot().reading.distance_mm, -7);
        assert_eq!(device.get_data().distance_mm, -7);
    }

    #[test]
    fn test_short_buffers_fault_without_mutation() {
        let (state, device) = device();
        let before = state.snapshot();

        let mut small = [0u8; 8];
        assert_eq!(
            device.ioctl(IOCTL_GET_DATA, &mut small),
            Err(TransportError::Fault { needed: 12, supplied: 8 })
        );

        let mut short_arg = [1u8, 0];
        let err = device.ioctl(IOCTL_SET_MOCK_DISTANCE, &mut short_arg).unwrap_err();
        assert_eq!(err.errno(), -14);

        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let (_, device) = device();
        let mut buf = [0u8; 16];

        let err = device.ioctl(ior(SENSOR_MAGIC, 9, 4), &mut buf).unwrap_err();
        assert!(matches!(err, TransportError::InvalidCommand(_)));
        assert_eq!(err.errno(), -22);
    }
}
