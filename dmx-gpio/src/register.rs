//! Direct-register backend for the BCM283x GPIO block
//!
//! Maps the 4 KiB GPIO register window exposed by `/dev/gpiomem` into
//! process memory and drives pins by writing the set/clear registers
//! directly. Level writes are single volatile stores to write-only
//! registers (no read-modify-write), which is what makes them cheap
//! enough for the 4 us bit-banging loop.
//!
//! Register layout (32-bit words from the window base):
//! - `GPFSEL0..5` at words 0-5: function select, 3 bits per pin,
//!   10 pins per word, `0b001` = output.
//! - `GPSET0..1` at words 7-8: write 1 to drive a pin high,
//!   bank = pin / 32, bit = pin % 32.
//! - `GPCLR0..1` at words 10-11: write 1 to drive a pin low.

use std::ffi::CString;
use std::io;
use std::ptr;

use tracing::debug;

use crate::error::GpioError;
use crate::types::Level;
use crate::GpioBackend;

/// Default register device on Raspberry Pi OS
pub const GPIO_DEVICE: &str = "/dev/gpiomem";

/// Number of GPIOs the register block controls
pub(crate) const PIN_COUNT: u8 = 54;

/// Size of the mapped register window
const MAP_LEN: usize = 4096;

/// Word offsets into the register window
const FSEL_BASE: usize = 0;
const SET_BASE: usize = 7;
const CLR_BASE: usize = 10;

/// Function select value for a plain output pin
const FSEL_OUTPUT: u32 = 0b001;

/// Live mapping of the register window
struct Mapping {
    base: *mut u32,
    fd: libc::c_int,
}

impl Drop for Mapping {
    fn drop(&mut self) {
        // Safety: base/MAP_LEN describe exactly the region mmap returned,
        // and fd is the descriptor it was mapped from.
        unsafe {
            libc::munmap(self.base.cast::<libc::c_void>(), MAP_LEN);
            libc::close(self.fd);
        }
        debug!("GPIO register window unmapped");
    }
}

/// Memory-mapped GPIO backend
///
/// `init` must succeed before any pin operation; the daemon treats an
/// unopenable or unmappable device as fatal.
pub struct RegisterGpio {
    device: String,
    map: Option<Mapping>,
}

impl RegisterGpio {
    /// Create a backend for the default register device
    pub fn new() -> Self {
        Self::with_device(GPIO_DEVICE)
    }

    /// Create a backend for a specific register device path
    pub fn with_device(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            map: None,
        }
    }

    fn mapping(&self) -> Result<&Mapping, GpioError> {
        self.map.as_ref().ok_or(GpioError::NotInitialized)
    }
}

impl Default for RegisterGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioBackend for RegisterGpio {
    fn name(&self) -> &'static str {
        "register"
    }

    fn init(&mut self) -> Result<(), GpioError> {
        if self.map.is_some() {
            return Ok(());
        }

        let path = CString::new(self.device.as_str()).map_err(|_| GpioError::DeviceOpen {
            path: self.device.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"),
        })?;

        // Safety: path is a valid NUL-terminated string.
        let fd = unsafe { libc::open(path.as_ptr(), libc::O_RDWR | libc::O_SYNC) };
        if fd < 0 {
            return Err(GpioError::DeviceOpen {
                path: self.device.clone(),
                source: io::Error::last_os_error(),
            });
        }

        // Safety: fd is a freshly opened register device; the kernel
        // validates the length and offset.
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                MAP_LEN,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            let source = io::Error::last_os_error();
            // Safety: fd is open and owned by this call.
            unsafe { libc::close(fd) };
            return Err(GpioError::Map {
                path: self.device.clone(),
                source,
            });
        }

        self.map = Some(Mapping {
            base: base.cast::<u32>(),
            fd,
        });
        debug!(device = %self.device, "GPIO register window mapped");
        Ok(())
    }

    fn set_output(&mut self, pin: u8) -> Result<(), GpioError> {
        if pin >= PIN_COUNT {
            return Err(GpioError::InvalidPin(pin));
        }
        let map = self.mapping()?;

        let reg = FSEL_BASE + pin as usize / 10;
        let shift = (pin as usize % 10) * 3;

        // Function select is 3 bits per pin and shares a word with nine
        // neighbours, so this one is a read-modify-write.
        // Safety: reg < 6 is inside the mapped window.
        unsafe {
            let addr = map.base.add(reg);
            let mut val = ptr::read_volatile(addr);
            val &= !(0b111 << shift);
            val |= FSEL_OUTPUT << shift;
            ptr::write_volatile(addr, val);
        }
        debug!(pin, "pin configured as output");
        Ok(())
    }

    fn write(&mut self, pin: u8, level: Level) {
        debug_assert!(pin < PIN_COUNT);
        let Some(map) = self.map.as_ref() else {
            return;
        };

        let bank = pin as usize / 32;
        let bit = 1u32 << (pin % 32);
        let reg = match level {
            Level::High => SET_BASE + bank,
            Level::Low => CLR_BASE + bank,
        };

        // Safety: reg < 12 is inside the mapped window; set/clear
        // registers are write-only, a stray 1 bit only affects `pin`.
        unsafe {
            ptr::write_volatile(map.base.add(reg), bit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_pin_out_of_range() {
        let mut gpio = RegisterGpio::new();
        // Validation happens before the mapping is touched.
        let err = gpio.set_output(PIN_COUNT).unwrap_err();
        assert!(matches!(err, GpioError::InvalidPin(_)));
        assert_eq!(err.to_string(), "pin 54 out of range (0-53)");
    }

    #[test]
    fn init_fails_without_device() {
        let mut gpio = RegisterGpio::with_device("/dev/nonexistent-gpiomem");
        assert!(matches!(gpio.init(), Err(GpioError::DeviceOpen { .. })));
    }

    #[test]
    fn operations_require_init() {
        let mut gpio = RegisterGpio::new();
        assert!(matches!(
            gpio.set_output(5),
            Err(GpioError::NotInitialized)
        ));
        // Writes on an uninitialized backend are silently dropped.
        gpio.write(5, Level::High);
    }
}
