pub mod calibration;
pub mod compensation;
pub mod config;
pub mod driver;
pub mod spi;

use core::fmt;

use embedded_hal::blocking::delay::DelayUs;

use crate::dps310::config::Mode;

pub const SPI_READ_BIT: u8 = 0x80; // address byte bit 7: 1 = read, 0 = write

pub const PRS_B2_REG: u8 = 0x00; // pressure data, 3 bytes MSB first
pub const TMP_B2_REG: u8 = 0x03; // temperature data, 3 bytes MSB first
pub const PRS_CFG_REG: u8 = 0x06;
pub const TMP_CFG_REG: u8 = 0x07;
pub const MEAS_CFG_REG: u8 = 0x08;
pub const CFG_REG: u8 = 0x09;
pub const RESET_REG: u8 = 0x0c;
pub const PRODUCT_ID_REG: u8 = 0x0d;
pub const COEF_REG: u8 = 0x10; // 0x10 - 0x21
pub const COEF_SRCE_REG: u8 = 0x28;

pub const COEF_LEN: usize = 18;
pub const RAW_SAMPLE_LEN: usize = 3;

pub const PRODUCT_ID: u8 = 0x10;
pub const RESET_CMD: u8 = 0b1000_1001; // soft reset + FIFO flush

// PRS_CFG / TMP_CFG
pub const CFG_RATE_MSK: u8 = 0b0111_0000;
pub const CFG_PRC_MSK: u8 = 0b0000_1111;

// TMP_CFG / COEF_SRCE
pub const TMP_SRC_MSK: u8 = 0b1000_0000;

// MEAS_CFG
pub const MEAS_CFG_COEF_RDY: u8 = 0b1000_0000;
pub const MEAS_CFG_SENSOR_RDY: u8 = 0b0100_0000;
pub const MEAS_CFG_TMP_RDY: u8 = 0b0010_0000;
pub const MEAS_CFG_PRS_RDY: u8 = 0b0001_0000;
pub const MEAS_CFG_CTRL_MSK: u8 = 0b0000_0111;

// CFG_REG
pub const CFG_TMP_SHIFT_EN: u8 = 0b0000_1000;
pub const CFG_PRS_SHIFT_EN: u8 = 0b0000_0100;

pub const RESET_SETTLE_MS: u32 = 10;
pub const READY_POLL_MS: u32 = 20;
pub const CS_SETTLE_US: u32 = 1; // datasheet asks for 20 ns around every CS edge

/// Frame for a single register read: address with the read bit set, then one
/// dummy byte clocked out while the register value comes back.
pub const fn read_frame(register: u8) -> [u8; 2] {
    [register | SPI_READ_BIT, 0]
}

/// Frame for a single register write. The read bit is always cleared.
pub const fn write_frame(register: u8, value: u8) -> [u8; 2] {
    [register & !SPI_READ_BIT, value]
}

/// Half duplex register transport.
///
/// `frame` is written to the device and overwritten in place with the bytes
/// clocked back in, within one chip-select window.
pub trait Interface {
    type Error;

    fn transfer<D: DelayUs<u32>>(
        &mut self,
        frame: &mut [u8],
        delay: &mut D,
    ) -> Result<(), Self::Error>;
}

/// Errors raised by the driver. `E` is the error type of the bus transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error<E> {
    /// Transport failure. Never retried by the driver.
    Bus(E),
    /// PRODUCT_ID did not read back as 0x10.
    UnexpectedDeviceId(u8),
    /// Reserved mode encoding, or a single-shot mode while oversampling is armed.
    InvalidMode(Mode),
    /// Rate and oversampling of both channels violate the timing budget.
    InvalidRateOversamplingCombination,
    /// A readiness poll exhausted `Config::max_poll_attempts`.
    Timeout,
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "bus error: {:?}", e),
            Error::UnexpectedDeviceId(id) => {
                write!(f, "unexpected product id 0x{:02x}, expected 0x{:02x}", id, PRODUCT_ID)
            }
            Error::InvalidMode(mode) => write!(f, "invalid measurement mode {:?}", mode),
            Error::InvalidRateOversamplingCombination => {
                write!(f, "invalid rate/oversampling combination")
            }
            Error::Timeout => write!(f, "sensor did not become ready"),
        }
    }
}
