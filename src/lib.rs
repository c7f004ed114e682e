#![cfg_attr(not(test), no_std)]

//! Driver for the Infineon DPS310 barometric pressure and temperature sensor
//! over SPI.
//!
//! The driver brings the sensor out of reset, reads its factory calibration
//! block, arms rate and oversampling for both channels and turns the raw
//! 24-bit ADC samples into pressure (Pa), temperature (°C) and altitude (m).

pub mod dps310;
pub mod logger;

pub use crate::dps310::driver::Dps310;
pub use crate::dps310::spi::{SpiError, SpiInterface};
pub use crate::dps310::{Error, Interface};
