//! Conversion of raw ADC counts into physical units (datasheet section 4.9).

use libm::powf;

use crate::dps310::calibration::{sign_extend, Calibration};
use crate::dps310::config::Oversampling;
use crate::dps310::RAW_SAMPLE_LEN;

/// Reassembles a 24-bit two's complement sample from PRS_B2..B0 or TMP_B2..B0.
pub fn raw_sample(b: &[u8; RAW_SAMPLE_LEN]) -> i32 {
    sign_extend((b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32, 24)
}

/// Compensated temperature in °C.
pub fn temperature(cal: &Calibration, raw: i32, oversampling: Oversampling) -> f32 {
    let scaled = raw as f32 / oversampling.scale_factor();
    scaled * cal.c1 + cal.c0 / 2.0
}

/// Compensated pressure in Pa.
///
/// The temperature sample must come from the same measurement cycle, scaled
/// with the temperature channel's oversampling.
pub fn pressure(
    cal: &Calibration,
    raw_pressure: i32,
    pressure_oversampling: Oversampling,
    raw_temperature: i32,
    temperature_oversampling: Oversampling,
) -> f32 {
    let t = raw_temperature as f32 / temperature_oversampling.scale_factor();
    let p = raw_pressure as f32 / pressure_oversampling.scale_factor();

    cal.c00 + p * (cal.c10 + p * (cal.c20 + p * cal.c30)) + t * cal.c01 + p * t * (cal.c11 + p * cal.c21)
}

/// Altitude in m for a pressure in Pa against a sea-level reference in hPa.
pub fn altitude(pressure: f32, sea_level_pressure: f32) -> f32 {
    44330.0 * (1.0 - powf((pressure / 100.0) / sea_level_pressure, 0.1903))
}

/// Sea-level reference in hPa that makes `pressure` (Pa) read as `altitude` (m).
pub fn sea_level_pressure(pressure: f32, altitude: f32) -> f32 {
    (pressure / 100.0) * powf(1.0 - altitude / 44330.0, -5.255)
}
