//! Measurement rate, oversampling and operating mode of the DPS310.

use crate::dps310::{CFG_PRC_MSK, CFG_RATE_MSK, MEAS_CFG_CTRL_MSK};

const DEFAULT_RATE: Rate = Rate::Hz64;
const DEFAULT_OVERSAMPLING: Oversampling = Oversampling::X64;
const DEFAULT_MODE: Mode = Mode::ContinuousBoth;
const DEFAULT_MEASUREMENT_POLL_MS: u32 = 10;

/// Standard atmosphere at mean sea level, in hPa.
pub const STANDARD_SEA_LEVEL_PRESSURE: f32 = 1013.25;

/// Measurements per second (PM_RATE / TMP_RATE, register bits 6:4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Rate {
    #[default]
    Hz1 = 0,
    Hz2 = 1,
    Hz4 = 2,
    Hz8 = 3,
    Hz16 = 4,
    Hz32 = 5,
    Hz64 = 6,
    Hz128 = 7,
}

/// Samples averaged per reported measurement (PM_PRC / TMP_PRC, bits 3:0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Oversampling {
    #[default]
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
    X32 = 5,
    X64 = 6,
    X128 = 7,
}

/// Per-oversampling constants from the datasheet (table 9 and section 4.9.3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OversamplingProfile {
    /// Divides the raw ADC count before compensation.
    pub scale_factor: f32,
    /// Pressure precision in Pa RMS. Informational.
    pub precision: f32,
    /// Conversion time of one measurement in ms.
    pub measurement_time_ms: f32,
}

pub static OVERSAMPLING_PROFILES: [OversamplingProfile; 8] = [
    OversamplingProfile { scale_factor: 524288.0, precision: 2.5, measurement_time_ms: 3.6 },
    OversamplingProfile { scale_factor: 1572864.0, precision: 1.0, measurement_time_ms: 5.2 },
    OversamplingProfile { scale_factor: 3670016.0, precision: 0.5, measurement_time_ms: 8.4 },
    OversamplingProfile { scale_factor: 7864320.0, precision: 0.4, measurement_time_ms: 14.8 },
    OversamplingProfile { scale_factor: 253952.0, precision: 0.35, measurement_time_ms: 27.6 },
    OversamplingProfile { scale_factor: 516096.0, precision: 0.3, measurement_time_ms: 53.2 },
    OversamplingProfile { scale_factor: 1040384.0, precision: 0.2, measurement_time_ms: 104.4 },
    OversamplingProfile { scale_factor: 2088960.0, precision: 0.2, measurement_time_ms: 206.8 },
];

impl Oversampling {
    pub fn profile(self) -> &'static OversamplingProfile {
        &OVERSAMPLING_PROFILES[self as usize]
    }

    pub fn scale_factor(self) -> f32 {
        self.profile().scale_factor
    }

    /// Above 8x the result no longer fits the data registers unless the
    /// device shifts it, see CFG_REG P_SHIFT / T_SHIFT.
    pub fn needs_result_shift(self) -> bool {
        self > Oversampling::X8
    }
}

/// MEAS_CTRL field of MEAS_CFG (bits 2:0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Mode {
    Idle = 0b000,
    Pressure = 0b001,
    Temperature = 0b010,
    Invalid1 = 0b011,
    Invalid2 = 0b100,
    ContinuousPressure = 0b101,
    ContinuousTemperature = 0b110,
    ContinuousBoth = 0b111,
}

impl Mode {
    pub fn from_bits(bits: u8) -> Self {
        match bits & MEAS_CFG_CTRL_MSK {
            0b000 => Mode::Idle,
            0b001 => Mode::Pressure,
            0b010 => Mode::Temperature,
            0b011 => Mode::Invalid1,
            0b100 => Mode::Invalid2,
            0b101 => Mode::ContinuousPressure,
            0b110 => Mode::ContinuousTemperature,
            _ => Mode::ContinuousBoth,
        }
    }

    pub fn is_reserved(self) -> bool {
        matches!(self, Mode::Invalid1 | Mode::Invalid2)
    }

    pub fn is_continuous(self) -> bool {
        self >= Mode::ContinuousPressure
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Pressure,
    Temperature,
}

/// Rate and oversampling armed on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelConfig {
    pub rate: Rate,
    pub oversampling: Oversampling,
}

impl ChannelConfig {
    pub const fn new(rate: Rate, oversampling: Oversampling) -> Self {
        Self { rate, oversampling }
    }

    /// PRS_CFG / TMP_CFG layout: rate in bits 6:4, oversampling in bits 3:0.
    pub fn register_value(self) -> u8 {
        (((self.rate as u8) << 4) & CFG_RATE_MSK) | ((self.oversampling as u8) & CFG_PRC_MSK)
    }

    // Rate enters as its register code, the conversion time in ms.
    fn budget(self) -> f32 {
        f32::from(self.rate as u8) * self.oversampling.profile().measurement_time_ms
    }
}

/// Rate and oversampling of both channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateOversamplingConfig {
    pub pressure: ChannelConfig,
    pub temperature: ChannelConfig,
}

impl RateOversamplingConfig {
    pub fn channel(&self, channel: Channel) -> ChannelConfig {
        match channel {
            Channel::Pressure => self.pressure,
            Channel::Temperature => self.temperature,
        }
    }

    /// Copy of `self` with one channel replaced. Nothing is committed until
    /// the caller stores the returned value.
    pub fn with_channel(mut self, channel: Channel, config: ChannelConfig) -> Self {
        match channel {
            Channel::Pressure => self.pressure = config,
            Channel::Temperature => self.temperature = config,
        }
        self
    }

    /// Timing budget: `rate_p * t(os_p) + rate_t * t(os_t) >= 1.0`.
    pub fn is_valid(&self) -> bool {
        self.pressure.budget() + self.temperature.budget() >= 1.0
    }

    pub fn is_oversampled(&self) -> bool {
        self.pressure.oversampling as u8 + self.temperature.oversampling as u8 > 0
    }
}

/// Settings applied by [`Dps310::init`](crate::Dps310::init) and the
/// polling behaviour of every readiness wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub pressure: ChannelConfig,
    pub temperature: ChannelConfig,
    pub mode: Mode,
    /// Reference pressure for altitude, in hPa.
    pub sea_level_pressure: f32,
    /// Interval between status polls while waiting for the first measurement.
    pub measurement_poll_ms: u32,
    /// `None` polls forever. `Some(n)` gives up with `Error::Timeout` after
    /// `n` polls that did not see the ready bit.
    pub max_poll_attempts: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pressure: ChannelConfig::new(DEFAULT_RATE, DEFAULT_OVERSAMPLING),
            temperature: ChannelConfig::new(DEFAULT_RATE, DEFAULT_OVERSAMPLING),
            mode: DEFAULT_MODE,
            sea_level_pressure: STANDARD_SEA_LEVEL_PRESSURE,
            measurement_poll_ms: DEFAULT_MEASUREMENT_POLL_MS,
            max_poll_attempts: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_value_packs_rate_and_oversampling() {
        let cfg = ChannelConfig::new(Rate::Hz64, Oversampling::X64);
        assert_eq!(cfg.register_value(), 0b0110_0110);
        let cfg = ChannelConfig::new(Rate::Hz128, Oversampling::X1);
        assert_eq!(cfg.register_value(), 0b0111_0000);
        let cfg = ChannelConfig::new(Rate::Hz1, Oversampling::X128);
        assert_eq!(cfg.register_value(), 0b0000_0111);
    }

    #[test]
    fn timing_budget_accepts_64hz_64x() {
        let cfg = ChannelConfig::new(Rate::Hz64, Oversampling::X64);
        let both = RateOversamplingConfig { pressure: cfg, temperature: cfg };
        assert!(both.is_valid());
    }

    #[test]
    fn timing_budget_rejects_lowest_rate_on_both_channels() {
        let cfg = ChannelConfig::new(Rate::Hz1, Oversampling::X128);
        let both = RateOversamplingConfig { pressure: cfg, temperature: cfg };
        assert!(!both.is_valid());
        assert!(!RateOversamplingConfig::default().is_valid());
    }

    #[test]
    fn timing_budget_accepts_one_active_channel() {
        let cfg = RateOversamplingConfig::default()
            .with_channel(Channel::Pressure, ChannelConfig::new(Rate::Hz2, Oversampling::X1));
        assert!(cfg.is_valid());
        assert_eq!(cfg.temperature, ChannelConfig::default());
    }

    #[test]
    fn shift_threshold_is_above_8x() {
        assert!(!Oversampling::X1.needs_result_shift());
        assert!(!Oversampling::X8.needs_result_shift());
        assert!(Oversampling::X16.needs_result_shift());
        assert!(Oversampling::X128.needs_result_shift());
    }

    #[test]
    fn scale_factors_follow_table() {
        assert_eq!(Oversampling::X1.scale_factor(), 524288.0);
        assert_eq!(Oversampling::X8.scale_factor(), 7864320.0);
        assert_eq!(Oversampling::X16.scale_factor(), 253952.0);
        assert_eq!(Oversampling::X64.profile().measurement_time_ms, 104.4);
    }

    #[test]
    fn mode_classes() {
        assert!(Mode::Invalid1.is_reserved());
        assert!(Mode::Invalid2.is_reserved());
        assert!(!Mode::Pressure.is_reserved());
        assert!(!Mode::Temperature.is_continuous());
        assert!(Mode::ContinuousPressure.is_continuous());
        assert_eq!(Mode::from_bits(0xc7), Mode::ContinuousBoth);
        assert_eq!(Mode::from_bits(0x02), Mode::Temperature);
    }
}
