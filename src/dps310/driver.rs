use embedded_hal::blocking::delay::{DelayMs, DelayUs};
use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;
use log::{debug, info, warn};

use crate::dps310::calibration::Calibration;
use crate::dps310::compensation;
use crate::dps310::config::{
    Channel, ChannelConfig, Config, Mode, Oversampling, Rate, RateOversamplingConfig,
};
use crate::dps310::spi::{SpiError, SpiInterface};
use crate::dps310::{
    read_frame, write_frame, Error, Interface, CFG_PRS_SHIFT_EN, CFG_REG, CFG_TMP_SHIFT_EN,
    COEF_LEN, COEF_REG, COEF_SRCE_REG, MEAS_CFG_COEF_RDY, MEAS_CFG_CTRL_MSK, MEAS_CFG_PRS_RDY,
    MEAS_CFG_REG, MEAS_CFG_SENSOR_RDY, MEAS_CFG_TMP_RDY, PRODUCT_ID, PRODUCT_ID_REG, PRS_B2_REG,
    PRS_CFG_REG, RAW_SAMPLE_LEN, READY_POLL_MS, RESET_CMD, RESET_REG, RESET_SETTLE_MS,
    SPI_READ_BIT, TMP_B2_REG, TMP_CFG_REG, TMP_SRC_MSK,
};

/// DPS310 driver.
///
/// Owns the bus transport and a delay provider. Every call blocks until its
/// bus transactions complete, and the readiness waits block until the status
/// bit shows up (or `Config::max_poll_attempts` runs out). Mode and channel
/// updates are read-modify-write sequences over two transactions, so an
/// instance must not be shared between threads without a lock around it.
pub struct Dps310<IF, D> {
    interface: IF,
    delay: D,
    config: Config,
    buffer: [u8; COEF_LEN + 1],
    calibration: Calibration,
    rate_oversampling: RateOversamplingConfig,
    mode: Mode,
    sea_level_pressure: f32,
}

impl<SPI, CS, D, SpiE, PinE> Dps310<SpiInterface<SPI, CS>, D>
where
    SPI: Transfer<u8, Error = SpiE>,
    CS: OutputPin<Error = PinE>,
    D: DelayMs<u32> + DelayUs<u32>,
{
    /// Builds a driver on a SPI bus and selects SPI mode on the sensor.
    pub fn new_spi(spi: SPI, cs: CS, mut delay: D) -> Result<Self, Error<SpiError<SpiE, PinE>>> {
        let interface = SpiInterface::new(spi, cs, &mut delay).map_err(Error::Bus)?;
        Ok(Self::new(interface, delay))
    }
}

impl<IF, D> Dps310<IF, D>
where
    IF: Interface,
    D: DelayMs<u32> + DelayUs<u32>,
{
    pub fn new(interface: IF, delay: D) -> Self {
        let config = Config::default();
        Self {
            interface,
            delay,
            config,
            buffer: [0; COEF_LEN + 1],
            calibration: Calibration::default(),
            rate_oversampling: RateOversamplingConfig::default(),
            mode: Mode::Idle,
            sea_level_pressure: config.sea_level_pressure,
        }
    }

    /// Replaces the settings used by [`init`](Self::init) and the polling limits.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self.sea_level_pressure = config.sea_level_pressure;
        self
    }

    pub fn release(self) -> (IF, D) {
        (self.interface, self.delay)
    }

    /// Checks the product id, resets the sensor, loads the calibration block
    /// and arms both channels and the mode from [`Config`].
    pub fn init(&mut self) -> Result<(), Error<IF::Error>> {
        let id = self.read_register(PRODUCT_ID_REG)?;
        if id != PRODUCT_ID {
            warn!("unexpected product id 0x{:02x}", id);
            return Err(Error::UnexpectedDeviceId(id));
        }

        self.reset()?;
        self.read_calibration()?;

        let config = self.config;
        self.configure_pressure(config.pressure.rate, config.pressure.oversampling)?;
        self.configure_temperature(config.temperature.rate, config.temperature.oversampling)?;
        self.set_mode(config.mode)?;

        // both ready bits only ever show up together in this mode
        if config.mode == Mode::ContinuousBoth {
            self.wait_measurement_available(config.measurement_poll_ms)?;
        }

        self.sea_level_pressure = config.sea_level_pressure;
        info!("dps310 initialized, mode {:?}", config.mode);
        Ok(())
    }

    /// Soft reset, then wait for SENSOR_RDY.
    ///
    /// The device drops every configuration register back to its power-on
    /// value, and so does the driver's copy.
    pub fn reset(&mut self) -> Result<(), Error<IF::Error>> {
        debug!("soft reset");
        self.write_register(RESET_REG, RESET_CMD)?;
        self.rate_oversampling = RateOversamplingConfig::default();
        self.mode = Mode::Idle;

        self.delay.delay_ms(RESET_SETTLE_MS);
        self.wait_status(MEAS_CFG_SENSOR_RDY, READY_POLL_MS)
    }

    /// Waits for COEF_RDY and decodes the coefficient block.
    pub fn read_calibration(&mut self) -> Result<Calibration, Error<IF::Error>> {
        self.wait_status(MEAS_CFG_COEF_RDY, READY_POLL_MS)?;

        let mut block = [0u8; COEF_LEN];
        self.read_registers(COEF_REG, &mut block)?;
        self.calibration = Calibration::from_bytes(&block);
        debug!("calibration {:?}", self.calibration);
        Ok(self.calibration)
    }

    /// Writes the MEAS_CTRL bits of MEAS_CFG, keeping the others.
    ///
    /// Reserved encodings are refused, and so is every non-continuous mode
    /// while either channel oversamples.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), Error<IF::Error>> {
        if mode.is_reserved() || (!mode.is_continuous() && self.rate_oversampling.is_oversampled()) {
            warn!("refusing mode {:?}", mode);
            return Err(Error::InvalidMode(mode));
        }

        let meas_cfg = self.read_register(MEAS_CFG_REG)?;
        self.write_register(MEAS_CFG_REG, (meas_cfg & !MEAS_CFG_CTRL_MSK) | mode as u8)?;
        self.mode = mode;
        Ok(())
    }

    /// Arms rate and oversampling on one channel.
    ///
    /// The proposed pair of channel settings is checked against the timing
    /// budget before anything is written. A rejected call leaves both the
    /// device and [`rate_oversampling`](Self::rate_oversampling) unchanged.
    /// Once the configuration byte is written the new setting is recorded,
    /// even if the shift-enable update fails afterwards.
    pub fn configure_channel(
        &mut self,
        channel: Channel,
        rate: Rate,
        oversampling: Oversampling,
    ) -> Result<(), Error<IF::Error>> {
        let setting = ChannelConfig::new(rate, oversampling);
        let proposed = self.rate_oversampling.with_channel(channel, setting);
        if !proposed.is_valid() {
            warn!("{:?}: {:?} {:?} exceeds the timing budget", channel, rate, oversampling);
            return Err(Error::InvalidRateOversamplingCombination);
        }

        let (register, value, shift) = match channel {
            Channel::Pressure => (PRS_CFG_REG, setting.register_value(), CFG_PRS_SHIFT_EN),
            Channel::Temperature => {
                // keep the sensor the factory coefficients were trimmed against
                let source = self.read_register(COEF_SRCE_REG)? & TMP_SRC_MSK;
                (TMP_CFG_REG, source | setting.register_value(), CFG_TMP_SHIFT_EN)
            }
        };
        self.write_register(register, value)?;
        // the device runs the new setting from here on
        self.rate_oversampling = proposed;

        let cfg = self.read_register(CFG_REG)?;
        let cfg = if oversampling.needs_result_shift() {
            cfg | shift
        } else {
            cfg & !shift
        };
        self.write_register(CFG_REG, cfg)?;

        debug!("{:?} armed: {:?}", channel, setting);
        Ok(())
    }

    pub fn configure_pressure(
        &mut self,
        rate: Rate,
        oversampling: Oversampling,
    ) -> Result<(), Error<IF::Error>> {
        self.configure_channel(Channel::Pressure, rate, oversampling)
    }

    pub fn configure_temperature(
        &mut self,
        rate: Rate,
        oversampling: Oversampling,
    ) -> Result<(), Error<IF::Error>> {
        self.configure_channel(Channel::Temperature, rate, oversampling)
    }

    /// Same rate and oversampling on both channels, pressure first.
    pub fn configure(&mut self, rate: Rate, oversampling: Oversampling) -> Result<(), Error<IF::Error>> {
        self.configure_pressure(rate, oversampling)?;
        self.configure_temperature(rate, oversampling)
    }

    /// Blocks until both TMP_RDY and PRS_RDY are set.
    pub fn wait_measurement_available(&mut self, poll_ms: u32) -> Result<(), Error<IF::Error>> {
        self.wait_status(MEAS_CFG_TMP_RDY | MEAS_CFG_PRS_RDY, poll_ms)
    }

    pub fn temperature_available(&mut self) -> Result<bool, Error<IF::Error>> {
        Ok(self.read_register(MEAS_CFG_REG)? & MEAS_CFG_TMP_RDY != 0)
    }

    pub fn pressure_available(&mut self) -> Result<bool, Error<IF::Error>> {
        Ok(self.read_register(MEAS_CFG_REG)? & MEAS_CFG_PRS_RDY != 0)
    }

    pub fn read_raw_temperature(&mut self) -> Result<i32, Error<IF::Error>> {
        self.read_raw(TMP_B2_REG)
    }

    pub fn read_raw_pressure(&mut self) -> Result<i32, Error<IF::Error>> {
        self.read_raw(PRS_B2_REG)
    }

    /// Compensated temperature for a raw sample, in °C.
    pub fn compute_temperature(&self, raw: i32) -> f32 {
        compensation::temperature(
            &self.calibration,
            raw,
            self.rate_oversampling.temperature.oversampling,
        )
    }

    /// Compensated pressure for a raw pressure and temperature pair, in Pa.
    pub fn compute_pressure(&self, raw_pressure: i32, raw_temperature: i32) -> f32 {
        compensation::pressure(
            &self.calibration,
            raw_pressure,
            self.rate_oversampling.pressure.oversampling,
            raw_temperature,
            self.rate_oversampling.temperature.oversampling,
        )
    }

    /// Temperature in °C.
    pub fn read_temperature(&mut self) -> Result<f32, Error<IF::Error>> {
        let raw = self.read_raw_temperature()?;
        Ok(self.compute_temperature(raw))
    }

    /// Pressure in Pa and the temperature in °C it was compensated with.
    pub fn read_pressure(&mut self) -> Result<(f32, f32), Error<IF::Error>> {
        let raw_pressure = self.read_raw_pressure()?;
        let raw_temperature = self.read_raw_temperature()?;
        Ok((
            self.compute_pressure(raw_pressure, raw_temperature),
            self.compute_temperature(raw_temperature),
        ))
    }

    /// Altitude in m against the current sea-level reference.
    pub fn read_altitude(&mut self) -> Result<f32, Error<IF::Error>> {
        let (pressure, _) = self.read_pressure()?;
        Ok(compensation::altitude(pressure, self.sea_level_pressure))
    }

    /// Measures pressure at a known altitude (m) and stores the matching
    /// sea-level reference, which is also returned (hPa).
    pub fn calibrate_altitude(&mut self, altitude: f32) -> Result<f32, Error<IF::Error>> {
        let (pressure, _) = self.read_pressure()?;
        self.sea_level_pressure = compensation::sea_level_pressure(pressure, altitude);
        info!("sea level reference {} hPa", self.sea_level_pressure);
        Ok(self.sea_level_pressure)
    }

    /// Sea-level reference in hPa.
    pub fn sea_level_pressure(&self) -> f32 {
        self.sea_level_pressure
    }

    pub fn set_sea_level_pressure(&mut self, hpa: f32) {
        self.sea_level_pressure = hpa;
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn rate_oversampling(&self) -> RateOversamplingConfig {
        self.rate_oversampling
    }

    /// Mode last written by [`set_mode`](Self::set_mode).
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn read_register(&mut self, register: u8) -> Result<u8, Error<IF::Error>> {
        let mut frame = read_frame(register);
        self.interface
            .transfer(&mut frame, &mut self.delay)
            .map_err(Error::Bus)?;
        Ok(frame[1])
    }

    pub fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<IF::Error>> {
        let mut frame = write_frame(register, value);
        self.interface
            .transfer(&mut frame, &mut self.delay)
            .map_err(Error::Bus)
    }

    // Burst read in one transaction; the address auto-increments.
    fn read_registers(&mut self, register: u8, out: &mut [u8]) -> Result<(), Error<IF::Error>> {
        let frame = &mut self.buffer[..=out.len()];
        frame[0] = register | SPI_READ_BIT;
        frame[1..].fill(0);
        self.interface
            .transfer(frame, &mut self.delay)
            .map_err(Error::Bus)?;
        out.copy_from_slice(&frame[1..]);
        Ok(())
    }

    fn read_raw(&mut self, register: u8) -> Result<i32, Error<IF::Error>> {
        let mut sample = [0u8; RAW_SAMPLE_LEN];
        self.read_registers(register, &mut sample)?;
        Ok(compensation::raw_sample(&sample))
    }

    // Polls MEAS_CFG until every bit in `mask` is set.
    fn wait_status(&mut self, mask: u8, poll_ms: u32) -> Result<(), Error<IF::Error>> {
        let mut attempts: u32 = 0;
        loop {
            if self.read_register(MEAS_CFG_REG)? & mask == mask {
                return Ok(());
            }
            attempts += 1;
            if let Some(max) = self.config.max_poll_attempts {
                if attempts >= max {
                    warn!("MEAS_CFG bits 0x{:02x} not set after {} polls", mask, attempts);
                    return Err(Error::Timeout);
                }
            }
            self.delay.delay_ms(poll_ms);
        }
    }
}
