use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;

use crate::dps310::{Interface, CS_SETTLE_US};

/// Failure of the SPI bus or of the chip-select pin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpiError<SpiE, PinE> {
    Spi(SpiE),
    ChipSelect(PinE),
}

/// 4-wire SPI transport with a dedicated chip-select line.
pub struct SpiInterface<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS, SpiE, PinE> SpiInterface<SPI, CS>
where
    SPI: Transfer<u8, Error = SpiE>,
    CS: OutputPin<Error = PinE>,
{
    /// Takes the bus and pulses chip select once. The DPS310 boots in I2C
    /// mode and only switches to SPI after seeing CS go low.
    pub fn new<D: DelayUs<u32>>(
        spi: SPI,
        cs: CS,
        delay: &mut D,
    ) -> Result<Self, SpiError<SpiE, PinE>> {
        let mut interface = Self { spi, cs };
        interface.cs.set_low().map_err(SpiError::ChipSelect)?;
        delay.delay_us(CS_SETTLE_US);
        interface.cs.set_high().map_err(SpiError::ChipSelect)?; // leave the device deselected
        delay.delay_us(CS_SETTLE_US);
        Ok(interface)
    }

    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

impl<SPI, CS, SpiE, PinE> Interface for SpiInterface<SPI, CS>
where
    SPI: Transfer<u8, Error = SpiE>,
    CS: OutputPin<Error = PinE>,
{
    type Error = SpiError<SpiE, PinE>;

    fn transfer<D: DelayUs<u32>>(
        &mut self,
        frame: &mut [u8],
        delay: &mut D,
    ) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(SpiError::ChipSelect)?;
        delay.delay_us(CS_SETTLE_US);

        let result = self.spi.transfer(frame).map(|_| ()).map_err(SpiError::Spi);

        // CS goes back high even when the transfer failed
        delay.delay_us(CS_SETTLE_US);
        let deselect = self.cs.set_high().map_err(SpiError::ChipSelect);
        result?;
        deselect
    }
}
