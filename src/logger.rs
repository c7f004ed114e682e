// Serial sink for the `log` records the driver emits.
// With the `rp2040` feature, `rp2040::init` routes them to UART0; the UART
// must be configured by the application first.

use core::fmt::{self, Write};

use embedded_hal::serial;

/// `core::fmt::Write` over a blocking serial transmitter.
pub struct SerialWriter<'a, W>(pub &'a mut W);

impl<'a, W: serial::Write<u8>> fmt::Write for SerialWriter<'a, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.bytes() {
            nb::block!(self.0.write(c)).map_err(|_| fmt::Error)?;
        }
        Ok(())
    }
}

/// Writes one record as `LEVEL target: message\r\n`.
pub fn write_record<W: serial::Write<u8>>(serial: &mut W, record: &log::Record) -> fmt::Result {
    write!(
        SerialWriter(serial),
        "{} {}: {}\r\n",
        record.level(),
        record.target(),
        record.args()
    )
}

#[cfg(feature = "rp2040")]
pub mod rp2040 {
    use core::ptr::addr_of_mut;

    use rp2040_hal as hal;
    use rp2040_hal::gpio::bank0::{Gpio0, Gpio1};
    use rp2040_hal::pac;

    pub type UartPins = (
        hal::gpio::Pin<Gpio0, hal::gpio::FunctionUart, hal::gpio::PullNone>,
        hal::gpio::Pin<Gpio1, hal::gpio::FunctionUart, hal::gpio::PullNone>,
    );

    pub type UartWriter = hal::uart::Writer<pac::UART0, UartPins>;

    static mut UART_TRANSMITTER: Option<UartWriter> = None;
    static LOGGER: UartLogger = UartLogger;

    struct UartLogger;

    impl log::Log for UartLogger {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &log::Record) {
            if !self.enabled(record.metadata()) {
                return;
            }
            // only ever written by `init`, before the logger is installed
            unsafe {
                if let Some(writer) = (*addr_of_mut!(UART_TRANSMITTER)).as_mut() {
                    let _ = super::write_record(writer, record);
                }
            }
        }

        fn flush(&self) {}
    }

    /// Installs the UART0 logger. Call once, before any other core or
    /// interrupt handler can log. The RP2040 has no atomic CAS, hence the
    /// racy `log` setters.
    pub fn init(writer: UartWriter, level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
        unsafe {
            *addr_of_mut!(UART_TRANSMITTER) = Some(writer);
            log::set_logger_racy(&LOGGER)?;
            log::set_max_level_racy(level);
        }
        Ok(())
    }
}
