#![no_std]
//! Platform-agnostic driver for the DS1390/DS1391 SPI real-time clock.
//!
//! The driver talks to the device through an [`embedded_hal::spi::SpiDevice`],
//! so chip select is asserted for every register access and released again
//! even when the bus reports an error. An async variant over
//! `embedded-hal-async` lives in [`asynch`] behind the `async` feature.
//!
//! # Layout
//!
//! - [`bcd`] packs decimal values into the chip's BCD nibbles.
//! - [`registers`] holds the address map and the bitfield type of every
//!   register.
//! - [`datetime`] converts the 8-byte calendar frame to and from
//!   [`CalendarValue`].
//! - [`epoch`] converts calendar values to and from Unix timestamps without
//!   any date library.
//!
//! # Setters
//!
//! Every field setter returns an [`Outcome`]. Requesting the value a field
//! already holds is reported as [`Outcome::Unchanged`] and causes no write.
//! Any other value is clamped to the field's range and written. After a successful
//! write the oscillator stop flag is cleared so the calendar reads as valid.
//!
//! # Example
//!
//! ```rust,ignore
//! use ds1390::{Config, DS1390, TimeRepresentation, TrickleCharger};
//!
//! let mut rtc = DS1390::new(spi_device);
//! rtc.configure(&Config {
//!     time_representation: TimeRepresentation::TwentyFourHour,
//!     trickle_charger: TrickleCharger::Ohm250Diode,
//! })?;
//!
//! if !rtc.is_valid()? {
//!     rtc.set_epoch(1_710_431_130, 0)?;
//! }
//! let now = rtc.epoch(0)?;
//! ```
//!
//! # Features
//!
//! - `async`: the [`asynch`] driver.
//! - `log`: debug logging through the `log` crate.
//! - `defmt`: debug logging and `defmt::Format` impls through `defmt`.

use chrono::NaiveDateTime;
use embedded_hal::spi::{Operation, SpiDevice};
use paste::paste;

#[cfg(all(feature = "log", feature = "defmt"))]
compile_error!("features `log` and `defmt` cannot be enabled together");

cfg_if::cfg_if! {
    if #[cfg(feature = "log")] {
        pub(crate) use log::{debug, error, warn};
    } else if #[cfg(feature = "defmt")] {
        pub(crate) use defmt::{debug, error, warn};
    }
}

// Logging compiles away when neither backend is enabled
#[cfg(not(any(feature = "log", feature = "defmt")))]
mod nolog {
    // A bare `warn` in a `use` clashes with the built-in lint attribute, so
    // the shims carry their own names and are renamed on import.
    macro_rules! nolog_debug {
        ($($arg:expr),* $(,)?) => {{ let _ = ($(&$arg),*); }};
    }
    macro_rules! nolog_error {
        ($($arg:expr),* $(,)?) => {{ let _ = ($(&$arg),*); }};
    }
    macro_rules! nolog_warn {
        ($($arg:expr),* $(,)?) => {{ let _ = ($(&$arg),*); }};
    }
    pub(crate) use {nolog_debug as debug, nolog_error as error, nolog_warn as warn};
}
#[cfg(not(any(feature = "log", feature = "defmt")))]
pub(crate) use nolog::{debug, error, warn};

#[cfg(feature = "async")]
pub mod asynch;
pub mod bcd;
pub mod datetime;
pub mod epoch;
pub mod registers;

pub use bcd::{bcd_to_decimal, decimal_to_bcd};
pub use datetime::{CalendarValue, DS1390DateTimeError, RawFrame};
pub use epoch::{days_in_month, from_epoch, is_leap_year, to_epoch};
pub use registers::{
    AmPm, Date, Hours, Hundredths, Minutes, Month, RegAddr, Seconds, Status, TimeRepresentation,
    Trickle, TrickleCharger, Weekday, Year,
};

use crate::bcd::clamp_to_bcd;

/// Result of a setter.
#[must_use]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// The register was written
    Changed,
    /// The register already held the value; nothing was written
    Unchanged,
    /// The request does not apply in the device's current state; nothing was
    /// written
    Rejected,
}

/// Settings applied by [`DS1390::configure`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Hour format stored in the hours register
    pub time_representation: TimeRepresentation,
    /// Trickle charger setting for the backup supply
    pub trickle_charger: TrickleCharger,
}

/// DS1390 error type.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DS1390Error<E> {
    /// SPI bus error
    Spi(E),
    /// Date/time conversion error
    DateTime(DS1390DateTimeError),
}

impl<E> From<E> for DS1390Error<E> {
    fn from(e: E) -> Self {
        DS1390Error::Spi(e)
    }
}

/// Blocking DS1390 driver.
pub struct DS1390<SPI: SpiDevice> {
    spi: SPI,
}

impl<SPI: SpiDevice> DS1390<SPI> {
    /// Creates a driver on top of an SPI device.
    ///
    /// The device must be set up for SPI mode 1, MSB first, at 4 MHz or less.
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Gives back the SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }

    /// Applies the format and trickle charger settings.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(DS1390Error)` on error
    pub fn configure(&mut self, config: &Config) -> Result<(), DS1390Error<SPI::Error>> {
        let format = self.set_time_representation(config.time_representation)?;
        let trickle = self.set_trickle_charger(config.trickle_charger)?;
        debug!("DS1390: configure format={:?} trickle={:?}", format, trickle);
        Ok(())
    }

    fn read_register(&mut self, reg: RegAddr) -> Result<u8, DS1390Error<SPI::Error>> {
        let mut data = [0];
        self.spi.transaction(&mut [
            Operation::Write(&[reg.read()]),
            Operation::Read(&mut data),
        ])?;
        Ok(data[0])
    }

    fn write_register(&mut self, reg: RegAddr, value: u8) -> Result<(), DS1390Error<SPI::Error>> {
        self.spi.write(&[reg.write(), value])?;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<RawFrame, DS1390Error<SPI::Error>> {
        let mut data = [0; RawFrame::LEN];
        self.spi.transaction(&mut [
            Operation::Write(&[RegAddr::Hundredths.read()]),
            Operation::Read(&mut data),
        ])?;
        Ok(data.into())
    }

    fn write_frame(&mut self, frame: &RawFrame) -> Result<(), DS1390Error<SPI::Error>> {
        let data: [u8; RawFrame::LEN] = frame.into();
        let mut buf = [0; RawFrame::LEN + 1];
        buf[0] = RegAddr::Hundredths.write();
        buf[1..].copy_from_slice(&data);
        self.spi.write(&buf)?;
        Ok(())
    }

    // Writes `new` unless the field already holds the requested value, then
    // marks the calendar valid. The comparison is against the requested
    // value, not the clamped one.
    fn update_register(
        &mut self,
        reg: RegAddr,
        unchanged: bool,
        new: u8,
    ) -> Result<Outcome, DS1390Error<SPI::Error>> {
        if unchanged {
            debug!("DS1390: {:?} already holds the requested value", reg);
            return Ok(Outcome::Unchanged);
        }
        self.write_register(reg, new)?;
        let _ = self.set_valid()?;
        Ok(Outcome::Changed)
    }

    fn update_bcd(
        &mut self,
        reg: RegAddr,
        value: u8,
        min: u8,
        max: u8,
    ) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let current = self.read_register(reg)?;
        self.update_register(
            reg,
            bcd_to_decimal(current) == value,
            clamp_to_bcd(value, min, max),
        )
    }

    fn read_bcd(&mut self, reg: RegAddr) -> Result<u8, DS1390Error<SPI::Error>> {
        Ok(bcd_to_decimal(self.read_register(reg)?))
    }

    /// Hundredths of a second (0-99).
    pub fn hundredths(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        self.read_bcd(RegAddr::Hundredths)
    }

    /// Sets the hundredths of a second, clamped to 0-99.
    pub fn set_hundredths(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        self.update_bcd(RegAddr::Hundredths, value, 0, 99)
    }

    /// Seconds (0-59).
    pub fn seconds(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        self.read_bcd(RegAddr::Seconds)
    }

    /// Sets the seconds, clamped to 0-59.
    pub fn set_seconds(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        self.update_bcd(RegAddr::Seconds, value, 0, 59)
    }

    /// Minutes (0-59).
    pub fn minutes(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        self.read_bcd(RegAddr::Minutes)
    }

    /// Sets the minutes, clamped to 0-59.
    pub fn set_minutes(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        self.update_bcd(RegAddr::Minutes, value, 0, 59)
    }

    /// Hours in the device's current format: 0-23, or 1-12 in 12-hour format.
    pub fn hours(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        Ok(self.hours_register()?.value())
    }

    /// Sets the hours in the device's current format.
    ///
    /// The value is clamped to 0-23 or 1-12. In 12-hour format the stored
    /// AM/PM flag is kept.
    pub fn set_hours(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let current = self.hours_register()?;
        let new = Hours::encode(value, current.am_pm(), current.time_representation());
        self.update_register(RegAddr::Hours, current.value() == value, new.into())
    }

    /// AM/PM flag; always [`AmPm::Am`] in 24-hour format.
    pub fn am_pm(&mut self) -> Result<AmPm, DS1390Error<SPI::Error>> {
        Ok(self.hours_register()?.am_pm())
    }

    /// Sets the AM/PM flag.
    ///
    /// # Returns
    /// * `Ok(Outcome::Rejected)` when the device is in 24-hour format
    pub fn set_am_pm(&mut self, am_pm: AmPm) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let current = self.hours_register()?;
        if current.time_representation() == TimeRepresentation::TwentyFourHour {
            warn!("DS1390: AM/PM is not available in 24-hour format");
            return Ok(Outcome::Rejected);
        }
        let new = Hours::encode(current.value(), am_pm, TimeRepresentation::TwelveHour);
        self.update_register(RegAddr::Hours, current.am_pm() == am_pm, new.into())
    }

    /// Day of week (1-7, 1 = Sunday).
    pub fn weekday(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        self.read_bcd(RegAddr::Weekday)
    }

    /// Sets the day of week, clamped to 1-7.
    pub fn set_weekday(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        self.update_bcd(RegAddr::Weekday, value, 1, 7)
    }

    /// Day of month (1-31).
    pub fn day(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        self.read_bcd(RegAddr::Date)
    }

    /// Sets the day of month, clamped to 1-31.
    pub fn set_day(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        self.update_bcd(RegAddr::Date, value, 1, 31)
    }

    /// Month (1-12).
    pub fn month(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        Ok(self.month_register()?.value())
    }

    /// Sets the month, clamped to 1-12. The century flag is kept.
    pub fn set_month(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let current = self.month_register()?;
        let new = Month::encode(value, current.century());
        self.update_register(RegAddr::Month, current.value() == value, new.into())
    }

    /// Century flag from bit 7 of the month register.
    pub fn century(&mut self) -> Result<bool, DS1390Error<SPI::Error>> {
        Ok(self.month_register()?.century())
    }

    /// Sets the century flag. The month digits are kept.
    pub fn set_century(&mut self, century: bool) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let current = self.month_register()?;
        let mut new = current;
        new.set_century(century);
        self.update_register(RegAddr::Month, current.century() == century, new.into())
    }

    /// Two-digit year (0-99).
    pub fn year(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        self.read_bcd(RegAddr::Year)
    }

    /// Sets the two-digit year, clamped to 0-99.
    pub fn set_year(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        self.update_bcd(RegAddr::Year, value, 0, 99)
    }

    /// Hour format stored in bit 6 of the hours register.
    pub fn time_representation(&mut self) -> Result<TimeRepresentation, DS1390Error<SPI::Error>> {
        Ok(self.hours_register()?.time_representation())
    }

    /// Switches the hour format.
    ///
    /// This rewrites the whole hours register, not only the format bit: the
    /// stored hour is converted to the new format, so 15 in 24-hour format
    /// becomes 3 PM and 12 AM becomes 00. Flipping the bit alone would leave
    /// digits the new format cannot represent.
    pub fn set_time_representation(
        &mut self,
        time_representation: TimeRepresentation,
    ) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let current = self.hours_register()?;
        if current.time_representation() == time_representation {
            return Ok(Outcome::Unchanged);
        }
        let new = Hours::from_24h(current.to_24h(), time_representation);
        debug!("DS1390: hours {:?} -> {:?}", current, new);
        self.write_register(RegAddr::Hours, new.into())?;
        let _ = self.set_valid()?;
        Ok(Outcome::Changed)
    }

    /// Reads the whole calendar in one transaction.
    pub fn raw_frame(&mut self) -> Result<RawFrame, DS1390Error<SPI::Error>> {
        self.read_frame()
    }

    /// Reads and decodes the whole calendar in one transaction.
    pub fn calendar(&mut self) -> Result<CalendarValue, DS1390Error<SPI::Error>> {
        Ok(self.read_frame()?.decode())
    }

    /// Writes the whole calendar in the device's current hour format and
    /// marks it valid.
    ///
    /// Out-of-range fields are clamped.
    pub fn set_calendar(&mut self, value: &CalendarValue) -> Result<(), DS1390Error<SPI::Error>> {
        let time_representation = self.time_representation()?;
        self.write_frame(&RawFrame::encode(value, time_representation))?;
        let _ = self.set_valid()?;
        Ok(())
    }

    /// Returns `false` if the oscillator has stopped since the calendar was
    /// last written.
    pub fn is_valid(&mut self) -> Result<bool, DS1390Error<SPI::Error>> {
        Ok(!self.status_register()?.oscillator_stop_flag())
    }

    /// Clears the oscillator stop flag.
    pub fn set_valid(&mut self) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let mut status = self.status_register()?;
        if !status.oscillator_stop_flag() {
            return Ok(Outcome::Unchanged);
        }
        status.set_oscillator_stop_flag(false);
        self.set_status_register(status)?;
        Ok(Outcome::Changed)
    }

    /// Current trickle charger setting, or `None` if the register holds a
    /// pattern outside the documented set.
    pub fn trickle_charger(&mut self) -> Result<Option<TrickleCharger>, DS1390Error<SPI::Error>> {
        Ok(self.trickle_register()?.mode())
    }

    /// Selects the trickle charger setting.
    pub fn set_trickle_charger(
        &mut self,
        mode: TrickleCharger,
    ) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let current = self.read_register(RegAddr::TrickleCharger)?;
        self.update_register(RegAddr::TrickleCharger, current == u8::from(mode), mode.into())
    }

    /// Selects the trickle charger setting from its register byte.
    ///
    /// # Returns
    /// * `Ok(Outcome::Rejected)` for bytes that are not a documented setting;
    ///   the bus is not touched
    pub fn set_trickle_charger_raw(&mut self, raw: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        match TrickleCharger::try_from(raw) {
            Ok(mode) => self.set_trickle_charger(mode),
            Err(raw) => {
                warn!("DS1390: invalid trickle charger setting {:#x}", raw);
                Ok(Outcome::Rejected)
            }
        }
    }

    /// Gets the current date and time.
    ///
    /// # Returns
    /// * `Ok(NaiveDateTime)` - The current date and time
    /// * `Err(DS1390Error::DateTime)` if the registers do not hold a real date
    pub fn datetime(&mut self) -> Result<NaiveDateTime, DS1390Error<SPI::Error>> {
        let frame = self.read_frame()?;
        frame
            .decode()
            .to_datetime(frame.time_representation())
            .map_err(DS1390Error::DateTime)
    }

    /// Sets the date and time (years 2000-2099) and marks the calendar valid.
    pub fn set_datetime(&mut self, datetime: &NaiveDateTime) -> Result<(), DS1390Error<SPI::Error>> {
        let time_representation = self.time_representation()?;
        let value = CalendarValue::from_datetime(datetime, time_representation)
            .map_err(DS1390Error::DateTime)?;
        self.write_frame(&RawFrame::encode(&value, time_representation))?;
        let _ = self.set_valid()?;
        Ok(())
    }

    /// Unix timestamp of the current calendar, whose fields are taken to be
    /// `timezone` hours ahead of UTC.
    pub fn epoch(&mut self, timezone: i8) -> Result<u32, DS1390Error<SPI::Error>> {
        let frame = self.read_frame()?;
        to_epoch(&frame.decode(), frame.time_representation(), timezone)
            .map_err(DS1390Error::DateTime)
    }

    /// Sets the calendar from a Unix timestamp shown in `timezone` and marks
    /// it valid. Hundredths and the century flag are cleared.
    pub fn set_epoch(&mut self, epoch: u32, timezone: i8) -> Result<(), DS1390Error<SPI::Error>> {
        let time_representation = self.time_representation()?;
        let value =
            from_epoch(epoch, time_representation, timezone).map_err(DS1390Error::DateTime)?;
        self.write_frame(&RawFrame::encode(&value, time_representation))?;
        let _ = self.set_valid()?;
        Ok(())
    }
}

// Register access implementations
macro_rules! impl_register_access {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<SPI: SpiDevice> DS1390<SPI> {
            $(
                paste! {
                    #[doc = concat!("Reads the raw ", stringify!($name), " register.")]
                    pub fn [<$name _register>](&mut self) -> Result<$typ, DS1390Error<SPI::Error>> {
                        Ok($typ(self.read_register($regaddr)?))
                    }

                    #[doc = concat!("Writes the raw ", stringify!($name), " register.")]
                    #[doc = "\n\nThe value is written as is and the oscillator stop flag is left alone."]
                    pub fn [<set_ $name _register>](&mut self, value: $typ) -> Result<(), DS1390Error<SPI::Error>> {
                        self.write_register($regaddr, value.into())
                    }
                }
            )+
        }
    }
}

impl_register_access!(
    (hundredths, RegAddr::Hundredths, Hundredths),
    (seconds, RegAddr::Seconds, Seconds),
    (minutes, RegAddr::Minutes, Minutes),
    (hours, RegAddr::Hours, Hours),
    (weekday, RegAddr::Weekday, Weekday),
    (date, RegAddr::Date, Date),
    (month, RegAddr::Month, Month),
    (year, RegAddr::Year, Year),
    (status, RegAddr::Status, Status),
    (trickle, RegAddr::TrickleCharger, Trickle)
);
