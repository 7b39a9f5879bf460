//! Async implementation of the DS1390 driver.
//!
//! This module provides an async interface to the DS1390 RTC device using
//! `embedded-hal-async` traits. It is only available when the `async` feature
//! is enabled. Every method behaves like its blocking counterpart on
//! [`crate::DS1390`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ds1390::asynch::DS1390;
//!
//! // Initialize device
//! let mut rtc = DS1390::new(spi_device);
//!
//! // Configure asynchronously
//! rtc.configure(&config).await?;
//!
//! // Get current date/time asynchronously
//! let datetime = rtc.datetime().await?;
//! ```

use chrono::NaiveDateTime;
use embedded_hal_async::spi::{Operation, SpiDevice};
use paste::paste;

use crate::bcd::clamp_to_bcd;
use crate::{
    bcd_to_decimal, debug, from_epoch, to_epoch, warn, AmPm, CalendarValue, Config, DS1390Error,
    Date, Hours, Hundredths, Minutes, Month, Outcome, RawFrame, RegAddr, Seconds, Status,
    TimeRepresentation, Trickle, TrickleCharger, Weekday, Year,
};

/// DS1390 Real-Time Clock async driver.
///
/// This struct provides the async interface to the DS1390 RTC device.
/// It supports async SPI operations through the `embedded-hal-async` traits.
pub struct DS1390<SPI: SpiDevice> {
    spi: SPI,
}

impl<SPI: SpiDevice> DS1390<SPI> {
    /// Creates a new DS1390 async driver instance.
    ///
    /// # Arguments
    /// * `spi` - The async SPI device (mode 1, MSB first, 4 MHz or less)
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Gives back the SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }

    /// Configures the device according to the provided configuration.
    ///
    /// # Arguments
    /// * `config` - The configuration to apply
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(DS1390Error)` on error
    pub async fn configure(&mut self, config: &Config) -> Result<(), DS1390Error<SPI::Error>> {
        let format = self
            .set_time_representation(config.time_representation)
            .await?;
        let trickle = self.set_trickle_charger(config.trickle_charger).await?;
        debug!("DS1390: configure format={:?} trickle={:?}", format, trickle);
        Ok(())
    }

    async fn read_register(&mut self, reg: RegAddr) -> Result<u8, DS1390Error<SPI::Error>> {
        let mut data = [0];
        self.spi
            .transaction(&mut [Operation::Write(&[reg.read()]), Operation::Read(&mut data)])
            .await?;
        Ok(data[0])
    }

    async fn write_register(
        &mut self,
        reg: RegAddr,
        value: u8,
    ) -> Result<(), DS1390Error<SPI::Error>> {
        self.spi.write(&[reg.write(), value]).await?;
        Ok(())
    }

    /// Reads the raw calendar registers from the device.
    ///
    /// # Returns
    /// * `Ok(RawFrame)` - The raw calendar values on success
    /// * `Err(DS1390Error)` on error
    async fn read_frame(&mut self) -> Result<RawFrame, DS1390Error<SPI::Error>> {
        let mut data = [0; RawFrame::LEN];
        self.spi
            .transaction(&mut [
                Operation::Write(&[RegAddr::Hundredths.read()]),
                Operation::Read(&mut data),
            ])
            .await?;
        Ok(data.into())
    }

    /// Writes raw calendar values to the device registers.
    ///
    /// # Arguments
    /// * `frame` - The raw calendar values to write
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(DS1390Error)` on error
    async fn write_frame(&mut self, frame: &RawFrame) -> Result<(), DS1390Error<SPI::Error>> {
        let data: [u8; RawFrame::LEN] = frame.into();
        self.spi
            .write(&[
                RegAddr::Hundredths.write(),
                data[0],
                data[1],
                data[2],
                data[3],
                data[4],
                data[5],
                data[6],
                data[7],
            ])
            .await?;
        Ok(())
    }

    async fn update_register(
        &mut self,
        reg: RegAddr,
        unchanged: bool,
        new: u8,
    ) -> Result<Outcome, DS1390Error<SPI::Error>> {
        if unchanged {
            debug!("DS1390: {:?} already holds the requested value", reg);
            return Ok(Outcome::Unchanged);
        }
        self.write_register(reg, new).await?;
        let _ = self.set_valid().await?;
        Ok(Outcome::Changed)
    }

    async fn update_bcd(
        &mut self,
        reg: RegAddr,
        value: u8,
        min: u8,
        max: u8,
    ) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let current = self.read_register(reg).await?;
        self.update_register(
            reg,
            bcd_to_decimal(current) == value,
            clamp_to_bcd(value, min, max),
        )
        .await
    }

    async fn read_bcd(&mut self, reg: RegAddr) -> Result<u8, DS1390Error<SPI::Error>> {
        Ok(bcd_to_decimal(self.read_register(reg).await?))
    }

    /// Hundredths of a second (0-99).
    pub async fn hundredths(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        self.read_bcd(RegAddr::Hundredths).await
    }

    /// Sets the hundredths of a second, clamped to 0-99.
    pub async fn set_hundredths(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        self.update_bcd(RegAddr::Hundredths, value, 0, 99).await
    }

    /// Seconds (0-59).
    pub async fn seconds(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        self.read_bcd(RegAddr::Seconds).await
    }

    /// Sets the seconds, clamped to 0-59.
    pub async fn set_seconds(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        self.update_bcd(RegAddr::Seconds, value, 0, 59).await
    }

    /// Minutes (0-59).
    pub async fn minutes(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        self.read_bcd(RegAddr::Minutes).await
    }

    /// Sets the minutes, clamped to 0-59.
    pub async fn set_minutes(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        self.update_bcd(RegAddr::Minutes, value, 0, 59).await
    }

    /// Hours in the device's current format.
    pub async fn hours(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        Ok(self.hours_register().await?.value())
    }

    /// Sets the hours in the device's current format, keeping AM/PM.
    pub async fn set_hours(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let current = self.hours_register().await?;
        let new = Hours::encode(value, current.am_pm(), current.time_representation());
        self.update_register(RegAddr::Hours, current.value() == value, new.into())
            .await
    }

    /// AM/PM flag; always [`AmPm::Am`] in 24-hour format.
    pub async fn am_pm(&mut self) -> Result<AmPm, DS1390Error<SPI::Error>> {
        Ok(self.hours_register().await?.am_pm())
    }

    /// Sets the AM/PM flag. Rejected in 24-hour format.
    pub async fn set_am_pm(&mut self, am_pm: AmPm) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let current = self.hours_register().await?;
        if current.time_representation() == TimeRepresentation::TwentyFourHour {
            warn!("DS1390: AM/PM is not available in 24-hour format");
            return Ok(Outcome::Rejected);
        }
        let new = Hours::encode(current.value(), am_pm, TimeRepresentation::TwelveHour);
        self.update_register(RegAddr::Hours, current.am_pm() == am_pm, new.into())
            .await
    }

    /// Day of week (1-7, 1 = Sunday).
    pub async fn weekday(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        self.read_bcd(RegAddr::Weekday).await
    }

    /// Sets the day of week, clamped to 1-7.
    pub async fn set_weekday(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        self.update_bcd(RegAddr::Weekday, value, 1, 7).await
    }

    /// Day of month (1-31).
    pub async fn day(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        self.read_bcd(RegAddr::Date).await
    }

    /// Sets the day of month, clamped to 1-31.
    pub async fn set_day(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        self.update_bcd(RegAddr::Date, value, 1, 31).await
    }

    /// Month (1-12).
    pub async fn month(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        Ok(self.month_register().await?.value())
    }

    /// Sets the month, clamped to 1-12, keeping the century flag.
    pub async fn set_month(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let current = self.month_register().await?;
        let new = Month::encode(value, current.century());
        self.update_register(RegAddr::Month, current.value() == value, new.into())
            .await
    }

    /// Century flag.
    pub async fn century(&mut self) -> Result<bool, DS1390Error<SPI::Error>> {
        Ok(self.month_register().await?.century())
    }

    /// Sets the century flag, keeping the month digits.
    pub async fn set_century(&mut self, century: bool) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let current = self.month_register().await?;
        let mut new = current;
        new.set_century(century);
        self.update_register(RegAddr::Month, current.century() == century, new.into())
            .await
    }

    /// Two-digit year (0-99).
    pub async fn year(&mut self) -> Result<u8, DS1390Error<SPI::Error>> {
        self.read_bcd(RegAddr::Year).await
    }

    /// Sets the two-digit year, clamped to 0-99.
    pub async fn set_year(&mut self, value: u8) -> Result<Outcome, DS1390Error<SPI::Error>> {
        self.update_bcd(RegAddr::Year, value, 0, 99).await
    }

    /// Hour format stored in the hours register.
    pub async fn time_representation(
        &mut self,
    ) -> Result<TimeRepresentation, DS1390Error<SPI::Error>> {
        Ok(self.hours_register().await?.time_representation())
    }

    /// Switches the hour format. The whole hours register is rewritten with
    /// the stored hour converted to the new format (15 becomes 3 PM).
    pub async fn set_time_representation(
        &mut self,
        time_representation: TimeRepresentation,
    ) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let current = self.hours_register().await?;
        if current.time_representation() == time_representation {
            return Ok(Outcome::Unchanged);
        }
        let new = Hours::from_24h(current.to_24h(), time_representation);
        debug!("DS1390: hours {:?} -> {:?}", current, new);
        self.write_register(RegAddr::Hours, new.into()).await?;
        let _ = self.set_valid().await?;
        Ok(Outcome::Changed)
    }

    /// Reads the whole calendar in one transaction.
    pub async fn raw_frame(&mut self) -> Result<RawFrame, DS1390Error<SPI::Error>> {
        self.read_frame().await
    }

    /// Reads and decodes the whole calendar in one transaction.
    pub async fn calendar(&mut self) -> Result<CalendarValue, DS1390Error<SPI::Error>> {
        Ok(self.read_frame().await?.decode())
    }

    /// Writes the whole calendar in the device's current hour format.
    pub async fn set_calendar(
        &mut self,
        value: &CalendarValue,
    ) -> Result<(), DS1390Error<SPI::Error>> {
        let time_representation = self.time_representation().await?;
        self.write_frame(&RawFrame::encode(value, time_representation))
            .await?;
        let _ = self.set_valid().await?;
        Ok(())
    }

    /// Returns `false` if the oscillator has stopped since the calendar was
    /// last written.
    pub async fn is_valid(&mut self) -> Result<bool, DS1390Error<SPI::Error>> {
        Ok(!self.status_register().await?.oscillator_stop_flag())
    }

    /// Clears the oscillator stop flag.
    pub async fn set_valid(&mut self) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let mut status = self.status_register().await?;
        if !status.oscillator_stop_flag() {
            return Ok(Outcome::Unchanged);
        }
        status.set_oscillator_stop_flag(false);
        self.set_status_register(status).await?;
        Ok(Outcome::Changed)
    }

    /// Current trickle charger setting, `None` for undocumented patterns.
    pub async fn trickle_charger(
        &mut self,
    ) -> Result<Option<TrickleCharger>, DS1390Error<SPI::Error>> {
        Ok(self.trickle_register().await?.mode())
    }

    /// Selects the trickle charger setting.
    pub async fn set_trickle_charger(
        &mut self,
        mode: TrickleCharger,
    ) -> Result<Outcome, DS1390Error<SPI::Error>> {
        let current = self.read_register(RegAddr::TrickleCharger).await?;
        self.update_register(RegAddr::TrickleCharger, current == u8::from(mode), mode.into())
            .await
    }

    /// Selects the trickle charger setting from its register byte. Bytes
    /// outside the documented set are rejected without touching the bus.
    pub async fn set_trickle_charger_raw(
        &mut self,
        raw: u8,
    ) -> Result<Outcome, DS1390Error<SPI::Error>> {
        match TrickleCharger::try_from(raw) {
            Ok(mode) => self.set_trickle_charger(mode).await,
            Err(raw) => {
                warn!("DS1390: invalid trickle charger setting {:#x}", raw);
                Ok(Outcome::Rejected)
            }
        }
    }

    /// Gets the current date and time from the device.
    ///
    /// # Returns
    /// * `Ok(NaiveDateTime)` - The current date and time
    /// * `Err(DS1390Error)` on error
    pub async fn datetime(&mut self) -> Result<NaiveDateTime, DS1390Error<SPI::Error>> {
        let frame = self.read_frame().await?;
        frame
            .decode()
            .to_datetime(frame.time_representation())
            .map_err(DS1390Error::DateTime)
    }

    /// Sets the current date and time on the device.
    ///
    /// # Arguments
    /// * `datetime` - The date and time to set (2000-2099)
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(DS1390Error)` on error
    pub async fn set_datetime(
        &mut self,
        datetime: &NaiveDateTime,
    ) -> Result<(), DS1390Error<SPI::Error>> {
        let time_representation = self.time_representation().await?;
        let value = CalendarValue::from_datetime(datetime, time_representation)
            .map_err(DS1390Error::DateTime)?;
        self.write_frame(&RawFrame::encode(&value, time_representation))
            .await?;
        let _ = self.set_valid().await?;
        Ok(())
    }

    /// Unix timestamp of the current calendar, read as `timezone` hours
    /// ahead of UTC.
    pub async fn epoch(&mut self, timezone: i8) -> Result<u32, DS1390Error<SPI::Error>> {
        let frame = self.read_frame().await?;
        to_epoch(&frame.decode(), frame.time_representation(), timezone)
            .map_err(DS1390Error::DateTime)
    }

    /// Sets the calendar from a Unix timestamp shown in `timezone`.
    pub async fn set_epoch(
        &mut self,
        epoch: u32,
        timezone: i8,
    ) -> Result<(), DS1390Error<SPI::Error>> {
        let time_representation = self.time_representation().await?;
        let value =
            from_epoch(epoch, time_representation, timezone).map_err(DS1390Error::DateTime)?;
        self.write_frame(&RawFrame::encode(&value, time_representation))
            .await?;
        let _ = self.set_valid().await?;
        Ok(())
    }
}

// Register access implementations
macro_rules! impl_register_access {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<SPI: SpiDevice> DS1390<SPI> {
            $(
                paste! {
                    #[doc = concat!("Gets the value of the ", stringify!($name), " register.")]
                    #[doc = "\n\n# Returns"]
                    #[doc = concat!("* `Ok(", stringify!($typ), ")` - The register value on success")]
                    #[doc = "* `Err(DS1390Error)` on error"]
                    pub async fn [<$name _register>](&mut self) -> Result<$typ, DS1390Error<SPI::Error>> {
                        Ok($typ(self.read_register($regaddr).await?))
                    }

                    #[doc = concat!("Sets the value of the ", stringify!($name), " register.")]
                    #[doc = "\n\n# Arguments"]
                    #[doc = concat!("* `value` - The value to write to the ", stringify!($name), " register")]
                    #[doc = "\n\n# Returns"]
                    #[doc = "* `Ok(())` on success"]
                    #[doc = "* `Err(DS1390Error)` on error"]
                    pub async fn [<set_ $name _register>](&mut self, value: $typ) -> Result<(), DS1390Error<SPI::Error>> {
                        self.write_register($regaddr, value.into()).await
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
