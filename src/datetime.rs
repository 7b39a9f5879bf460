//! Calendar values and the register frame codec for the DS1390 RTC.
//!
//! The DS1390 keeps its calendar in 8 consecutive registers:
//! hundredths, seconds, minutes, hours, weekday, date, month and year.
//! [`RawFrame`] holds those bytes in their bitfield types and converts them to
//! and from the decimal [`CalendarValue`].
//!
//! Encoding clamps every field into its register range instead of failing,
//! so a frame built from any `CalendarValue` is always well formed.
//!
//! # chrono interop
//!
//! [`CalendarValue::from_datetime`] and [`CalendarValue::to_datetime`] bridge
//! to chrono's `NaiveDateTime` for years 2000-2099.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::bcd::{bcd_to_decimal, clamp_to_bcd};
use crate::registers::{from_twelve_hour, to_twelve_hour};
use crate::{
    debug, error, AmPm, Date, Hours, Hundredths, Minutes, Month, Seconds, TimeRepresentation,
    Weekday, Year,
};

/// Decoded calendar contents, one decimal value per field.
///
/// `hours` is 0-23 in 24-hour format and 1-12 in 12-hour format, where
/// `am_pm` selects the half of the day. `am_pm` is always `Am` for values
/// decoded in 24-hour format.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarValue {
    /// Hundredths of a second (0-99)
    pub hundredths: u8,
    /// Seconds (0-59)
    pub seconds: u8,
    /// Minutes (0-59)
    pub minutes: u8,
    /// Hours (0-23 or 1-12)
    pub hours: u8,
    /// Day of week (1-7, 1 = Sunday)
    pub weekday: u8,
    /// Day of month (1-31)
    pub day: u8,
    /// Month (1-12)
    pub month: u8,
    /// Two-digit year, offset from 2000 (0-99)
    pub year: u8,
    /// Century flag kept in bit 7 of the month register
    pub century: bool,
    /// AM/PM, meaningful in 12-hour format only
    pub am_pm: AmPm,
}

impl CalendarValue {
    /// Hour of the day in 0-23, interpreting `hours` in the given format.
    pub fn hour_24(&self, time_representation: TimeRepresentation) -> u8 {
        match time_representation {
            TimeRepresentation::TwentyFourHour => self.hours,
            TimeRepresentation::TwelveHour => from_twelve_hour(self.hours, self.am_pm),
        }
    }

    /// Builds a calendar value from a chrono `NaiveDateTime`.
    ///
    /// Hours are expressed in `time_representation`. Hundredths are taken
    /// from the sub-second part.
    ///
    /// # Errors
    /// Returns [`DS1390DateTimeError::InvalidDateTime`] for years outside
    /// 2000-2099.
    pub fn from_datetime(
        datetime: &NaiveDateTime,
        time_representation: TimeRepresentation,
    ) -> Result<Self, DS1390DateTimeError> {
        let year = datetime.year();
        if !(2000..=2099).contains(&year) {
            error!("Year {} is out of range! must be 2000-2099", year);
            return Err(DS1390DateTimeError::InvalidDateTime);
        }
        let year = u8::try_from(year - 2000).map_err(|_| DS1390DateTimeError::InvalidDateTime)?;

        // Every chrono field below is bounded well under u8::MAX
        let hour = datetime.hour() as u8;
        let (hours, am_pm) = match time_representation {
            TimeRepresentation::TwentyFourHour => (hour, AmPm::Am),
            TimeRepresentation::TwelveHour => to_twelve_hour(hour),
        };

        Ok(CalendarValue {
            hundredths: (datetime.nanosecond() % 1_000_000_000 / 10_000_000) as u8,
            seconds: datetime.second() as u8,
            minutes: datetime.minute() as u8,
            hours,
            weekday: datetime.weekday().number_from_sunday() as u8,
            day: datetime.day() as u8,
            month: datetime.month() as u8,
            year,
            century: false,
            am_pm,
        })
    }

    /// Converts to a chrono `NaiveDateTime`, reading `hours` in the given
    /// format. The weekday and century flag are not consulted.
    ///
    /// # Errors
    /// Returns [`DS1390DateTimeError::InvalidDateTime`] when the fields do
    /// not form a real date and time.
    pub fn to_datetime(
        &self,
        time_representation: TimeRepresentation,
    ) -> Result<NaiveDateTime, DS1390DateTimeError> {
        let hour = self.hour_24(time_representation);
        NaiveDate::from_ymd_opt(
            2000 + i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )
        .and_then(|d| {
            d.and_hms_milli_opt(
                u32::from(hour),
                u32::from(self.minutes),
                u32::from(self.seconds),
                u32::from(self.hundredths) * 10,
            )
        })
        .ok_or(DS1390DateTimeError::InvalidDateTime)
    }
}

/// The 8 calendar registers exactly as they travel over the bus.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RawFrame {
    /// Hundredths of seconds register
    pub hundredths: Hundredths,
    /// Seconds register
    pub seconds: Seconds,
    /// Minutes register
    pub minutes: Minutes,
    /// Hours register, carries the format and AM/PM bits
    pub hours: Hours,
    /// Day of week register
    pub weekday: Weekday,
    /// Date register
    pub date: Date,
    /// Month register, carries the century bit
    pub month: Month,
    /// Year register
    pub year: Year,
}

impl RawFrame {
    /// Number of registers in a frame.
    pub const LEN: usize = 8;

    /// Format advertised by the frame's hours register.
    pub fn time_representation(&self) -> TimeRepresentation {
        self.hours.time_representation()
    }

    /// Decodes the frame into decimal fields.
    pub fn decode(&self) -> CalendarValue {
        let value = CalendarValue {
            hundredths: bcd_to_decimal(self.hundredths.0),
            seconds: bcd_to_decimal(self.seconds.0),
            minutes: bcd_to_decimal(self.minutes.0),
            hours: self.hours.value(),
            weekday: bcd_to_decimal(self.weekday.0),
            day: bcd_to_decimal(self.date.0),
            month: self.month.value(),
            year: bcd_to_decimal(self.year.0),
            century: self.month.century(),
            am_pm: self.hours.am_pm(),
        };
        debug!("decoded frame hours={:?} value={:?}", self.hours, value);
        value
    }

    /// Encodes `value` with hours packed for `time_representation`.
    ///
    /// Out-of-range fields are clamped to their register range.
    pub fn encode(value: &CalendarValue, time_representation: TimeRepresentation) -> Self {
        RawFrame {
            hundredths: Hundredths(clamp_to_bcd(value.hundredths, 0, 99)),
            seconds: Seconds(clamp_to_bcd(value.seconds, 0, 59)),
            minutes: Minutes(clamp_to_bcd(value.minutes, 0, 59)),
            hours: Hours::encode(value.hours, value.am_pm, time_representation),
            weekday: Weekday(clamp_to_bcd(value.weekday, 1, 7)),
            date: Date(clamp_to_bcd(value.day, 1, 31)),
            month: Month::encode(value.month, value.century),
            year: Year(clamp_to_bcd(value.year, 0, 99)),
        }
    }
}

impl From<[u8; 8]> for RawFrame {
    fn from(data: [u8; 8]) -> Self {
        RawFrame {
            hundredths: Hundredths(data[0]),
            seconds: Seconds(data[1]),
            minutes: Minutes(data[2]),
            hours: Hours(data[3]),
            weekday: Weekday(data[4]),
            date: Date(data[5]),
            month: Month(data[6]),
            year: Year(data[7]),
        }
    }
}

impl From<&RawFrame> for [u8; 8] {
    fn from(frame: &RawFrame) -> [u8; 8] {
        [
            frame.hundredths.0,
            frame.seconds.0,
            frame.minutes.0,
            frame.hours.0,
            frame.weekday.0,
            frame.date.0,
            frame.month.0,
            frame.year.0,
        ]
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors that can occur during DS1390 date/time conversion.
pub enum DS1390DateTimeError {
    /// The date/time fields do not describe a representable calendar value
    InvalidDateTime,
    /// The timestamp falls outside 2000-01-01 through 2099-12-31, or does
    /// not fit in 32 bits
    EpochOutOfRange,
}
