//! Conversion between calendar values and Unix timestamps.
//!
//! The arithmetic works directly on day and month counts and does not use a
//! date library. Timestamps are seconds since 1970-01-01T00:00:00 UTC without
//! leap seconds; the calendar side is limited to the two-digit years the
//! DS1390 can hold (2000-2099).
//!
//! The timezone argument is the whole-hour offset of the calendar value from
//! UTC, clamped to -12..=12. Hundredths and the century flag do not take part
//! in the conversion.

use crate::registers::to_twelve_hour;
use crate::{warn, AmPm, CalendarValue, DS1390DateTimeError, TimeRepresentation};

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;

/// First year of the Unix epoch.
const EPOCH_YEAR: u32 = 1970;
/// Years between the Unix epoch and year 00 of the register.
const REGISTER_YEAR_OFFSET: u32 = 30;

/// Thursday, counted from Sunday = 0.
const EPOCH_WEEKDAY: i64 = 4;

const MONTH_DAYS: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

const MIN_TIMEZONE: i8 = -12;
const MAX_TIMEZONE: i8 = 12;

/// Gregorian leap-year rule.
pub const fn is_leap_year(year: u32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Length of `month` (1-12) in `year`. Returns 0 for any other month.
pub fn days_in_month(year: u32, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        1..=12 => MONTH_DAYS[usize::from(month - 1)],
        _ => 0,
    }
}

const fn days_in_year(year: u32) -> i64 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

fn clamp_timezone(timezone: i8) -> i64 {
    let clamped = timezone.clamp(MIN_TIMEZONE, MAX_TIMEZONE);
    if clamped != timezone {
        warn!("timezone {} clamped to {}", timezone, clamped);
    }
    i64::from(clamped)
}

/// Converts a calendar value to a Unix timestamp.
///
/// `hours` is read in `time_representation`: in 12-hour format 12 AM is
/// midnight and 12 PM is noon. `timezone` is the offset of `value` from UTC
/// in whole hours.
///
/// # Errors
/// [`DS1390DateTimeError::InvalidDateTime`] if the year is above 99, the
/// month is outside 1-12 or the day is 0.
/// [`DS1390DateTimeError::EpochOutOfRange`] if the result does not fit in a
/// `u32`.
pub fn to_epoch(
    value: &CalendarValue,
    time_representation: TimeRepresentation,
    timezone: i8,
) -> Result<u32, DS1390DateTimeError> {
    if value.year > 99 || !(1..=12).contains(&value.month) || value.day == 0 {
        warn!(
            "cannot convert year={} month={} day={} to epoch",
            value.year, value.month, value.day
        );
        return Err(DS1390DateTimeError::InvalidDateTime);
    }

    let years = u32::from(value.year) + REGISTER_YEAR_OFFSET;
    let year = EPOCH_YEAR + years;
    let hour = value.hour_24(time_representation);

    let mut epoch = -clamp_timezone(timezone) * SECONDS_PER_HOUR;

    epoch += i64::from(years) * 365 * SECONDS_PER_DAY;
    let leap_days = (EPOCH_YEAR..year).filter(|y| is_leap_year(*y)).count();
    epoch += leap_days as i64 * SECONDS_PER_DAY;

    let month_days: i64 = (1..value.month)
        .map(|m| i64::from(days_in_month(year, m)))
        .sum();
    epoch += month_days * SECONDS_PER_DAY;

    epoch += (i64::from(value.day) - 1) * SECONDS_PER_DAY;
    epoch += i64::from(hour) * SECONDS_PER_HOUR;
    epoch += i64::from(value.minutes) * SECONDS_PER_MINUTE;
    epoch += i64::from(value.seconds);

    u32::try_from(epoch).map_err(|_| DS1390DateTimeError::EpochOutOfRange)
}

/// Converts a Unix timestamp to a calendar value in the given timezone.
///
/// In 12-hour format midnight becomes 12 AM and noon 12 PM. `hundredths` is
/// always 0 and `century` always false.
///
/// # Errors
/// [`DS1390DateTimeError::EpochOutOfRange`] if the local time falls outside
/// 2000-01-01 through 2099-12-31.
pub fn from_epoch(
    epoch: u32,
    time_representation: TimeRepresentation,
    timezone: i8,
) -> Result<CalendarValue, DS1390DateTimeError> {
    let local = i64::from(epoch) + clamp_timezone(timezone) * SECONDS_PER_HOUR;
    if local < 0 {
        return Err(DS1390DateTimeError::EpochOutOfRange);
    }

    // Bounded by the modulo, the casts cannot truncate
    let seconds = (local % SECONDS_PER_MINUTE) as u8;
    let minutes = (local / SECONDS_PER_MINUTE % 60) as u8;
    let hour = (local / SECONDS_PER_HOUR % 24) as u8;
    let (hours, am_pm) = match time_representation {
        TimeRepresentation::TwentyFourHour => (hour, AmPm::Am),
        TimeRepresentation::TwelveHour => to_twelve_hour(hour),
    };

    let mut days = local / SECONDS_PER_DAY;
    let weekday = ((days + EPOCH_WEEKDAY) % 7 + 1) as u8;

    let mut year = EPOCH_YEAR;
    while days >= days_in_year(year) {
        days -= days_in_year(year);
        year += 1;
    }
    if !(2000..=2099).contains(&year) {
        warn!("epoch {} lands in year {}", epoch, year);
        return Err(DS1390DateTimeError::EpochOutOfRange);
    }

    let mut month = 1;
    while month < 12 && days >= i64::from(days_in_month(year, month)) {
        days -= i64::from(days_in_month(year, month));
        month += 1;
    }

    Ok(CalendarValue {
        hundredths: 0,
        seconds,
        minutes,
        hours,
        weekday,
        day: (days + 1) as u8,
        month,
        year: (year - EPOCH_YEAR - REGISTER_YEAR_OFFSET) as u8,
        century: false,
        am_pm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate, Timelike};

    fn calendar(year: u8, month: u8, day: u8, hours: u8, minutes: u8, seconds: u8) -> CalendarValue {
        CalendarValue {
            hundredths: 0,
            seconds,
            minutes,
            hours,
            weekday: 1,
            day,
            month,
            year,
            century: false,
            am_pm: AmPm::Am,
        }
    }

    #[test]
    fn test_leap_years() {
        assert!(is_leap_year(2000));
        assert!(is_leap_year(2004));
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(2023));
        assert!(!is_leap_year(2100));
        assert!(!is_leap_year(1900));
        assert!(is_leap_year(2400));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2024, 1), 31);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 0), 0);
        assert_eq!(days_in_month(2024, 13), 0);
    }

    #[test]
    fn test_to_epoch_millennium() {
        let value = calendar(0, 1, 1, 0, 0, 0);
        assert_eq!(
            to_epoch(&value, TimeRepresentation::TwentyFourHour, 0),
            Ok(946_684_800)
        );
    }

    #[test]
    fn test_from_epoch_millennium_is_saturday() {
        let value = from_epoch(946_684_800, TimeRepresentation::TwentyFourHour, 0).unwrap();
        assert_eq!(value.year, 0);
        assert_eq!(value.month, 1);
        assert_eq!(value.day, 1);
        assert_eq!(value.hours, 0);
        assert_eq!(value.weekday, 7);
    }

    #[test]
    fn test_to_epoch_timezone() {
        // 2000-01-01 01:00 at UTC+1 is midnight UTC
        let value = calendar(0, 1, 1, 1, 0, 0);
        assert_eq!(
            to_epoch(&value, TimeRepresentation::TwentyFourHour, 1),
            Ok(946_684_800)
        );
        // Offsets beyond 12 hours are clamped
        let value = calendar(0, 1, 1, 12, 0, 0);
        assert_eq!(
            to_epoch(&value, TimeRepresentation::TwentyFourHour, 20),
            Ok(946_684_800)
        );
    }

    #[test]
    fn test_to_epoch_twelve_hour() {
        let mut value = calendar(24, 2, 29, 12, 0, 0);
        value.am_pm = AmPm::Am;
        let midnight = to_epoch(&value, TimeRepresentation::TwelveHour, 0).unwrap();
        value.am_pm = AmPm::Pm;
        let noon = to_epoch(&value, TimeRepresentation::TwelveHour, 0).unwrap();
        assert_eq!(noon - midnight, 12 * 3600);

        value.hours = 11;
        let before_midnight = to_epoch(&value, TimeRepresentation::TwelveHour, 0).unwrap();
        assert_eq!(before_midnight - midnight, 23 * 3600);
    }

    #[test]
    fn test_to_epoch_invalid_fields() {
        let mut value = calendar(24, 0, 1, 0, 0, 0);
        assert_eq!(
            to_epoch(&value, TimeRepresentation::TwentyFourHour, 0),
            Err(DS1390DateTimeError::InvalidDateTime)
        );
        value.month = 13;
        assert_eq!(
            to_epoch(&value, TimeRepresentation::TwentyFourHour, 0),
            Err(DS1390DateTimeError::InvalidDateTime)
        );
        value.month = 1;
        value.day = 0;
        assert_eq!(
            to_epoch(&value, TimeRepresentation::TwentyFourHour, 0),
            Err(DS1390DateTimeError::InvalidDateTime)
        );
        value.day = 1;
        value.year = 100;
        assert_eq!(
            to_epoch(&value, TimeRepresentation::TwentyFourHour, 0),
            Err(DS1390DateTimeError::InvalidDateTime)
        );
    }

    #[test]
    fn test_from_epoch_out_of_range() {
        // 1999-12-31 23:59:59 UTC
        assert_eq!(
            from_epoch(946_684_799, TimeRepresentation::TwentyFourHour, 0),
            Err(DS1390DateTimeError::EpochOutOfRange)
        );
        // The same instant is already 2000 east of Greenwich
        assert!(from_epoch(946_684_799, TimeRepresentation::TwentyFourHour, 1).is_ok());
        // 2100-01-01 00:00:00 UTC
        assert_eq!(
            from_epoch(4_102_444_800, TimeRepresentation::TwentyFourHour, 0),
            Err(DS1390DateTimeError::EpochOutOfRange)
        );
        assert_eq!(
            from_epoch(0, TimeRepresentation::TwentyFourHour, -12),
            Err(DS1390DateTimeError::EpochOutOfRange)
        );
    }

    #[test]
    fn test_from_epoch_twelve_hour_mapping() {
        let base = 946_684_800; // midnight
        let cases = [
            (0, 12, AmPm::Am),
            (1, 1, AmPm::Am),
            (11, 11, AmPm::Am),
            (12, 12, AmPm::Pm),
            (13, 1, AmPm::Pm),
            (23, 11, AmPm::Pm),
        ];
        for (hour, expected, am_pm) in cases {
            let value =
                from_epoch(base + hour * 3600, TimeRepresentation::TwelveHour, 0).unwrap();
            assert_eq!(value.hours, expected, "hour {hour}");
            assert_eq!(value.am_pm, am_pm, "hour {hour}");
        }
    }

    #[test]
    fn test_last_representable_second() {
        let value = calendar(99, 12, 31, 23, 59, 59);
        let epoch = to_epoch(&value, TimeRepresentation::TwentyFourHour, 0).unwrap();
        assert_eq!(epoch, 4_102_444_799);
        let back = from_epoch(epoch, TimeRepresentation::TwentyFourHour, 0).unwrap();
        assert_eq!((back.year, back.month, back.day), (99, 12, 31));
        // Thursday
        assert_eq!(back.weekday, 5);
    }

    #[test]
    fn test_epoch_matches_chrono_for_every_day() {
        let mut date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2099, 12, 31).unwrap();
        let mut n: u32 = 0;
        while date <= end {
            let hour = n % 24;
            let minute = (n * 7) % 60;
            let second = (n * 13) % 60;
            let timezone = (n % 25) as i8 - 12;
            let time_representation = if n % 2 == 0 {
                TimeRepresentation::TwentyFourHour
            } else {
                TimeRepresentation::TwelveHour
            };

            let dt = date.and_hms_opt(hour, minute, second).unwrap();
            let value = CalendarValue::from_datetime(&dt, time_representation).unwrap();

            let expected = dt.and_utc().timestamp() - i64::from(timezone) * 3600;
            let epoch = to_epoch(&value, time_representation, timezone).unwrap();
            assert_eq!(i64::from(epoch), expected, "{dt} tz {timezone}");

            let back = from_epoch(epoch, time_representation, timezone).unwrap();
            assert_eq!(back, value, "{dt} tz {timezone}");
            assert_eq!(
                u32::from(back.weekday),
                dt.weekday().number_from_sunday(),
                "{dt}"
            );
            assert_eq!(
                u32::from(back.hour_24(time_representation)),
                dt.hour(),
                "{dt}"
            );

            date = date.succ_opt().unwrap();
            n += 1;
        }
    }
}
