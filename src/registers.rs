//! Register definitions and bitfield structures for the DS1390 RTC.
//!
//! This module contains the register address map, the bitfield layout of
//! every timekeeping register, and the small enums packed into them. Bytes
//! that carry flags next to BCD digits (hours and month) also get explicit
//! encode/decode helpers so the bit layout is handled in one place.

use bitfield::bitfield;

use crate::bcd::{bcd_to_decimal, clamp_to_bcd};

/// Bit 7 of the address byte selects a write access.
pub const WRITE_FLAG: u8 = 0x80;

/// Register addresses for the DS1390 RTC (read form).
#[allow(unused)]
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegAddr {
    /// Hundredths of seconds register (0-99)
    Hundredths = 0x00,
    /// Seconds register (0-59)
    Seconds = 0x01,
    /// Minutes register (0-59)
    Minutes = 0x02,
    /// Hours register (1-12 + AM/PM or 0-23)
    Hours = 0x03,
    /// Day of week register (1-7, 1 = Sunday)
    Weekday = 0x04,
    /// Date register (1-31)
    Date = 0x05,
    /// Month register (1-12) with century bit
    Month = 0x06,
    /// Year register (0-99)
    Year = 0x07,
    /// Status register (oscillator stop flag)
    Status = 0x0E,
    /// Trickle charger register
    TrickleCharger = 0x0F,
}

impl RegAddr {
    /// Address byte that reads this register.
    pub const fn read(self) -> u8 {
        self as u8
    }

    /// Address byte that writes this register.
    pub const fn write(self) -> u8 {
        self as u8 | WRITE_FLAG
    }
}

/// Time representation format for the DS1390.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeRepresentation {
    /// 24-hour format (0-23)
    #[default]
    TwentyFourHour = 0,
    /// 12-hour format (1-12 + AM/PM)
    TwelveHour = 1,
}
impl From<u8> for TimeRepresentation {
    /// Creates a `TimeRepresentation` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => TimeRepresentation::TwentyFourHour,
            1 => TimeRepresentation::TwelveHour,
            _ => panic!("Invalid value for TimeRepresentation: {}", v),
        }
    }
}
impl From<TimeRepresentation> for u8 {
    /// Converts a `TimeRepresentation` to its raw register value.
    fn from(v: TimeRepresentation) -> Self {
        v as u8
    }
}

/// Half of the day in 12-hour format.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AmPm {
    /// Before noon
    #[default]
    Am = 0,
    /// Noon and after
    Pm = 1,
}
impl From<u8> for AmPm {
    /// Creates an `AmPm` from a raw register bit.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => AmPm::Am,
            1 => AmPm::Pm,
            _ => panic!("Invalid value for AmPm: {}", v),
        }
    }
}
impl From<AmPm> for u8 {
    fn from(v: AmPm) -> Self {
        v as u8
    }
}

/// Trickle charger settings accepted by the DS1390.
///
/// The register value is written verbatim. Any byte outside this set is
/// refused by the driver.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrickleCharger {
    /// Charger disabled
    #[default]
    Disabled = 0x00,
    /// 250 Ω, no diode
    Ohm250NoDiode = 0xA5,
    /// 250 Ω with diode
    Ohm250Diode = 0xA9,
    /// 2 kΩ, no diode
    Ohm2kNoDiode = 0xA6,
    /// 2 kΩ with diode
    Ohm2kDiode = 0xAA,
    /// 4 kΩ, no diode
    Ohm4kNoDiode = 0xA7,
    /// 4 kΩ with diode
    Ohm4kDiode = 0xAB,
}
impl TryFrom<u8> for TrickleCharger {
    /// The rejected byte.
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0x00 => Ok(TrickleCharger::Disabled),
            0xA5 => Ok(TrickleCharger::Ohm250NoDiode),
            0xA9 => Ok(TrickleCharger::Ohm250Diode),
            0xA6 => Ok(TrickleCharger::Ohm2kNoDiode),
            0xAA => Ok(TrickleCharger::Ohm2kDiode),
            0xA7 => Ok(TrickleCharger::Ohm4kNoDiode),
            0xAB => Ok(TrickleCharger::Ohm4kDiode),
            other => Err(other),
        }
    }
}
impl From<TrickleCharger> for u8 {
    fn from(v: TrickleCharger) -> Self {
        v as u8
    }
}

// This macro generates the From<u8> and Into<u8> implementations for the
// register type
macro_rules! from_register_u8 {
    ($typ:ty) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                paste::paste!([< $typ >](v))
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
    };
}

bitfield! {
    /// Hundredths of seconds register (0-99) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Hundredths(u8);
    impl Debug;
    /// Tenths of a second (0-9)
    pub tenths, set_tenths: 7, 4;
    /// Hundredths of a second (0-9)
    pub hundredths, set_hundredths: 3, 0;
}
from_register_u8!(Hundredths);

bitfield! {
    /// Seconds register (0-59) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Seconds(u8);
    impl Debug;
    /// Tens place of seconds (0-5)
    pub ten_seconds, set_ten_seconds: 6, 4;
    /// Ones place of seconds (0-9)
    pub seconds, set_seconds: 3, 0;
}
from_register_u8!(Seconds);

bitfield! {
    /// Minutes register (0-59) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Minutes(u8);
    impl Debug;
    /// Tens place of minutes (0-5)
    pub ten_minutes, set_ten_minutes: 6, 4;
    /// Ones place of minutes (0-9)
    pub minutes, set_minutes: 3, 0;
}
from_register_u8!(Minutes);

bitfield! {
    /// Hours register with format selection and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Hours(u8);
    impl Debug;
    /// Time representation format (12/24 hour)
    pub from into TimeRepresentation, time_representation, set_time_representation: 6, 6;
    /// PM flag (12-hour) or 20-hour bit (24-hour)
    pub pm_or_twenty_hours, set_pm_or_twenty_hours: 5, 5;
    /// Tens place of hours
    pub ten_hours, set_ten_hours: 4, 4;
    /// Ones place of hours
    pub hours, set_hours: 3, 0;
}
from_register_u8!(Hours);

impl Hours {
    /// Packs an hour in the given format.
    ///
    /// 24-hour values are clamped to 0-23 and leave the format bit clear.
    /// 12-hour values are clamped to 1-12, carry `am_pm` in bit 5 and always
    /// set the format bit.
    pub fn encode(hours: u8, am_pm: AmPm, time_representation: TimeRepresentation) -> Self {
        match time_representation {
            TimeRepresentation::TwentyFourHour => Hours(clamp_to_bcd(hours, 0, 23)),
            TimeRepresentation::TwelveHour => {
                let mut value = Hours(clamp_to_bcd(hours, 1, 12));
                value.set_pm_or_twenty_hours(u8::from(am_pm));
                value.set_time_representation(TimeRepresentation::TwelveHour);
                value
            }
        }
    }

    /// Packs a 0-23 hour, converting to 1-12 + AM/PM for 12-hour format.
    pub fn from_24h(hour: u8, time_representation: TimeRepresentation) -> Self {
        match time_representation {
            TimeRepresentation::TwentyFourHour => {
                Self::encode(hour, AmPm::Am, TimeRepresentation::TwentyFourHour)
            }
            TimeRepresentation::TwelveHour => {
                let (hour12, am_pm) = to_twelve_hour(hour);
                Self::encode(hour12, am_pm, TimeRepresentation::TwelveHour)
            }
        }
    }

    /// Decimal hour as displayed in the register's own format.
    pub fn value(&self) -> u8 {
        match self.time_representation() {
            TimeRepresentation::TwentyFourHour => bcd_to_decimal(self.0 & 0x3F),
            TimeRepresentation::TwelveHour => bcd_to_decimal(self.0 & 0x1F),
        }
    }

    /// AM/PM flag; always `Am` in 24-hour format.
    pub fn am_pm(&self) -> AmPm {
        match self.time_representation() {
            TimeRepresentation::TwentyFourHour => AmPm::Am,
            TimeRepresentation::TwelveHour => AmPm::from(self.pm_or_twenty_hours()),
        }
    }

    /// Hour of the day in 0-23 regardless of format.
    pub fn to_24h(&self) -> u8 {
        match self.time_representation() {
            TimeRepresentation::TwentyFourHour => self.value(),
            TimeRepresentation::TwelveHour => from_twelve_hour(self.value(), self.am_pm()),
        }
    }
}

/// Maps 0-23 onto 1-12 + AM/PM (0 is 12 AM, 12 is 12 PM).
pub(crate) fn to_twelve_hour(hour: u8) -> (u8, AmPm) {
    match hour {
        0 => (12, AmPm::Am),
        1..=11 => (hour, AmPm::Am),
        12 => (12, AmPm::Pm),
        h => (h - 12, AmPm::Pm),
    }
}

/// Maps 1-12 + AM/PM back onto 0-23.
pub(crate) fn from_twelve_hour(hour: u8, am_pm: AmPm) -> u8 {
    match (hour, am_pm) {
        (12, AmPm::Am) => 0,
        (12, AmPm::Pm) => 12,
        (h, AmPm::Am) => h,
        (h, AmPm::Pm) => h + 12,
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Hours {
    fn format(&self, f: defmt::Formatter) {
        match self.time_representation() {
            TimeRepresentation::TwentyFourHour => {
                defmt::write!(f, "Hours({}h 24h)", self.value());
            }
            TimeRepresentation::TwelveHour => {
                let is_pm = self.am_pm() == AmPm::Pm;
                defmt::write!(f, "Hours({}h {})", self.value(), if is_pm { "PM" } else { "AM" });
            }
        }
    }
}

bitfield! {
    /// Day of week register (1-7, 1 = Sunday).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Weekday(u8);
    impl Debug;
    /// Day of week (1-7)
    pub weekday, set_weekday: 2, 0;
}
from_register_u8!(Weekday);

bitfield! {
    /// Date register (1-31) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Date(u8);
    impl Debug;
    /// Tens place of date (0-3)
    pub ten_date, set_ten_date: 5, 4;
    /// Ones place of date (0-9)
    pub date, set_date: 3, 0;
}
from_register_u8!(Date);

bitfield! {
    /// Month register (1-12) with century flag and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Month(u8);
    impl Debug;
    /// Century flag
    pub century, set_century: 7;
    /// Tens place of month (0-1)
    pub ten_month, set_ten_month: 4, 4;
    /// Ones place of month (0-9)
    pub month, set_month: 3, 0;
}
from_register_u8!(Month);

impl Month {
    /// Packs a month (clamped to 1-12) next to the century flag.
    pub fn encode(month: u8, century: bool) -> Self {
        let mut value = Month(clamp_to_bcd(month, 1, 12));
        value.set_century(century);
        value
    }

    /// Decimal month with the century bit masked off.
    pub fn value(&self) -> u8 {
        bcd_to_decimal(self.0 & 0x1F)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Month {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Month({}", self.value());
        if self.century() {
            defmt::write!(f, ", century");
        }
        defmt::write!(f, ")");
    }
}

bitfield! {
    /// Year register (0-99) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Year(u8);
    impl Debug;
    /// Tens place of year (0-9)
    pub ten_year, set_ten_year: 7, 4;
    /// Ones place of year (0-9)
    pub year, set_year: 3, 0;
}
from_register_u8!(Year);

bitfield! {
    /// Status register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Status(u8);
    impl Debug;
    /// Oscillator stop flag, set when timekeeping was interrupted
    pub oscillator_stop_flag, set_oscillator_stop_flag: 7;
}
from_register_u8!(Status);

#[cfg(feature = "defmt")]
impl defmt::Format for Status {
    fn format(&self, f: defmt::Formatter) {
        if self.oscillator_stop_flag() {
            defmt::write!(f, "Status(OSF)");
        } else {
            defmt::write!(f, "Status(clear)");
        }
    }
}

bitfield! {
    /// Trickle charger register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Trickle(u8);
    impl Debug;
    /// Trickle charger select, 0b1010 enables the charger
    pub charger_select, set_charger_select: 7, 4;
    /// Diode select (0b01 no diode, 0b10 one diode)
    pub diode_select, set_diode_select: 3, 2;
    /// Resistor select (0b01 250 Ω, 0b10 2 kΩ, 0b11 4 kΩ)
    pub resistor_select, set_resistor_select: 1, 0;
}
from_register_u8!(Trickle);

impl Trickle {
    /// The documented setting this register holds, if any.
    pub fn mode(&self) -> Option<TrickleCharger> {
        TrickleCharger::try_from(self.0).ok()
    }
}
