//! Binary-coded decimal helpers.
//!
//! Every calendar register of the DS1390 stores two decimal digits, one per
//! nibble. These helpers are the only place the packing rule lives.

/// Packs a decimal value into one BCD byte (tens in the high nibble).
///
/// The input must be in 0..=99. Larger values do not fit two digits and the
/// tens digit spills past the high nibble; callers clamp before packing.
pub const fn decimal_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Unpacks a BCD byte into its decimal value.
pub const fn bcd_to_decimal(bcd: u8) -> u8 {
    ((bcd >> 4) & 0x0F) * 10 + (bcd & 0x0F)
}

/// Clamps `value` into `min..=max` and packs it.
pub(crate) fn clamp_to_bcd(value: u8, min: u8, max: u8) -> u8 {
    decimal_to_bcd(value.clamp(min, max))
}
