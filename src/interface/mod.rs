//! Bus interface abstraction for the MAX31790 driver.
//!
//! Implementors only provide single-byte register access. Bit and bit-field
//! mutation is layered on top as read-modify-write: the register is re-read
//! immediately before every write and nothing is cached between calls. The
//! pair is not atomic, so two mutations of the same register must not be
//! interleaved.

pub mod i2c;

use crate::error::{Error, Result};
use crate::log::trace;

/// Abstraction over the low-level bus access required by the driver.
pub trait Max31790Interface {
    /// Error type produced by the concrete bus implementation.
    type Error;

    /// Writes a single register.
    fn write_register(&mut self, register: u8, value: u8) -> core::result::Result<(), Self::Error>;

    /// Reads a single register.
    fn read_register(&mut self, register: u8) -> core::result::Result<u8, Self::Error>;

    /// Sets or clears exactly one bit of `register`.
    fn write_bit(&mut self, register: u8, bit: u8, value: bool) -> Result<(), Self::Error> {
        if bit > 7 {
            return Err(Error::InvalidArgument);
        }

        let current = self.read_register(register)?;
        let updated = merge_bit(current, bit, value);
        trace!("write_bit reg={=u8:#x} {=u8:#x} -> {=u8:#x}", register, current, updated);
        self.write_register(register, updated)?;
        Ok(())
    }

    /// Replaces the `width` bits of `register` whose most significant bit sits
    /// at `msb`. `value` is masked to `width` bits before the merge.
    fn write_bit_field(
        &mut self,
        register: u8,
        msb: u8,
        width: u8,
        value: u8,
    ) -> Result<(), Self::Error> {
        // Validate before touching the bus.
        merge_field(0, msb, width, value).ok_or(Error::InvalidArgument)?;

        let current = self.read_register(register)?;
        let updated = merge_field(current, msb, width, value).ok_or(Error::InvalidArgument)?;
        trace!("write_bit_field reg={=u8:#x} {=u8:#x} -> {=u8:#x}", register, current, updated);
        self.write_register(register, updated)?;
        Ok(())
    }
}

/// Returns `current` with `bit` forced to `value`.
pub const fn merge_bit(current: u8, bit: u8, value: bool) -> u8 {
    let mask = 1u8 << (bit & 0x07);
    if value { current | mask } else { current & !mask }
}

/// Returns `current` with the field `[msb, msb - width + 1]` replaced by the
/// low `width` bits of `value`.
///
/// Returns `None` if the field does not fit inside a byte.
pub const fn merge_field(current: u8, msb: u8, width: u8, value: u8) -> Option<u8> {
    if width == 0 || width > 8 || msb > 7 || msb + 1 < width {
        return None;
    }

    let shift = msb + 1 - width;
    let field_mask = ((1u16 << width) - 1) as u8;
    let mask = field_mask << shift;
    let bits = (value & field_mask) << shift;
    Some((current & !mask) | bits)
}
