//! Conversions between human units and the chip's register encodings.
//!
//! The tach count is the number of 8192 Hz clock cycles counted across a
//! window of `SR` tach periods. With `NP` tach pulses per revolution:
//!
//! ```text
//!            60 * 8192 * SR
//!   RPM  =  ----------------
//!              count * NP
//! ```
//!
//! All divisions truncate toward zero.

use crate::registers::{DUTY_CYCLE_MAX, TACH_COUNT_MAX};

/// Frequency of the chip's internal tach counting clock.
pub const TACH_CLOCK_HZ: u32 = 8_192;

/// Converts a duty cycle percentage into a raw 9-bit duty value.
///
/// Returns `None` for percentages above 100. Truncates, so 100 % maps to 511.
pub const fn duty_from_percent(percent: u8) -> Option<u16> {
    if percent > 100 {
        return None;
    }
    Some((percent as u32 * DUTY_CYCLE_MAX as u32 / 100) as u16)
}

/// Converts a raw duty value back into a truncated percentage.
pub const fn percent_from_duty(raw: u16) -> u8 {
    let raw = if raw > DUTY_CYCLE_MAX { DUTY_CYCLE_MAX } else { raw };
    (raw as u32 * 100 / DUTY_CYCLE_MAX as u32) as u8
}

/// RPM scaling derived from the chip-wide tach constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TachScale {
    pulses_per_revolution: u8,
    tach_periods: u8,
}

impl TachScale {
    /// Creates a scale for `pulses_per_revolution` (NP) and `tach_periods` (SR).
    pub const fn new(pulses_per_revolution: u8, tach_periods: u8) -> Self {
        Self {
            pulses_per_revolution,
            tach_periods,
        }
    }

    const fn numerator(self) -> u64 {
        60 * self.tach_periods as u64 * TACH_CLOCK_HZ as u64
    }

    /// Tach count for a target speed.
    ///
    /// Returns `None` when `rpm` is zero or when the resulting count does not
    /// fit the 11-bit register field (too slow) or truncates to zero (too fast).
    pub const fn count_for_rpm(self, rpm: u32) -> Option<u16> {
        if rpm == 0 || self.pulses_per_revolution == 0 {
            return None;
        }

        let count = self.numerator() / (self.pulses_per_revolution as u64 * rpm as u64);
        if count == 0 || count > TACH_COUNT_MAX as u64 {
            None
        } else {
            Some(count as u16)
        }
    }

    /// Speed for a tach count. A zero count yields 0 RPM.
    pub const fn rpm_for_count(self, count: u16) -> u32 {
        if count == 0 || self.pulses_per_revolution == 0 {
            return 0;
        }
        (self.numerator() / (self.pulses_per_revolution as u64 * count as u64)) as u32
    }

    /// Speed reported when the tach counter saturates because no pulses
    /// arrived within the window (480 RPM for NP = 2, SR = 4).
    pub const fn stall_rpm(self) -> u32 {
        self.rpm_for_count(TACH_COUNT_MAX)
    }

    /// Speed for a measured tach count, mapping a stalled fan to 0 RPM.
    pub const fn measured_rpm(self, count: u16) -> u32 {
        let rpm = self.rpm_for_count(count);
        if rpm == self.stall_rpm() { 0 } else { rpm }
    }

    /// Slowest speed that can be programmed as a tach target.
    pub const fn min_rpm(self) -> u32 {
        self.rpm_for_count(TACH_COUNT_MAX) + 1
    }
}
