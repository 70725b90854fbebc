//! Strongly typed parameter enumerations for the MAX31790 driver.
//!
//! Every coded register setting is a closed enum whose discriminant is the
//! datasheet bit code. Raw codes coming from a register or a user interface go
//! through `TryFrom<u8>`, which rejects anything outside the enumeration with
//! [`InvalidCode`]. Codes the chip treats as aliases of another setting decode
//! to that setting.
//!
//! # Examples
//!
//! ```rust
//! use max31790::params::{PwmFrequency, SpinUp, TachAveraging};
//!
//! let freq = PwmFrequency::F25kHz;
//! assert_eq!(freq.bits(), 0b1011);
//! assert_eq!(TachAveraging::try_from(0b110).ok(), Some(TachAveraging::Periods32));
//! assert!(PwmFrequency::try_from(0b0101).is_err());
//! let _ = SpinUp::OneSecond;
//! ```

use modular_bitfield::prelude::Specifier;

use crate::error::{Error, Result};

/// Rejection raised when a raw code is not part of an enumeration.
///
/// Driver operations that decode a register code report this as
/// [`Error::InvalidArgument`]; see [`decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidCode(pub u8);

impl InvalidCode {
    /// Converts the rejection into the driver error.
    pub const fn into_error<E>(self) -> Error<E> {
        Error::InvalidArgument
    }
}

/// Decodes a raw register code, reporting codes outside the enumeration as
/// [`Error::InvalidArgument`].
pub fn decode<T, E>(code: u8) -> Result<T, E>
where
    T: TryFrom<u8, Error = InvalidCode>,
{
    T::try_from(code).map_err(InvalidCode::into_error)
}

/// PWM output frequency selections (`PWM_FREQUENCY`, one nibble per bank).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PwmFrequency {
    /// 25 Hz.
    F25Hz = 0b0000,
    /// 30 Hz.
    F30Hz = 0b0001,
    /// 35 Hz.
    F35Hz = 0b0010,
    /// 100 Hz.
    F100Hz = 0b0011,
    /// 125 Hz.
    F125Hz = 0b0100,
    /// 5 kHz.
    F5kHz = 0b1001,
    /// 25 kHz.
    F25kHz = 0b1011,
}

impl PwmFrequency {
    /// Returns the 4-bit register code.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Returns the output frequency in hertz.
    pub const fn hz(self) -> u32 {
        match self {
            Self::F25Hz => 25,
            Self::F30Hz => 30,
            Self::F35Hz => 35,
            Self::F100Hz => 100,
            Self::F125Hz => 125,
            Self::F5kHz => 5_000,
            Self::F25kHz => 25_000,
        }
    }
}

impl TryFrom<u8> for PwmFrequency {
    type Error = InvalidCode;

    fn try_from(code: u8) -> core::result::Result<Self, Self::Error> {
        match code {
            0b0000 => Ok(Self::F25Hz),
            0b0001 => Ok(Self::F30Hz),
            0b0010 => Ok(Self::F35Hz),
            0b0011 => Ok(Self::F100Hz),
            0b0100 => Ok(Self::F125Hz),
            0b1001 => Ok(Self::F5kHz),
            0b1011 => Ok(Self::F25kHz),
            other => Err(InvalidCode(other)),
        }
    }
}

/// Spin-up behaviour encoded in `FAN_CONFIG[6:5]`.
///
/// The chip drives 100 % until two tach pulses are seen or the timeout
/// elapses, after which a channel without pulses is reported as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 2]
pub enum SpinUp {
    /// No spin-up.
    None = 0b00,
    /// Up to 500 ms.
    HalfSecond = 0b01,
    /// Up to 1 s.
    OneSecond = 0b10,
    /// Up to 2 s.
    TwoSeconds = 0b11,
}

impl SpinUp {
    /// Returns the 2-bit register code.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Returns the maximum spin-up time in milliseconds.
    pub const fn millis(self) -> u16 {
        match self {
            Self::None => 0,
            Self::HalfSecond => 500,
            Self::OneSecond => 1_000,
            Self::TwoSeconds => 2_000,
        }
    }
}

impl TryFrom<u8> for SpinUp {
    type Error = InvalidCode;

    fn try_from(code: u8) -> core::result::Result<Self, Self::Error> {
        match code {
            0b00 => Ok(Self::None),
            0b01 => Ok(Self::HalfSecond),
            0b10 => Ok(Self::OneSecond),
            0b11 => Ok(Self::TwoSeconds),
            other => Err(InvalidCode(other)),
        }
    }
}

/// Number of tach periods counted per measurement, `FAN_DYNAMICS[7:5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TachAveraging {
    /// 1 tach period.
    Periods1 = 0b000,
    /// 2 tach periods.
    Periods2 = 0b001,
    /// 4 tach periods (power-on default).
    Periods4 = 0b010,
    /// 8 tach periods.
    Periods8 = 0b011,
    /// 16 tach periods.
    Periods16 = 0b100,
    /// 32 tach periods. Raw codes `0b110` and `0b111` select the same setting.
    Periods32 = 0b101,
}

impl TachAveraging {
    /// Returns the canonical 3-bit register code.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Returns the number of tach periods counted.
    pub const fn periods(self) -> u8 {
        match self {
            Self::Periods1 => 1,
            Self::Periods2 => 2,
            Self::Periods4 => 4,
            Self::Periods8 => 8,
            Self::Periods16 => 16,
            Self::Periods32 => 32,
        }
    }
}

impl TryFrom<u8> for TachAveraging {
    type Error = InvalidCode;

    fn try_from(code: u8) -> core::result::Result<Self, Self::Error> {
        match code {
            0b000 => Ok(Self::Periods1),
            0b001 => Ok(Self::Periods2),
            0b010 => Ok(Self::Periods4),
            0b011 => Ok(Self::Periods8),
            0b100 => Ok(Self::Periods16),
            0b101..=0b111 => Ok(Self::Periods32),
            other => Err(InvalidCode(other)),
        }
    }
}

/// Time between duty-cycle increments while ramping, `FAN_DYNAMICS[4:2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 3]
pub enum DutyRampStep {
    /// Immediate change.
    Ms0 = 0b000,
    /// 1.953125 ms.
    Ms1_95 = 0b001,
    /// 3.90625 ms.
    Ms3_9 = 0b010,
    /// 7.8125 ms (power-on default).
    Ms7_8 = 0b011,
    /// 15.625 ms.
    Ms15_6 = 0b100,
    /// 31.25 ms.
    Ms31_3 = 0b101,
    /// 62.5 ms.
    Ms62_5 = 0b110,
    /// 125 ms.
    Ms125 = 0b111,
}

impl DutyRampStep {
    /// Returns the 3-bit register code.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Returns the step interval in microseconds.
    pub const fn micros(self) -> u32 {
        match self {
            Self::Ms0 => 0,
            Self::Ms1_95 => 1_953,
            Self::Ms3_9 => 3_906,
            Self::Ms7_8 => 7_812,
            Self::Ms15_6 => 15_625,
            Self::Ms31_3 => 31_250,
            Self::Ms62_5 => 62_500,
            Self::Ms125 => 125_000,
        }
    }
}

impl TryFrom<u8> for DutyRampStep {
    type Error = InvalidCode;

    fn try_from(code: u8) -> core::result::Result<Self, Self::Error> {
        match code {
            0b000 => Ok(Self::Ms0),
            0b001 => Ok(Self::Ms1_95),
            0b010 => Ok(Self::Ms3_9),
            0b011 => Ok(Self::Ms7_8),
            0b100 => Ok(Self::Ms15_6),
            0b101 => Ok(Self::Ms31_3),
            0b110 => Ok(Self::Ms62_5),
            0b111 => Ok(Self::Ms125),
            other => Err(InvalidCode(other)),
        }
    }
}

/// Delay between channel starts, `SEQUENTIAL_START[7:5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SequentialStartDelay {
    /// All channels start together.
    Ms0 = 0b000,
    /// 250 ms.
    Ms250 = 0b001,
    /// 500 ms.
    Ms500 = 0b010,
    /// 1 s.
    Ms1000 = 0b011,
    /// 2 s.
    Ms2000 = 0b100,
    /// 4 s. Raw codes `0b110` and `0b111` select the same setting.
    Ms4000 = 0b101,
}

impl SequentialStartDelay {
    /// Returns the canonical 3-bit register code.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Returns the delay in milliseconds.
    pub const fn millis(self) -> u16 {
        match self {
            Self::Ms0 => 0,
            Self::Ms250 => 250,
            Self::Ms500 => 500,
            Self::Ms1000 => 1_000,
            Self::Ms2000 => 2_000,
            Self::Ms4000 => 4_000,
        }
    }
}

impl TryFrom<u8> for SequentialStartDelay {
    type Error = InvalidCode;

    fn try_from(code: u8) -> core::result::Result<Self, Self::Error> {
        match code {
            0b000 => Ok(Self::Ms0),
            0b001 => Ok(Self::Ms250),
            0b010 => Ok(Self::Ms500),
            0b011 => Ok(Self::Ms1000),
            0b100 => Ok(Self::Ms2000),
            0b101..=0b111 => Ok(Self::Ms4000),
            other => Err(InvalidCode(other)),
        }
    }
}

/// Duty cycle applied when a fan fault is detected, `SEQUENTIAL_START[3:2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 2]
pub enum FailureDutyPolicy {
    /// Failed channel goes to 0 %.
    Zero = 0b00,
    /// Failed channel keeps its current duty cycle.
    Unchanged = 0b01,
    /// Failed channel goes to 100 %.
    Full = 0b10,
    /// Every channel goes to 100 %.
    AllFull = 0b11,
}

impl FailureDutyPolicy {
    /// Returns the 2-bit register code.
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for FailureDutyPolicy {
    type Error = InvalidCode;

    fn try_from(code: u8) -> core::result::Result<Self, Self::Error> {
        match code {
            0b00 => Ok(Self::Zero),
            0b01 => Ok(Self::Unchanged),
            0b10 => Ok(Self::Full),
            0b11 => Ok(Self::AllFull),
            other => Err(InvalidCode(other)),
        }
    }
}

/// Consecutive faults required before a channel is flagged, `SEQUENTIAL_START[1:0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 2]
pub enum FaultQueueDepth {
    /// 1 fault.
    One = 0b00,
    /// 2 faults.
    Two = 0b01,
    /// 4 faults.
    Four = 0b10,
    /// 6 faults.
    Six = 0b11,
}

impl FaultQueueDepth {
    /// Returns the 2-bit register code.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Returns the number of faults queued before reporting.
    pub const fn faults(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
            Self::Six => 6,
        }
    }
}

impl TryFrom<u8> for FaultQueueDepth {
    type Error = InvalidCode;

    fn try_from(code: u8) -> core::result::Result<Self, Self::Error> {
        match code {
            0b00 => Ok(Self::One),
            0b01 => Ok(Self::Two),
            0b10 => Ok(Self::Four),
            0b11 => Ok(Self::Six),
            other => Err(InvalidCode(other)),
        }
    }
}
