//! Register map definitions for the MAX31790 fan controller.
//!
//! Only command-direction registers (configuration and targets) are ever
//! read-modify-written by the driver. Status and readback registers (tach
//! count, duty readback, fault status) are updated autonomously by the chip and
//! are only exposed through whole-register reads.
#![allow(unused_parens)]

use modular_bitfield::prelude::*;

use crate::params::{DutyRampStep, FailureDutyPolicy, FaultQueueDepth, SpinUp};

/// Register address of `GLOBAL_CONFIGURATION`.
pub const REG_GLOBAL_CONFIG: u8 = 0x00;
/// Register address of `PWM_FREQUENCY`.
pub const REG_PWM_FREQUENCY: u8 = 0x01;
/// Register address of `FAN_FAULT_STATUS_1`.
pub const REG_FAULT_STATUS: u8 = 0x11;
/// Register address of `FAILED_FAN_SEQUENTIAL_START`.
pub const REG_SEQUENTIAL_START: u8 = 0x14;

/// Number of fan channels on the chip.
pub const MAX_CHANNELS: u8 = 6;

/// Largest duty-cycle value representable by the PWM register pairs.
pub const DUTY_CYCLE_MAX: u16 = 0x1FF;
/// Largest tach count representable by the tach register pairs.
pub const TACH_COUNT_MAX: u16 = 0x7FF;

/// Access permissions encoded for each register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterAccess {
    /// Read-only register, written only by the chip.
    ReadOnly,
    /// Read/write register.
    ReadWrite,
}

/// Minimal metadata exposed by every fixed-address register value type.
pub trait Register {
    /// Register address as documented in the datasheet.
    const ADDRESS: u8;
    /// Access permission classification.
    const ACCESS: RegisterAccess;
    /// Power-on reset value defined by the datasheet.
    const RESET_VALUE: u8;
}

/// A validated, 1-based fan channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel(u8);

impl Channel {
    /// Returns the channel if it lies within `1..=configured`.
    pub const fn new(number: u8, configured: u8) -> Option<Self> {
        if number >= 1 && number <= configured && number <= MAX_CHANNELS {
            Some(Self(number))
        } else {
            None
        }
    }

    /// 1-based channel number.
    pub const fn number(self) -> u8 {
        self.0
    }

    /// 0-based offset used for address arithmetic and the fault bitmap.
    pub const fn index(self) -> u8 {
        self.0 - 1
    }
}

/// Channel-indexed register families.
///
/// Single-byte families use a stride of one; MSB/LSB pair families use a
/// stride of two, with the LSB immediately after the MSB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelRegister {
    /// `FAN_CONFIG` (0x02-0x07).
    FanConfiguration,
    /// `FAN_DYNAMICS` (0x08-0x0D).
    FanDynamics,
    /// `TACH_COUNT` MSB/LSB (0x18-0x23).
    TachCount,
    /// `PWMOUT_DUTY_CYCLE` MSB/LSB (0x30-0x3B).
    PwmDutyCycle,
    /// `PWMOUT_TARGET_DUTY_CYCLE` MSB/LSB (0x40-0x4B).
    PwmTargetDutyCycle,
    /// `TACH_TARGET_COUNT` MSB/LSB (0x50-0x5B).
    TachTargetCount,
}

impl ChannelRegister {
    /// Address of the channel 1 register.
    pub const fn base(self) -> u8 {
        match self {
            Self::FanConfiguration => 0x02,
            Self::FanDynamics => 0x08,
            Self::TachCount => 0x18,
            Self::PwmDutyCycle => 0x30,
            Self::PwmTargetDutyCycle => 0x40,
            Self::TachTargetCount => 0x50,
        }
    }

    /// Distance in bytes between consecutive channels.
    pub const fn stride(self) -> u8 {
        match self {
            Self::FanConfiguration | Self::FanDynamics => 1,
            _ => 2,
        }
    }

    /// Access permission of the family.
    pub const fn access(self) -> RegisterAccess {
        match self {
            Self::TachCount | Self::PwmDutyCycle => RegisterAccess::ReadOnly,
            _ => RegisterAccess::ReadWrite,
        }
    }

    /// Register address for `channel`. For pair families this is the MSB.
    pub const fn address(self, channel: Channel) -> u8 {
        self.base() + channel.index() * self.stride()
    }
}

/// Location of a contiguous run of bits inside an 8-bit register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitField {
    /// Index of the most significant bit of the field.
    pub msb: u8,
    /// Number of bits in the field.
    pub width: u8,
}

impl BitField {
    const fn new(msb: u8, width: u8) -> Self {
        Self { msb, width }
    }
}

/// `GLOBAL_CONFIG[7]`: run (1) or standby (0).
pub const GLOBAL_RUN_BIT: u8 = 7;
/// `GLOBAL_CONFIG[6]`: soft reset.
pub const GLOBAL_RESET_BIT: u8 = 6;

/// `FAN_CONFIG[7]`: PWM mode (1) or RPM mode (0).
pub const FAN_MODE_BIT: u8 = 7;
/// `FAN_CONFIG[6:5]`: spin-up behaviour.
pub const FAN_SPIN_UP: BitField = BitField::new(6, 2);
/// `FAN_CONFIG[3]`: tach input enable.
pub const FAN_TACH_ENABLE_BIT: u8 = 3;

/// `FAN_DYNAMICS[7:5]`: tach periods counted.
pub const DYNAMICS_TACH_AVERAGING: BitField = BitField::new(7, 3);
/// `FAN_DYNAMICS[4:2]`: time between duty-cycle increments.
pub const DYNAMICS_RAMP_STEP: BitField = BitField::new(4, 3);
/// `FAN_DYNAMICS[1]`: asymmetric rate of change.
pub const DYNAMICS_ASYMMETRIC_BIT: u8 = 1;

/// `SEQUENTIAL_START[7:5]`: sequential start delay.
pub const SEQ_START_DELAY: BitField = BitField::new(7, 3);
/// `SEQUENTIAL_START[3:2]`: duty cycle on fan failure.
pub const SEQ_FAILURE_DUTY: BitField = BitField::new(3, 2);
/// `SEQUENTIAL_START[1:0]`: fault queue depth.
pub const SEQ_FAULT_QUEUE: BitField = BitField::new(1, 2);

/// Bitfield representation of the `GLOBAL_CONFIGURATION` register (address `0x00`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalConfiguration {
    // I2C watchdog fault flag (bit 0).
    pub i2c_watchdog_fault: bool,
    // I2C watchdog period (bits 2:1).
    pub i2c_watchdog: B2,
    // External oscillator selected (bit 3).
    pub external_oscillator: bool,
    #[skip]
    __: B1,
    // Bus timeout disabled (bit 5).
    pub bus_timeout_disabled: bool,
    // Soft reset in progress (bit 6).
    pub reset: bool,
    // Run mode (bit 7).
    pub run: bool,
}

impl From<u8> for GlobalConfiguration {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<GlobalConfiguration> for u8 {
    fn from(value: GlobalConfiguration) -> Self {
        value.into_bytes()[0]
    }
}

/// Bitfield representation of the `PWM_FREQUENCY` register (address `0x01`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmFrequencyBank {
    // Frequency code for channels 1-3 (bits 3:0).
    pub low_channels: B4,
    // Frequency code for channels 4-6 (bits 7:4).
    pub high_channels: B4,
}

impl From<u8> for PwmFrequencyBank {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<PwmFrequencyBank> for u8 {
    fn from(value: PwmFrequencyBank) -> Self {
        value.into_bytes()[0]
    }
}

/// Bitfield representation of a `FAN_CONFIG` register (addresses `0x02`-`0x07`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanConfiguration {
    // PWM output disabled (bit 0).
    pub pwm_disabled: bool,
    // Locked-rotor input polarity high (bit 1).
    pub locked_rotor_polarity_high: bool,
    // Locked-rotor input enabled (bit 2).
    pub locked_rotor_enable: bool,
    // Tach input enabled (bit 3).
    pub tach_input_enable: bool,
    // Monitor only, PWM output forced off (bit 4).
    pub monitor_only: bool,
    // Spin-up behaviour (bits 6:5).
    pub spin_up: SpinUp,
    // PWM control mode (bit 7).
    pub pwm_mode: bool,
}

impl From<u8> for FanConfiguration {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<FanConfiguration> for u8 {
    fn from(value: FanConfiguration) -> Self {
        value.into_bytes()[0]
    }
}

/// Bitfield representation of a `FAN_DYNAMICS` register (addresses `0x08`-`0x0D`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanDynamics {
    #[skip]
    __: B1,
    // Duty decreases ramp at half rate (bit 1).
    pub asymmetric_ramp: bool,
    // Time between duty-cycle increments (bits 4:2).
    pub ramp_step: DutyRampStep,
    // Tach periods counted code (bits 7:5).
    pub tach_averaging: B3,
}

impl From<u8> for FanDynamics {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<FanDynamics> for u8 {
    fn from(value: FanDynamics) -> Self {
        value.into_bytes()[0]
    }
}

/// Bitfield representation of the `FAILED_FAN_SEQUENTIAL_START` register (address `0x14`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequentialStart {
    // Fault queue depth (bits 1:0).
    pub fault_queue: FaultQueueDepth,
    // Failed fan duty policy (bits 3:2).
    pub failure_duty: FailureDutyPolicy,
    #[skip]
    __: B1,
    // Sequential start delay code (bits 7:5).
    pub start_delay: B3,
}

impl From<u8> for SequentialStart {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<SequentialStart> for u8 {
    fn from(value: SequentialStart) -> Self {
        value.into_bytes()[0]
    }
}

/// Bitfield representation of the `FAN_FAULT_STATUS_1` register (address `0x11`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultStatus {
    // One fault flag per channel (bits 5:0).
    pub channels: B6,
    #[skip]
    __: B2,
}

impl FaultStatus {
    /// Returns `true` when `channel` is flagged as faulted.
    pub fn is_faulted(self, channel: Channel) -> bool {
        self.channels() & (1 << channel.index()) != 0
    }

    /// Returns `true` when any channel is flagged.
    pub fn any(self) -> bool {
        self.channels() != 0
    }
}

impl From<u8> for FaultStatus {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<FaultStatus> for u8 {
    fn from(value: FaultStatus) -> Self {
        value.into_bytes()[0]
    }
}

impl Register for GlobalConfiguration {
    const ADDRESS: u8 = REG_GLOBAL_CONFIG;
    const ACCESS: RegisterAccess = RegisterAccess::ReadWrite;
    const RESET_VALUE: u8 = 0x20;
}

impl Register for PwmFrequencyBank {
    const ADDRESS: u8 = REG_PWM_FREQUENCY;
    const ACCESS: RegisterAccess = RegisterAccess::ReadWrite;
    const RESET_VALUE: u8 = 0x44;
}

impl Register for SequentialStart {
    const ADDRESS: u8 = REG_SEQUENTIAL_START;
    const ACCESS: RegisterAccess = RegisterAccess::ReadWrite;
    const RESET_VALUE: u8 = 0x45;
}

impl Register for FaultStatus {
    const ADDRESS: u8 = REG_FAULT_STATUS;
    const ACCESS: RegisterAccess = RegisterAccess::ReadOnly;
    const RESET_VALUE: u8 = 0x00;
}

/// Splits a 9-bit duty cycle into its MSB and LSB register values.
///
/// The MSB holds bits 8:1 and bit 0 lands in bit 7 of the LSB.
pub const fn split_duty_cycle(value: u16) -> (u8, u8) {
    let msb = ((value >> 1) & 0xFF) as u8;
    let lsb = ((value & 0b1) << 7) as u8;
    (msb, lsb)
}

/// Reassembles a duty cycle from its MSB and LSB register values.
pub const fn duty_cycle_from_pair(msb: u8, lsb: u8) -> u16 {
    ((msb as u16) << 1) | ((lsb >> 7) as u16)
}

/// Splits an 11-bit tach count into its MSB and LSB register values.
///
/// The MSB holds bits 10:3 and bits 2:0 land in bits 7:5 of the LSB.
pub const fn split_tach_count(count: u16) -> (u8, u8) {
    let msb = ((count >> 3) & 0xFF) as u8;
    let lsb = ((count & 0b111) << 5) as u8;
    (msb, lsb)
}

/// Reassembles a tach count from its MSB and LSB register values.
pub const fn tach_count_from_pair(msb: u8, lsb: u8) -> u16 {
    ((msb as u16) << 3) | ((lsb >> 5) as u16)
}
