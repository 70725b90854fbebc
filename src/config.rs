//! Configuration primitives for the MAX31790 driver.

use crate::conversion::TachScale;
use crate::registers::MAX_CHANNELS;

/// Chip-wide constants describing how the controller is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Number of consecutive channels in use, starting at channel 1.
    pub channel_count: u8,
    /// Tach pulses emitted per fan revolution (NP).
    pub pulses_per_revolution: u8,
    /// Tach periods counted per measurement window (SR).
    pub tach_periods: u8,
}

impl Config {
    /// Begins building a [`Config`] using the builder pattern.
    pub fn new() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Checks whether this configuration is valid.
    pub fn validate(&self) -> core::result::Result<(), ConfigError> {
        if self.channel_count == 0 || self.channel_count > MAX_CHANNELS {
            return Err(ConfigError::ChannelCount);
        }

        if self.pulses_per_revolution == 0 {
            return Err(ConfigError::PulsesPerRevolution);
        }

        if !matches!(self.tach_periods, 1 | 2 | 4 | 8 | 16 | 32) {
            return Err(ConfigError::TachPeriods);
        }

        Ok(())
    }

    /// RPM scaling for these constants.
    pub const fn tach_scale(&self) -> TachScale {
        TachScale::new(self.pulses_per_revolution, self.tach_periods)
    }
}

/// Builder for [`Config`] allowing piecemeal construction.
#[derive(Debug, Clone, Copy)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new builder seeded with [`Config::default()`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Overrides the number of channels in use.
    pub fn channel_count(mut self, channel_count: u8) -> Self {
        self.config.channel_count = channel_count;
        self
    }

    /// Overrides the tach pulses per revolution.
    pub fn pulses_per_revolution(mut self, pulses: u8) -> Self {
        self.config.pulses_per_revolution = pulses;
        self
    }

    /// Overrides the tach periods per measurement window.
    pub fn tach_periods(mut self, periods: u8) -> Self {
        self.config.tach_periods = periods;
        self
    }

    /// Finalizes the builder and returns the [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel_count: MAX_CHANNELS,
            pulses_per_revolution: 2,
            tach_periods: 4,
        }
    }
}

/// Validation errors generated while verifying a [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Channel count outside `1..=6`.
    ChannelCount,
    /// Pulses per revolution is zero.
    PulsesPerRevolution,
    /// Tach periods is not one of 1, 2, 4, 8, 16 or 32.
    TachPeriods,
}
