#![cfg_attr(not(test), no_std)]
//! `#![no_std]` driver for the MAX31790 6-channel PWM-output fan RPM controller.
//!
//! ```rust,ignore
//! use max31790::{Config, Max31790};
//!
//! let mut fans = Max31790::new_i2c(i2c, max31790::DEFAULT_ADDRESS, Config::default());
//! fans.initialize(&mut delay, 3)?;
//! fans.set_pwm_mode(1)?;
//! fans.set_duty_cycle_percent(1, 40)?;
//! fans.set_run_mode(true)?;
//! let rpm = fans.read_rpm(1)?;
//! ```

mod error;

pub mod config;
pub mod conversion;
pub mod device;
pub mod interface;
mod log;
pub mod params;
pub mod registers;

pub use crate::config::Config;
pub use crate::device::Max31790;
pub use crate::error::{Error, Result};
pub use crate::interface::i2c::DEFAULT_ADDRESS;
