//! High-level MAX31790 device driver implementation.

use crate::config::Config;
use crate::conversion::{duty_from_percent, percent_from_duty};
use crate::error::{Error, Result};
use crate::interface::i2c::I2cInterface;
use crate::interface::Max31790Interface;
use crate::log::{debug, trace, warning};
use crate::params::{
    decode,
    DutyRampStep,
    FailureDutyPolicy,
    FaultQueueDepth,
    PwmFrequency,
    SequentialStartDelay,
    SpinUp,
    TachAveraging,
};
use crate::registers::{
    duty_cycle_from_pair,
    split_duty_cycle,
    split_tach_count,
    tach_count_from_pair,
    BitField,
    Channel,
    ChannelRegister,
    FanConfiguration,
    FanDynamics,
    FaultStatus,
    GlobalConfiguration,
    PwmFrequencyBank,
    SequentialStart,
    DUTY_CYCLE_MAX,
    DYNAMICS_ASYMMETRIC_BIT,
    DYNAMICS_RAMP_STEP,
    DYNAMICS_TACH_AVERAGING,
    FAN_MODE_BIT,
    FAN_SPIN_UP,
    FAN_TACH_ENABLE_BIT,
    GLOBAL_RESET_BIT,
    GLOBAL_RUN_BIT,
    REG_FAULT_STATUS,
    REG_GLOBAL_CONFIG,
    REG_PWM_FREQUENCY,
    REG_SEQUENTIAL_START,
    SEQ_FAILURE_DUTY,
    SEQ_FAULT_QUEUE,
    SEQ_START_DELAY,
};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// Time the chip needs to reload its power-on defaults after a soft reset (milliseconds).
pub const RESET_SETTLE_DELAY_MS: u32 = 100;

/// High-level synchronous driver for the MAX31790 fan controller.
///
/// Every operation takes `&mut self`. Bit and field updates are
/// read-modify-write sequences on the bus, so callers sharing one device
/// between tasks must serialize access (for example behind a mutex).
pub struct Max31790<IFACE> {
    interface: IFACE,
    config: Config,
}

impl<IFACE> Max31790<IFACE> {
    // ==================================================================
    // == Driver Construction & Ownership ===============================
    // ==================================================================
    /// Creates a new driver instance from the provided bus interface.
    pub fn new(interface: IFACE, config: Config) -> Self {
        Self { interface, config }
    }

    /// Consumes the driver and returns the owned interface.
    pub fn release(self) -> (IFACE, Config) {
        (self.interface, self.config)
    }

    /// Provides mutable access to the underlying interface.
    pub fn interface_mut(&mut self) -> &mut IFACE {
        &mut self.interface
    }

    /// Returns a shared reference to the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl<I2C> Max31790<I2cInterface<I2C>>
where
    I2C: I2c,
{
    // ==================================================================
    // == I2C Convenience Constructors ==================================
    // ==================================================================
    /// Convenience constructor for I²C transports.
    pub fn new_i2c(i2c: I2C, address: u8, config: Config) -> Self {
        Self::new(I2cInterface::new(i2c, address), config)
    }

    /// Releases the driver, returning the I²C bus and configuration.
    pub fn release_i2c(self) -> (I2C, Config) {
        let (iface, config) = self.release();
        (iface.release(), config)
    }
}

impl<IFACE, CommE> Max31790<IFACE>
where
    IFACE: Max31790Interface<Error = CommE>,
{
    // ==================================================================
    // == Initialization & Global Configuration ==========================
    // ==================================================================
    /// Resets the chip and prepares channels `1..=channel_count`.
    ///
    /// After the reset settles, every channel gets its tach input enabled and
    /// the slower-on-decrease ramp. No duty cycle or tach target is written:
    /// command a safe target before calling [`set_run_mode`](Self::set_run_mode).
    ///
    /// The new channel count only takes effect once every step succeeded; on
    /// error the previous configuration is kept.
    pub fn initialize(&mut self, delay: &mut impl DelayNs, channel_count: u8) -> Result<(), CommE> {
        let config = Config {
            channel_count,
            ..self.config
        };
        config.validate().map_err(|_| Error::InvalidArgument)?;

        self.reset()?;
        delay.delay_ms(RESET_SETTLE_DELAY_MS);

        for number in 1..=channel_count {
            let channel = Channel::new(number, channel_count).ok_or(Error::InvalidArgument)?;
            let config_address = ChannelRegister::FanConfiguration.address(channel);
            let dynamics_address = ChannelRegister::FanDynamics.address(channel);
            self.interface.write_bit(config_address, FAN_TACH_ENABLE_BIT, true)?;
            self.interface.write_bit(dynamics_address, DYNAMICS_ASYMMETRIC_BIT, true)?;
            debug!("fan {=u8} initialized", number);
        }

        self.config = config;
        Ok(())
    }

    /// Sets the soft-reset bit.
    ///
    /// The chip reloads power-on defaults afterwards; wait
    /// [`RESET_SETTLE_DELAY_MS`] before issuing further commands.
    pub fn reset(&mut self) -> Result<(), CommE> {
        self.interface.write_bit(REG_GLOBAL_CONFIG, GLOBAL_RESET_BIT, true)
    }

    /// Switches between run (`true`) and standby (`false`).
    pub fn set_run_mode(&mut self, running: bool) -> Result<(), CommE> {
        self.interface.write_bit(REG_GLOBAL_CONFIG, GLOBAL_RUN_BIT, running)
    }

    /// Reads the `GLOBAL_CONFIGURATION` register.
    pub fn read_global_configuration(&mut self) -> Result<GlobalConfiguration, CommE> {
        Ok(GlobalConfiguration::from(self.interface.read_register(REG_GLOBAL_CONFIG)?))
    }

    /// Programs the PWM frequency of channels 4-6 (`high_channels`) and 1-3
    /// (`low_channels`) in a single write.
    pub fn set_pwm_frequency_bank(
        &mut self,
        high_channels: PwmFrequency,
        low_channels: PwmFrequency,
    ) -> Result<(), CommE> {
        let bank = PwmFrequencyBank::new()
            .with_high_channels(high_channels.bits())
            .with_low_channels(low_channels.bits());
        self.interface.write_register(REG_PWM_FREQUENCY, u8::from(bank))?;
        Ok(())
    }

    /// Returns the PWM frequencies as `(high_channels, low_channels)`.
    pub fn pwm_frequency_bank(&mut self) -> Result<(PwmFrequency, PwmFrequency), CommE> {
        let bank = PwmFrequencyBank::from(self.interface.read_register(REG_PWM_FREQUENCY)?);
        let high = decode::<PwmFrequency, CommE>(bank.high_channels())?;
        let low = decode::<PwmFrequency, CommE>(bank.low_channels())?;
        Ok((high, low))
    }

    /// Sets the delay between sequential channel starts.
    pub fn set_sequential_start_delay(&mut self, delay: SequentialStartDelay) -> Result<(), CommE> {
        self.write_field(REG_SEQUENTIAL_START, SEQ_START_DELAY, delay.bits())
    }

    /// Sets the duty cycle applied to failed channels.
    pub fn set_failure_duty_policy(&mut self, policy: FailureDutyPolicy) -> Result<(), CommE> {
        self.write_field(REG_SEQUENTIAL_START, SEQ_FAILURE_DUTY, policy.bits())
    }

    /// Sets how many consecutive faults are required before a channel is flagged.
    pub fn set_fault_queue_depth(&mut self, depth: FaultQueueDepth) -> Result<(), CommE> {
        self.write_field(REG_SEQUENTIAL_START, SEQ_FAULT_QUEUE, depth.bits())
    }

    /// Reads the `FAILED_FAN_SEQUENTIAL_START` register.
    pub fn read_sequential_start(&mut self) -> Result<SequentialStart, CommE> {
        Ok(SequentialStart::from(self.interface.read_register(REG_SEQUENTIAL_START)?))
    }

    // ==================================================================
    // == Per-Channel Configuration =====================================
    // ==================================================================
    /// Selects open-loop PWM duty control for `channel`.
    pub fn set_pwm_mode(&mut self, channel: u8) -> Result<(), CommE> {
        let address = self.address(ChannelRegister::FanConfiguration, channel)?;
        self.interface.write_bit(address, FAN_MODE_BIT, true)
    }

    /// Selects closed-loop tach target control for `channel`.
    pub fn set_rpm_mode(&mut self, channel: u8) -> Result<(), CommE> {
        let address = self.address(ChannelRegister::FanConfiguration, channel)?;
        self.interface.write_bit(address, FAN_MODE_BIT, false)
    }

    /// Selects the spin-up timeout for `channel`.
    pub fn set_spin_up_behavior(&mut self, channel: u8, spin_up: SpinUp) -> Result<(), CommE> {
        let address = self.address(ChannelRegister::FanConfiguration, channel)?;
        self.write_field(address, FAN_SPIN_UP, spin_up.bits())
    }

    /// Enables or disables the tach input of `channel`.
    pub fn set_tach_enabled(&mut self, channel: u8, enabled: bool) -> Result<(), CommE> {
        let address = self.address(ChannelRegister::FanConfiguration, channel)?;
        self.interface.write_bit(address, FAN_TACH_ENABLE_BIT, enabled)
    }

    /// Sets the number of tach periods counted per measurement on `channel`.
    pub fn set_tach_averaging_window(
        &mut self,
        channel: u8,
        window: TachAveraging,
    ) -> Result<(), CommE> {
        let address = self.address(ChannelRegister::FanDynamics, channel)?;
        self.write_field(address, DYNAMICS_TACH_AVERAGING, window.bits())
    }

    /// Sets the time between duty-cycle increments while `channel` ramps.
    pub fn set_duty_ramp_step(&mut self, channel: u8, step: DutyRampStep) -> Result<(), CommE> {
        let address = self.address(ChannelRegister::FanDynamics, channel)?;
        self.write_field(address, DYNAMICS_RAMP_STEP, step.bits())
    }

    /// When `asymmetric`, duty decreases on `channel` ramp at half the rate of increases.
    pub fn set_ramp_symmetry(&mut self, channel: u8, asymmetric: bool) -> Result<(), CommE> {
        let address = self.address(ChannelRegister::FanDynamics, channel)?;
        self.interface.write_bit(address, DYNAMICS_ASYMMETRIC_BIT, asymmetric)
    }

    /// Reads the `FAN_CONFIG` register of `channel`.
    pub fn read_fan_configuration(&mut self, channel: u8) -> Result<FanConfiguration, CommE> {
        let address = self.address(ChannelRegister::FanConfiguration, channel)?;
        Ok(FanConfiguration::from(self.interface.read_register(address)?))
    }

    /// Reads the `FAN_DYNAMICS` register of `channel`.
    pub fn read_fan_dynamics(&mut self, channel: u8) -> Result<FanDynamics, CommE> {
        let address = self.address(ChannelRegister::FanDynamics, channel)?;
        Ok(FanDynamics::from(self.interface.read_register(address)?))
    }

    /// Returns the spin-up behaviour programmed on `channel`.
    pub fn spin_up_behavior(&mut self, channel: u8) -> Result<SpinUp, CommE> {
        Ok(self.read_fan_configuration(channel)?.spin_up())
    }

    /// Returns the tach averaging window programmed on `channel`.
    pub fn tach_averaging_window(&mut self, channel: u8) -> Result<TachAveraging, CommE> {
        let dynamics = self.read_fan_dynamics(channel)?;
        decode(dynamics.tach_averaging())
    }

    // ==================================================================
    // == Duty Cycle ====================================================
    // ==================================================================
    /// Writes the raw duty target (`0..=511`) of `channel`.
    pub fn set_duty_cycle_target(&mut self, channel: u8, value: u16) -> Result<(), CommE> {
        if value > DUTY_CYCLE_MAX {
            return Err(Error::InvalidArgument);
        }

        let address = self.address(ChannelRegister::PwmTargetDutyCycle, channel)?;
        let (msb, lsb) = split_duty_cycle(value);
        self.write_pair(address, msb, lsb)
    }

    /// Writes the duty target of `channel` as a percentage (`0..=100`).
    ///
    /// Scaling truncates: 100 % is 511, 50 % is 255.
    pub fn set_duty_cycle_percent(&mut self, channel: u8, percent: u8) -> Result<(), CommE> {
        let value = duty_from_percent(percent).ok_or(Error::InvalidArgument)?;
        self.set_duty_cycle_target(channel, value)
    }

    /// Reads the duty cycle currently driven on `channel` (`0..=511`).
    pub fn read_duty_cycle_raw(&mut self, channel: u8) -> Result<u16, CommE> {
        let address = self.address(ChannelRegister::PwmDutyCycle, channel)?;
        let (msb, lsb) = self.read_pair(address)?;
        Ok(duty_cycle_from_pair(msb, lsb))
    }

    /// Reads the duty cycle currently driven on `channel` as a truncated percentage.
    pub fn read_duty_cycle_percent(&mut self, channel: u8) -> Result<u8, CommE> {
        let raw = self.read_duty_cycle_raw(channel)?;
        Ok(percent_from_duty(raw))
    }

    /// Reads back the raw duty target of `channel` (`0..=511`).
    pub fn read_duty_cycle_target(&mut self, channel: u8) -> Result<u16, CommE> {
        let address = self.address(ChannelRegister::PwmTargetDutyCycle, channel)?;
        let (msb, lsb) = self.read_pair(address)?;
        Ok(duty_cycle_from_pair(msb, lsb))
    }

    // ==================================================================
    // == Tach / RPM ====================================================
    // ==================================================================
    /// Programs the tach target of `channel` for RPM mode.
    ///
    /// Fails with [`Error::InvalidArgument`] for 0 RPM and for speeds whose
    /// tach count does not fit the register (below
    /// [`TachScale::min_rpm`](crate::conversion::TachScale::min_rpm)) or
    /// truncates to zero.
    pub fn set_rpm_target(&mut self, channel: u8, rpm: u32) -> Result<(), CommE> {
        let address = self.address(ChannelRegister::TachTargetCount, channel)?;
        let count = self
            .config
            .tach_scale()
            .count_for_rpm(rpm)
            .ok_or(Error::InvalidArgument)?;

        trace!("fan {=u8} rpm target {=u32} -> count {=u16}", channel, rpm, count);
        let (msb, lsb) = split_tach_count(count);
        self.write_pair(address, msb, lsb)
    }

    /// Reads the measured speed of `channel`.
    ///
    /// Reports 0 RPM when no tach pulses were counted and when the counter
    /// saturated (stalled fan).
    pub fn read_rpm(&mut self, channel: u8) -> Result<u32, CommE> {
        let count = self.read_tach_count(channel)?;
        let scale = self.config.tach_scale();
        let rpm = scale.measured_rpm(count);
        if rpm == 0 && count != 0 {
            warning!("fan {=u8} tach saturated at count {=u16}", channel, count);
        }
        Ok(rpm)
    }

    /// Reads the raw measured tach count of `channel`.
    pub fn read_tach_count(&mut self, channel: u8) -> Result<u16, CommE> {
        let address = self.address(ChannelRegister::TachCount, channel)?;
        let (msb, lsb) = self.read_pair(address)?;
        Ok(tach_count_from_pair(msb, lsb))
    }

    /// Reads the programmed tach target of `channel`, converted to RPM.
    pub fn read_rpm_target(&mut self, channel: u8) -> Result<u32, CommE> {
        let address = self.address(ChannelRegister::TachTargetCount, channel)?;
        let (msb, lsb) = self.read_pair(address)?;
        Ok(self.config.tach_scale().rpm_for_count(tach_count_from_pair(msb, lsb)))
    }

    // ==================================================================
    // == Faults & Shutdown =============================================
    // ==================================================================
    /// Reads the raw fan fault bitmap. Zero means no channel is faulted.
    pub fn read_fault_status(&mut self) -> Result<u8, CommE> {
        Ok(self.interface.read_register(REG_FAULT_STATUS)?)
    }

    /// Reads the fan fault bitmap as a typed view.
    pub fn read_fault_flags(&mut self) -> Result<FaultStatus, CommE> {
        Ok(FaultStatus::from(self.read_fault_status()?))
    }

    /// Forces every configured channel into PWM mode with a 0 duty target.
    pub fn stop_all_fans(&mut self) -> Result<(), CommE> {
        for number in 1..=self.config.channel_count {
            self.set_pwm_mode(number)?;
            self.set_duty_cycle_target(number, 0)?;
        }
        Ok(())
    }

    // ==================================================================
    // == Internal Helpers ==============================================
    // ==================================================================
    fn channel(&self, number: u8) -> Result<Channel, CommE> {
        Channel::new(number, self.config.channel_count).ok_or(Error::InvalidArgument)
    }

    fn address(&self, family: ChannelRegister, number: u8) -> Result<u8, CommE> {
        Ok(family.address(self.channel(number)?))
    }

    fn write_field(
        &mut self,
        register: u8,
        field: BitField,
        value: u8,
    ) -> Result<(), CommE> {
        self.interface.write_bit_field(register, field.msb, field.width, value)
    }

    // MSB first; a failed LSB write leaves the pair torn.
    fn write_pair(&mut self, msb_address: u8, msb: u8, lsb: u8) -> Result<(), CommE> {
        self.interface.write_register(msb_address, msb)?;
        self.interface.write_register(msb_address + 1, lsb)?;
        Ok(())
    }

    fn read_pair(&mut self, msb_address: u8) -> Result<(u8, u8), CommE> {
        let msb = self.interface.read_register(msb_address)?;
        let lsb = self.interface.read_register(msb_address + 1)?;
        Ok((msb, lsb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::i2c::DEFAULT_ADDRESS;
    use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
    use embedded_hal_mock::eh1::delay::{CheckedDelay, Transaction as DelayTransaction};
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    const ADDR: u8 = DEFAULT_ADDRESS;

    fn driver(expectations: &[I2cTransaction]) -> Max31790<I2cInterface<I2cMock>> {
        Max31790::new_i2c(I2cMock::new(expectations), ADDR, Config::default())
    }

    fn read(register: u8, value: u8) -> I2cTransaction {
        I2cTransaction::write_read(ADDR, vec![register], vec![value])
    }

    fn write(register: u8, value: u8) -> I2cTransaction {
        I2cTransaction::write(ADDR, vec![register, value])
    }

    fn finish(driver: Max31790<I2cInterface<I2cMock>>) {
        let (mut i2c, _) = driver.release_i2c();
        i2c.done();
    }

    #[test]
    fn initialize_resets_waits_and_prepares_each_channel() {
        let expectations = [
            read(0x00, 0x20),
            write(0x00, 0x60),
            read(0x02, 0x00),
            write(0x02, 0x08),
            read(0x08, 0x4C),
            write(0x08, 0x4E),
            read(0x03, 0x00),
            write(0x03, 0x08),
            read(0x09, 0x4C),
            write(0x09, 0x4E),
            read(0x04, 0x00),
            write(0x04, 0x08),
            read(0x0A, 0x4C),
            write(0x0A, 0x4E),
        ];
        let mut fan = driver(&expectations);
        let mut delay = CheckedDelay::new(&[DelayTransaction::delay_ms(RESET_SETTLE_DELAY_MS)]);

        fan.initialize(&mut delay, 3).unwrap();

        assert_eq!(fan.config().channel_count, 3);
        delay.done();
        finish(fan);
    }

    #[test]
    fn initialize_rejects_invalid_channel_count() {
        let mut fan = driver(&[]);
        let mut delay = CheckedDelay::new(&[]);

        assert_eq!(fan.initialize(&mut delay, 0), Err(Error::InvalidArgument));
        assert_eq!(fan.initialize(&mut delay, 7), Err(Error::InvalidArgument));
        assert_eq!(fan.config().channel_count, 6);
        delay.done();
        finish(fan);
    }

    #[test]
    fn initialize_keeps_previous_channel_count_when_reset_fails() {
        let nack = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);
        let expectations = [read(0x00, 0x20).with_error(nack)];
        let mut fan = driver(&expectations);
        let mut delay = CheckedDelay::new(&[]);

        assert_eq!(fan.initialize(&mut delay, 2), Err(Error::Bus(nack)));
        assert_eq!(fan.config().channel_count, 6);
        delay.done();
        finish(fan);
    }

    #[test]
    fn initialize_keeps_previous_channel_count_when_channel_setup_fails() {
        let nack = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data);
        let expectations = [
            read(0x00, 0x20),
            write(0x00, 0x60),
            read(0x02, 0x00),
            write(0x02, 0x08).with_error(nack),
        ];
        let mut fan = driver(&expectations);
        let mut delay = CheckedDelay::new(&[DelayTransaction::delay_ms(RESET_SETTLE_DELAY_MS)]);

        assert_eq!(fan.initialize(&mut delay, 2), Err(Error::Bus(nack)));
        assert_eq!(fan.config().channel_count, 6);
        delay.done();
        finish(fan);
    }

    #[test]
    fn initialize_can_widen_a_narrower_configuration() {
        let expectations = [
            read(0x00, 0x20),
            write(0x00, 0x60),
            read(0x02, 0x00),
            write(0x02, 0x08),
            read(0x08, 0x4C),
            write(0x08, 0x4E),
            read(0x03, 0x00),
            write(0x03, 0x08),
            read(0x09, 0x4C),
            write(0x09, 0x4E),
        ];
        let config = Config::new().channel_count(1).build();
        let mut fan = Max31790::new_i2c(I2cMock::new(&expectations), ADDR, config);
        let mut delay = CheckedDelay::new(&[DelayTransaction::delay_ms(RESET_SETTLE_DELAY_MS)]);

        fan.initialize(&mut delay, 2).unwrap();

        assert_eq!(fan.config().channel_count, 2);
        delay.done();
        finish(fan);
    }

    #[test]
    fn run_mode_toggles_bit_seven() {
        let expectations = [read(0x00, 0x20), write(0x00, 0xA0), read(0x00, 0xA0), write(0x00, 0x20)];
        let mut fan = driver(&expectations);

        fan.set_run_mode(true).unwrap();
        fan.set_run_mode(false).unwrap();
        finish(fan);
    }

    #[test]
    fn pwm_frequency_bank_writes_both_nibbles() {
        let expectations = [write(0x01, 0xB9), read(0x01, 0x4B)];
        let mut fan = driver(&expectations);

        fan.set_pwm_frequency_bank(PwmFrequency::F25kHz, PwmFrequency::F5kHz).unwrap();
        assert_eq!(
            fan.pwm_frequency_bank().unwrap(),
            (PwmFrequency::F125Hz, PwmFrequency::F25kHz)
        );
        finish(fan);
    }

    #[test]
    fn pwm_frequency_bank_reports_reserved_codes_as_invalid_argument() {
        let expectations = [read(0x01, 0x45)];
        let mut fan = driver(&expectations);

        assert_eq!(fan.pwm_frequency_bank(), Err(Error::InvalidArgument));
        finish(fan);
    }

    #[test]
    fn sequential_start_fields_are_read_modify_write() {
        let expectations = [
            read(0x14, 0x45),
            write(0x14, 0b1010_0101),
            read(0x14, 0b1010_0101),
            write(0x14, 0b1010_1101),
            read(0x14, 0b1010_1101),
            write(0x14, 0b1010_1111),
        ];
        let mut fan = driver(&expectations);

        fan.set_sequential_start_delay(SequentialStartDelay::Ms4000).unwrap();
        fan.set_failure_duty_policy(FailureDutyPolicy::AllFull).unwrap();
        fan.set_fault_queue_depth(FaultQueueDepth::Six).unwrap();
        finish(fan);
    }

    #[test]
    fn channel_configuration_bits() {
        let expectations = [
            read(0x03, 0x08),
            write(0x03, 0x88),
            read(0x03, 0x88),
            write(0x03, 0x08),
            read(0x03, 0x08),
            write(0x03, 0x68),
            read(0x03, 0x68),
            write(0x03, 0x60),
        ];
        let mut fan = driver(&expectations);

        fan.set_pwm_mode(2).unwrap();
        fan.set_rpm_mode(2).unwrap();
        fan.set_spin_up_behavior(2, SpinUp::TwoSeconds).unwrap();
        fan.set_tach_enabled(2, false).unwrap();
        finish(fan);
    }

    #[test]
    fn channel_dynamics_fields() {
        let expectations = [
            read(0x0D, 0x4C),
            write(0x0D, 0b1010_1100),
            read(0x0D, 0b1010_1100),
            write(0x0D, 0b1011_1100),
            read(0x0D, 0b1011_1100),
            write(0x0D, 0b1011_1110),
        ];
        let mut fan = driver(&expectations);

        fan.set_tach_averaging_window(6, TachAveraging::Periods32).unwrap();
        fan.set_duty_ramp_step(6, DutyRampStep::Ms125).unwrap();
        fan.set_ramp_symmetry(6, true).unwrap();
        finish(fan);
    }

    #[test]
    fn typed_readback_decodes_aliases() {
        let expectations = [read(0x02, 0b0100_1000), read(0x08, 0b1110_1100)];
        let mut fan = driver(&expectations);

        assert_eq!(fan.spin_up_behavior(1).unwrap(), SpinUp::OneSecond);
        assert_eq!(fan.tach_averaging_window(1).unwrap(), TachAveraging::Periods32);
        finish(fan);
    }

    #[test]
    fn duty_cycle_target_is_split_msb_first() {
        let expectations = [write(0x42, 0xFF), write(0x43, 0x80), write(0x40, 0x00), write(0x41, 0x00)];
        let mut fan = driver(&expectations);

        fan.set_duty_cycle_target(2, 511).unwrap();
        fan.set_duty_cycle_target(1, 0).unwrap();
        finish(fan);
    }

    #[test]
    fn duty_cycle_target_rejects_values_above_511() {
        let mut fan = driver(&[]);

        assert_eq!(fan.set_duty_cycle_target(1, 512), Err(Error::InvalidArgument));
        finish(fan);
    }

    #[test]
    fn duty_cycle_percent_truncates() {
        let expectations = [write(0x40, 127), write(0x41, 0x80), write(0x40, 0xFF), write(0x41, 0x80)];
        let mut fan = driver(&expectations);

        fan.set_duty_cycle_percent(1, 50).unwrap();
        fan.set_duty_cycle_percent(1, 100).unwrap();
        assert_eq!(fan.set_duty_cycle_percent(1, 101), Err(Error::InvalidArgument));
        finish(fan);
    }

    #[test]
    fn duty_cycle_percent_rejects_unconfigured_channels() {
        let mut fan = driver(&[]);

        assert_eq!(fan.set_duty_cycle_percent(0, 50), Err(Error::InvalidArgument));
        assert_eq!(fan.set_duty_cycle_percent(7, 50), Err(Error::InvalidArgument));
        finish(fan);
    }

    #[test]
    fn channels_beyond_initialized_count_are_rejected() {
        let expectations = [
            read(0x00, 0x20),
            write(0x00, 0x60),
            read(0x02, 0x00),
            write(0x02, 0x08),
            read(0x08, 0x4C),
            write(0x08, 0x4E),
        ];
        let mut fan = driver(&expectations);
        let mut delay = CheckedDelay::new(&[DelayTransaction::delay_ms(RESET_SETTLE_DELAY_MS)]);

        fan.initialize(&mut delay, 1).unwrap();
        assert_eq!(fan.set_duty_cycle_target(2, 100), Err(Error::InvalidArgument));
        assert_eq!(fan.read_rpm(2), Err(Error::InvalidArgument));
        delay.done();
        finish(fan);
    }

    #[test]
    fn duty_cycle_percent_readback_matches_double_truncation() {
        for percent in 0..=100u32 {
            let raw = (percent * 511 / 100) as u16;
            let (msb, lsb) = split_duty_cycle(raw);
            let expectations = [read(0x30, msb), read(0x31, lsb)];
            let mut fan = driver(&expectations);

            let expected = (raw as u32 * 100 / 511) as u8;
            assert_eq!(fan.read_duty_cycle_percent(1).unwrap(), expected);
            finish(fan);
        }
    }

    #[test]
    fn duty_cycle_readback_masks_unused_lsb_bits() {
        let expectations = [read(0x3A, 0x80), read(0x3B, 0xFF), read(0x4A, 0x12), read(0x4B, 0x00)];
        let mut fan = driver(&expectations);

        assert_eq!(fan.read_duty_cycle_raw(6).unwrap(), 257);
        assert_eq!(fan.read_duty_cycle_target(6).unwrap(), 36);
        finish(fan);
    }

    #[test]
    fn rpm_target_1200_writes_count_819() {
        let expectations = [write(0x50, 102), write(0x51, 96)];
        let mut fan = driver(&expectations);

        fan.set_rpm_target(1, 1200).unwrap();
        finish(fan);
    }

    #[test]
    fn rpm_target_rejects_zero_and_unencodable_speeds() {
        let mut fan = driver(&[]);

        assert_eq!(fan.set_rpm_target(1, 0), Err(Error::InvalidArgument));
        assert_eq!(fan.set_rpm_target(1, 480), Err(Error::InvalidArgument));
        assert_eq!(fan.set_rpm_target(1, 2_000_000), Err(Error::InvalidArgument));
        finish(fan);
    }

    #[test]
    fn read_rpm_scales_measured_count() {
        let (msb, lsb) = split_tach_count(819);
        let expectations = [read(0x1A, msb), read(0x1B, lsb | 0x1F)];
        let mut fan = driver(&expectations);

        assert_eq!(fan.read_rpm(2).unwrap(), 1200);
        finish(fan);
    }

    #[test]
    fn read_rpm_reports_zero_for_no_pulses_and_stall() {
        let expectations = [read(0x18, 0x00), read(0x19, 0x00), read(0x18, 0xFF), read(0x19, 0xE0)];
        let mut fan = driver(&expectations);

        assert_eq!(fan.read_rpm(1).unwrap(), 0);
        assert_eq!(fan.read_rpm(1).unwrap(), 0);
        finish(fan);
    }

    #[test]
    fn read_rpm_target_reads_both_target_registers() {
        let expectations = [read(0x56, 102), read(0x57, 96), read(0x50, 0), read(0x51, 0)];
        let mut fan = driver(&expectations);

        assert_eq!(fan.read_rpm_target(4).unwrap(), 1200);
        assert_eq!(fan.read_rpm_target(1).unwrap(), 0);
        finish(fan);
    }

    #[test]
    fn fault_status_is_read_whole() {
        let expectations = [read(0x11, 0b0000_0100), read(0x11, 0x00)];
        let mut fan = driver(&expectations);

        assert_eq!(fan.read_fault_status().unwrap(), 0b0000_0100);
        let flags = fan.read_fault_flags().unwrap();
        assert!(!flags.any());
        finish(fan);
    }

    #[test]
    fn stop_all_fans_covers_every_configured_channel() {
        let config = Config::new().channel_count(2).build();
        let expectations = [
            read(0x02, 0x08),
            write(0x02, 0x88),
            write(0x40, 0x00),
            write(0x41, 0x00),
            read(0x03, 0x08),
            write(0x03, 0x88),
            write(0x42, 0x00),
            write(0x43, 0x00),
        ];
        let mut fan = Max31790::new_i2c(I2cMock::new(&expectations), ADDR, config);

        fan.stop_all_fans().unwrap();
        finish(fan);
    }

    #[test]
    fn torn_pair_surfaces_bus_error() {
        let expectations = [
            write(0x40, 0x7F),
            I2cTransaction::write(ADDR, vec![0x41, 0x80]).with_error(ErrorKind::ArbitrationLoss),
        ];
        let mut fan = driver(&expectations);

        assert_eq!(
            fan.set_duty_cycle_target(1, 255),
            Err(Error::Bus(ErrorKind::ArbitrationLoss))
        );
        finish(fan);
    }
}
