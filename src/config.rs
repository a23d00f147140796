use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::spm::*;
use crate::{Error, Sx8634};

/// Number of capacitive sensing channels.
pub const CAP_CHANNELS: usize = 12;

/// Highest accepted sensitivity setting.
pub const MAX_SENSITIVITY: u8 = 7;

/// Linux input event codes used by board keymaps.
pub mod keys {
  pub const KEY_RESERVED: u16 = 0;
  pub const KEY_HELP: u16 = 138;
  pub const KEY_MENU: u16 = 139;
  pub const KEY_COFFEE: u16 = 152;
  pub const KEY_BRIGHTNESSDOWN: u16 = 224;
  pub const KEY_BRIGHTNESSUP: u16 = 225;
  pub const KEY_UNKNOWN: u16 = 240;
  pub const KEY_MAX: u16 = 0x2FF;
}

/// Channel configuration that cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
  /// Channel index is not below [`CAP_CHANNELS`].
  ChannelOutOfRange,
  /// Sensitivity above [`MAX_SENSITIVITY`].
  Sensitivity { channel: u8, value: u8 },
  /// The reserved mode encoding cannot be selected.
  ReservedMode { channel: u8 },
  /// Button without a usable keycode.
  Keycode { channel: u8, code: u16 },
}

impl<E> From<ConfigError> for Error<E> {
  fn from(e: ConfigError) -> Self {
    match e {
      ConfigError::ChannelOutOfRange => Error::OutOfRange,
      e => Error::InvalidConfig(e),
    }
  }
}

/// Function of a capacitive channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CapMode {
  Disabled = 0b00,
  Button = 0b01,
  Slider = 0b10,
  Reserved = 0b11,
}

impl CapMode {
  pub const fn into_bits(self) -> u8 {
    self as _
  }

  pub const fn from_bits(bits: u8) -> Self {
    match bits & 0b11 {
      0b00 => Self::Disabled,
      0b01 => Self::Button,
      0b10 => Self::Slider,
      _ => Self::Reserved,
    }
  }
}

/// Configuration of one capacitive channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel {
  pub mode: CapMode,
  /// Reported through [`crate::InputSink::report_key`] when the channel
  /// changes state.
  pub keycode: u16,
  /// Sensing sensitivity, 0 (lowest) to 7 (highest).
  pub sensitivity: u8,
  /// Touch detection threshold.
  pub threshold: u8,
}

impl Channel {
  pub const fn new(mode: CapMode, keycode: u16, sensitivity: u8, threshold: u8) -> Self {
    Self { mode, keycode, sensitivity, threshold }
  }

  pub const fn disabled() -> Self {
    Self::new(CapMode::Disabled, keys::KEY_RESERVED, 0, 0)
  }

  pub const fn button(keycode: u16) -> Self {
    Self::new(CapMode::Button, keycode, 0, 0)
  }

  pub const fn slider() -> Self {
    Self::new(CapMode::Slider, keys::KEY_RESERVED, 0, 0)
  }

  pub const fn with_sensitivity(mut self, sensitivity: u8) -> Self {
    self.sensitivity = sensitivity;
    self
  }

  pub const fn with_threshold(mut self, threshold: u8) -> Self {
    self.threshold = threshold;
    self
  }

  fn validate(&self, channel: usize) -> Result<(), ConfigError> {
    let index = channel as u8;
    if self.sensitivity > MAX_SENSITIVITY {
      return Err(ConfigError::Sensitivity { channel: index, value: self.sensitivity });
    }
    match self.mode {
      CapMode::Reserved => Err(ConfigError::ReservedMode { channel: index }),
      CapMode::Button if self.keycode == keys::KEY_RESERVED || self.keycode > keys::KEY_MAX => {
        Err(ConfigError::Keycode { channel: index, code: self.keycode })
      }
      _ => Ok(()),
    }
  }
}

impl Default for Channel {
  fn default() -> Self {
    Self::disabled()
  }
}

/// Channel setup pushed to the SPM during initialization.
///
/// # Example
/// ```no_run
/// use sx8634::{keys, Channel, Config};
///
/// let config = Config::default()
///   .with_channel(0, Channel::button(keys::KEY_MENU).with_sensitivity(7).with_threshold(0x45))?
///   .with_channel(4, Channel::slider())?;
/// # Ok::<(), sx8634::ConfigError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
  pub channels: [Channel; CAP_CHANNELS],
}

impl Config {
  pub const fn new(channels: [Channel; CAP_CHANNELS]) -> Self {
    Self { channels }
  }

  /// Buttons on the first `keymap.len()` channels, all sharing one
  /// sensitivity and threshold. Remaining channels are disabled.
  pub fn from_keymap(keymap: &[u16], sensitivity: u8, threshold: u8) -> Result<Self, ConfigError> {
    if keymap.len() > CAP_CHANNELS {
      return Err(ConfigError::ChannelOutOfRange);
    }
    let mut config = Self::default();
    for (channel, &code) in keymap.iter().enumerate() {
      config.channels[channel] = Channel::button(code).with_sensitivity(sensitivity).with_threshold(threshold);
    }
    config.validate()?;
    Ok(config)
  }

  pub fn with_channel(mut self, index: usize, channel: Channel) -> Result<Self, ConfigError> {
    *self.channels.get_mut(index).ok_or(ConfigError::ChannelOutOfRange)? = channel;
    Ok(self)
  }

  pub fn channel(&self, index: usize) -> Option<&Channel> {
    self.channels.get(index)
  }

  /// Keycode reported for status bit `bit`; unconfigured bits map to
  /// [`keys::KEY_RESERVED`].
  pub fn keycode(&self, bit: usize) -> u16 {
    self.channels.get(bit).map_or(keys::KEY_RESERVED, |c| c.keycode)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    self.channels.iter().enumerate().try_for_each(|(i, c)| c.validate(i))
  }
}

impl Default for Config {
  fn default() -> Self {
    Self::new([Channel::disabled(); CAP_CHANNELS])
  }
}

impl<'a, I, E, D> Sx8634<'a, I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Stage `config` in the SPM cache and make it the active keymap.
  ///
  /// The whole configuration is validated before the cache is touched.
  /// Nothing is sent to the device until [`Sx8634::sync_spm`].
  pub fn configure(&mut self, config: &Config) -> Result<(), Error<E>> {
    config.validate()?;
    for (channel, c) in config.channels.iter().enumerate() {
      self.set_mode(channel, c.mode)?;
      self.set_sensitivity(channel, c.sensitivity)?;
      self.set_threshold(channel, c.threshold)?;
    }
    self.config = *config;
    Ok(())
  }

  pub fn set_mode(&mut self, channel: usize, mode: CapMode) -> Result<(), Error<E>> {
    if mode == CapMode::Reserved {
      return Err(ConfigError::ReservedMode { channel: channel as u8 }.into());
    }
    let offset = cap_mode_offset(channel)?;
    let byte = pack_mode(channel, mode, self.spm_read(offset)?)?;
    self.spm_write(offset, byte)
  }

  pub fn mode(&self, channel: usize) -> Result<CapMode, Error<E>> {
    Ok(unpack_mode(channel, self.spm_read(cap_mode_offset(channel)?)?)?)
  }

  pub fn set_sensitivity(&mut self, channel: usize, sensitivity: u8) -> Result<(), Error<E>> {
    if sensitivity > MAX_SENSITIVITY {
      return Err(ConfigError::Sensitivity { channel: channel as u8, value: sensitivity }.into());
    }
    let offset = cap_sensitivity_offset(channel)?;
    let byte = pack_sensitivity(channel, sensitivity, self.spm_read(offset)?)?;
    self.spm_write(offset, byte)
  }

  pub fn sensitivity(&self, channel: usize) -> Result<u8, Error<E>> {
    Ok(unpack_sensitivity(channel, self.spm_read(cap_sensitivity_offset(channel)?)?)?)
  }

  pub fn set_threshold(&mut self, channel: usize, threshold: u8) -> Result<(), Error<E>> {
    self.spm_write(cap_threshold_offset(channel)?, threshold)
  }

  pub fn threshold(&self, channel: usize) -> Result<u8, Error<E>> {
    self.spm_read(cap_threshold_offset(channel)?)
  }
}
