use bitfield_struct::bitfield;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::reg::*;
use crate::{Error, InterruptSource, Sx8634};

/// Scan mode of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OperatingMode {
  /// Sensors are scanned at the active scan period.
  Active = 0b00,
  /// Sensors are scanned at the doze scan period until touched.
  Doze = 0b01,
  /// Scanning stopped.
  Sleep = 0b10,
}

impl OperatingMode {
  pub const fn into_bits(self) -> u8 {
    self as _
  }

  pub const fn from_bits(bits: u8) -> Self {
    match bits & 0b11 {
      0b00 => Self::Active,
      0b01 => Self::Doze,
      // 0b11 is reserved and behaves as sleep
      _ => Self::Sleep,
    }
  }
}

/// [`Reg::CompOpMode`] contents.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct CompOpMode {
  #[bits(2)]
  pub mode: OperatingMode,
  /// Writing `true` starts a compensation cycle.
  pub compensation: bool,
  #[bits(5)]
  __: u8,
}

impl<'a, I, E, D> Sx8634<'a, I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Issue the soft reset sequence and wait for the ready flag.
  ///
  /// Returns [`Error::Timeout`] if the device did not report ready within
  /// the poll budget; the caller decides whether that is fatal.
  pub async fn reset(&mut self) -> Result<(), Error<E>> {
    self.write_reg(Reg::SoftReset, SOFT_RESET_SENTINEL).await?;
    self.write_reg(Reg::SoftReset, SOFT_RESET_RELEASE).await?;
    self.wait_ready().await
  }

  /// Pulse the active-low hardware reset line, then wait for the ready flag.
  pub async fn hard_reset<P: OutputPin>(&mut self, reset: &mut P) -> Result<(), Error<E>> {
    reset.set_low().map_err(|_| Error::Pin)?;
    self.delay.delay_ms(RESET_PULSE_MS).await;
    reset.set_high().map_err(|_| Error::Pin)?;
    self.wait_ready().await
  }

  async fn wait_ready(&mut self) -> Result<(), Error<E>> {
    self.poll_irq_src(InterruptSource::new().with_ready(true), RESET_RETRIES, RESET_INTERVAL_MS).await
  }

  pub async fn operating_mode(&mut self) -> Result<OperatingMode, Error<E>> {
    Ok(self.comp_op_mode().await?.mode())
  }

  pub async fn set_operating_mode(&mut self, mode: OperatingMode) -> Result<(), Error<E>> {
    self.modify_comp_op_mode(|r| r.set_mode(mode)).await
  }

  /// Start a compensation cycle. Completion is signalled through
  /// [`crate::InterruptSource::compensation`].
  pub async fn trigger_compensation(&mut self) -> Result<(), Error<E>> {
    self.modify_comp_op_mode(|r| r.set_compensation(true)).await
  }

  async fn comp_op_mode(&mut self) -> Result<CompOpMode, Error<E>> {
    Ok(CompOpMode::from_bits(self.read_reg(Reg::CompOpMode).await?))
  }

  async fn modify_comp_op_mode<F: FnOnce(&mut CompOpMode)>(&mut self, f: F) -> Result<(), Error<E>> {
    let mut value = self.comp_op_mode().await?;
    f(&mut value);
    self.write_reg(Reg::CompOpMode, value.into_bits()).await
  }

  /// Set the PWM intensity of a GPP pin.
  pub async fn set_gpp_intensity(&mut self, pin: u8, intensity: u8) -> Result<(), Error<E>> {
    self.select_gpp(pin).await?;
    self.write_reg(Reg::GppIntensity, intensity).await
  }

  /// Read back the PWM intensity of a GPP pin.
  pub async fn gpp_intensity(&mut self, pin: u8) -> Result<u8, Error<E>> {
    self.select_gpp(pin).await?;
    self.read_reg(Reg::GppIntensity).await
  }

  async fn select_gpp(&mut self, pin: u8) -> Result<(), Error<E>> {
    if pin >= GPP_PINS {
      return Err(Error::OutOfRange);
    }
    self.write_reg(Reg::GppPinId, pin).await
  }
}
