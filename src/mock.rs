//! Register level model of an SX8634 for driver tests.

use core::convert::Infallible;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation, SevenBitAddress};

use crate::reg::*;
use crate::{Config, InputSink, InterruptSource, Sx8634, SPM_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeError;

impl embedded_hal::i2c::Error for FakeError {
  fn kind(&self) -> ErrorKind {
    ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown)
  }
}

pub struct FakeSx8634 {
  pub regs: [u8; 256],
  pub spm: [u8; SPM_SIZE],
  pub gpp: [u8; GPP_PINS as usize],
  spm_cfg: u8,
  spm_base: u8,
  /// Base address of every SPM block written, in order.
  pub block_writes: Vec<u8>,
  /// Every value written to the soft reset register.
  pub reset_writes: Vec<u8>,
  reset_attempts: u32,
  pub ready_after_reset: bool,
  pub ready_on_reset_attempt: Option<u32>,
  /// Raise the SPM flag after each block write.
  pub ack_spm: bool,
  pub fail_read: Option<u8>,
  pub fail_write: Option<u8>,
  pub fail_spm_read: bool,
  pub transactions: u32,
  pub irq_src_reads: u32,
}

impl FakeSx8634 {
  pub fn new() -> Self {
    Self {
      regs: [0; 256],
      spm: [0; SPM_SIZE],
      gpp: [0; GPP_PINS as usize],
      spm_cfg: SPM_CFG_OFF,
      spm_base: 0,
      block_writes: Vec::new(),
      reset_writes: Vec::new(),
      reset_attempts: 0,
      ready_after_reset: true,
      ready_on_reset_attempt: None,
      ack_spm: true,
      fail_read: None,
      fail_write: None,
      fail_spm_read: false,
      transactions: 0,
      irq_src_reads: 0,
    }
  }

  fn spm_on(&self) -> bool {
    self.spm_cfg & SPM_CFG_ON != 0
  }

  fn spm_reading(&self) -> bool {
    self.spm_cfg & SPM_CFG_READ != 0
  }

  fn spm_window(&self, len: usize) -> core::ops::Range<usize> {
    let base = self.spm_base as usize;
    base..base + len
  }

  fn raise(&mut self, pending: InterruptSource) {
    self.regs[Reg::IrqSrc as usize] |= pending.into_bits();
  }

  fn store(&mut self, reg: u8, data: &[u8]) -> Result<(), FakeError> {
    if self.fail_write == Some(reg) {
      return Err(FakeError);
    }

    if self.spm_on() && reg == SPM_DATA {
      if self.spm_reading() {
        return Err(FakeError);
      }
      let window = self.spm_window(data.len());
      self.spm[window].copy_from_slice(data);
      self.block_writes.push(self.spm_base);
      return Ok(());
    }

    let value = data[0];
    match reg {
      r if r == Reg::SpmCfg as u8 => {
        let was_writing = self.spm_on() && !self.spm_reading();
        self.spm_cfg = value;
        if was_writing && !self.spm_on() && self.ack_spm {
          self.raise(InterruptSource::new().with_spm(true));
        }
      }
      r if r == Reg::SpmBase as u8 => self.spm_base = value,
      r if r == Reg::SoftReset as u8 => {
        if value == SOFT_RESET_RELEASE && self.reset_writes.last() == Some(&SOFT_RESET_SENTINEL) {
          self.reset_attempts += 1;
          if self.ready_after_reset || self.ready_on_reset_attempt == Some(self.reset_attempts) {
            self.raise(InterruptSource::new().with_ready(true));
          }
        }
        self.reset_writes.push(value);
      }
      r if r == Reg::GppIntensity as u8 => {
        let pin = self.regs[Reg::GppPinId as usize] as usize;
        self.gpp[pin] = value;
      }
      r => self.regs[r as usize] = value,
    }
    Ok(())
  }

  fn load(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), FakeError> {
    if self.spm_on() && reg == SPM_DATA {
      if self.fail_spm_read || !self.spm_reading() {
        return Err(FakeError);
      }
      let window = self.spm_window(buf.len());
      buf.copy_from_slice(&self.spm[window]);
      return Ok(());
    }

    if self.fail_read == Some(reg) {
      return Err(FakeError);
    }

    buf[0] = match reg {
      r if r == Reg::IrqSrc as u8 => {
        self.irq_src_reads += 1;
        core::mem::take(&mut self.regs[r as usize])
      }
      r if r == Reg::GppIntensity as u8 => self.gpp[self.regs[Reg::GppPinId as usize] as usize],
      r => self.regs[r as usize],
    };
    Ok(())
  }
}

impl ErrorType for FakeSx8634 {
  type Error = FakeError;
}

impl I2c<SevenBitAddress> for FakeSx8634 {
  async fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), FakeError> {
    if address != DEFAULT_ADDR {
      return Err(FakeError);
    }
    self.transactions += 1;

    let mut pointer = None;
    for op in operations.iter_mut() {
      match op {
        Operation::Write(bytes) => {
          let (&reg, data) = bytes.split_first().ok_or(FakeError)?;
          if !data.is_empty() {
            self.store(reg, data)?;
          }
          pointer = Some(reg);
        }
        Operation::Read(buf) => self.load(pointer.ok_or(FakeError)?, buf)?,
      }
    }
    Ok(())
  }
}

#[derive(Default)]
pub struct FakeIrq {
  pub falling_edges: u32,
}

impl PinErrorType for FakeIrq {
  type Error = Infallible;
}

impl Wait for FakeIrq {
  async fn wait_for_high(&mut self) -> Result<(), Infallible> {
    Ok(())
  }

  async fn wait_for_low(&mut self) -> Result<(), Infallible> {
    Ok(())
  }

  async fn wait_for_rising_edge(&mut self) -> Result<(), Infallible> {
    Ok(())
  }

  async fn wait_for_falling_edge(&mut self) -> Result<(), Infallible> {
    self.falling_edges += 1;
    Ok(())
  }

  async fn wait_for_any_edge(&mut self) -> Result<(), Infallible> {
    Ok(())
  }
}

/// Interrupt line that never fires.
pub struct IdleIrq;

impl PinErrorType for IdleIrq {
  type Error = Infallible;
}

impl Wait for IdleIrq {
  async fn wait_for_high(&mut self) -> Result<(), Infallible> {
    core::future::pending().await
  }

  async fn wait_for_low(&mut self) -> Result<(), Infallible> {
    core::future::pending().await
  }

  async fn wait_for_rising_edge(&mut self) -> Result<(), Infallible> {
    core::future::pending().await
  }

  async fn wait_for_falling_edge(&mut self) -> Result<(), Infallible> {
    core::future::pending().await
  }

  async fn wait_for_any_edge(&mut self) -> Result<(), Infallible> {
    core::future::pending().await
  }
}

/// Counts sleeps instead of sleeping.
#[derive(Default)]
pub struct FakeDelay {
  pub calls: u32,
}

impl DelayNs for FakeDelay {
  async fn delay_ns(&mut self, _ns: u32) {
    self.calls += 1;
  }

  async fn delay_us(&mut self, _us: u32) {
    self.calls += 1;
  }

  async fn delay_ms(&mut self, _ms: u32) {
    self.calls += 1;
  }
}

#[derive(Default)]
pub struct FakeResetLine {
  pub levels: Vec<bool>,
}

impl PinErrorType for FakeResetLine {
  type Error = Infallible;
}

impl OutputPin for FakeResetLine {
  fn set_low(&mut self) -> Result<(), Infallible> {
    self.levels.push(false);
    Ok(())
  }

  fn set_high(&mut self) -> Result<(), Infallible> {
    self.levels.push(true);
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
  Key(u16, bool),
  Sync,
}

#[derive(Default)]
pub struct RecordingInput {
  pub events: Vec<InputEvent>,
}

impl InputSink for RecordingInput {
  fn report_key(&mut self, keycode: u16, pressed: bool) {
    self.events.push(InputEvent::Key(keycode, pressed));
  }

  fn sync(&mut self) {
    self.events.push(InputEvent::Sync);
  }
}

pub fn device<'a>(fake: FakeSx8634) -> Sx8634<'a, FakeSx8634, FakeDelay> {
  device_with(fake, Config::default())
}

pub fn device_with<'a>(fake: FakeSx8634, config: Config) -> Sx8634<'a, FakeSx8634, FakeDelay> {
  Sx8634::new(fake, FakeDelay::default(), config)
}
