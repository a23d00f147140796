use bitfield_struct::bitfield;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::{Error, Reg, Spm, Sx8634};

/// Pending interrupt flags read from [`Reg::IrqSrc`]. Reading the register
/// clears it on the device.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct InterruptSource {
  /// Operating mode changed.
  pub operating_mode: bool,
  /// Compensation completed.
  pub compensation: bool,
  /// Button status changed.
  pub buttons: bool,
  /// Slider touched, moved, or released.
  pub slider: bool,
  /// GPI input changed.
  pub gpi: bool,
  /// SPM write completed.
  pub spm: bool,
  /// NVM burn completed.
  pub nvm: bool,
  /// Device ready after reset.
  pub ready: bool,
}

/// Consumer of the key events decoded from button interrupts.
pub trait InputSink {
  /// Record a press (`true`) or release of `keycode`.
  fn report_key(&mut self, keycode: u16, pressed: bool);

  /// Flush the keys reported since the last sync as one frame.
  fn sync(&mut self);
}

/// Device state kept by the driver between interrupts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
  pub(crate) spm: Spm,
  pub(crate) status: u16,
  pub(crate) slider: u16,
  pub(crate) gpi: u8,
  /// Flags consumed by a handshake poll, replayed by the next interrupt.
  pub(crate) deferred: u8,
}

impl State {
  pub(crate) const fn new() -> Self {
    Self { spm: Spm::new(), status: 0, slider: 0, gpi: 0, deferred: 0 }
  }

  /// Last capacitive status seen by the interrupt handler, bit `n` for
  /// channel `n`.
  pub const fn cap_status(&self) -> u16 {
    self.status
  }

  /// Last slider position read, 12 bits.
  pub const fn slider_position(&self) -> u16 {
    self.slider
  }

  /// Last GPI input levels read, bit `n` for pin `n`.
  pub const fn gpi_status(&self) -> u8 {
    self.gpi
  }

  pub const fn spm(&self) -> &Spm {
    &self.spm
  }
}

/// Status bits that differ between two capacitive status snapshots.
///
/// Yields `(channel, pressed)` in ascending channel order, with `pressed`
/// taken from the newer snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChanges {
  changed: u16,
  current: u16,
}

impl KeyChanges {
  pub const fn new(last: u16, current: u16) -> Self {
    Self { changed: last ^ current, current }
  }

  pub const fn is_empty(&self) -> bool {
    self.changed == 0
  }
}

impl Iterator for KeyChanges {
  type Item = (usize, bool);

  fn next(&mut self) -> Option<Self::Item> {
    if self.changed == 0 {
      return None;
    }
    let bit = self.changed.trailing_zeros() as usize;
    self.changed &= self.changed - 1;
    Some((bit, self.current & (1 << bit) != 0))
  }
}

impl<'a, I, E, D> Sx8634<'a, I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Wait for the next falling edge on `irq`, then handle it.
  ///
  /// Holds the driver for the whole wait. When the driver is shared behind a
  /// lock, await the edge outside the lock and call
  /// [`Sx8634::handle_interrupt`] instead.
  ///
  /// Returns the pending flags, or `None` if the interrupt could not be
  /// attributed to this device.
  pub async fn next_interrupt<IRQ: Wait, K: InputSink>(
    &mut self,
    irq: &mut IRQ,
    input: &mut K,
  ) -> Result<Option<InterruptSource>, Error<E>> {
    irq.wait_for_falling_edge().await.map_err(|_| Error::Pin)?;
    Ok(self.handle_interrupt(input).await)
  }

  /// Decode one interrupt and notify the input consumer and subscribers.
  ///
  /// Flags that a reset or SPM handshake read off [`Reg::IrqSrc`] in the
  /// meantime are merged into the fresh read. Bus errors never escape: a
  /// failed cycle is logged and dropped.
  pub async fn handle_interrupt<K: InputSink>(&mut self, input: &mut K) -> Option<InterruptSource> {
    let pending = match self.read_reg(Reg::IrqSrc).await {
      Ok(bits) => InterruptSource::from_bits(bits | core::mem::take(&mut self.state.deferred)),
      Err(_) => {
        warn!("SX8634: failed to read interrupt source");
        return None;
      }
    };

    if pending.operating_mode() {
      debug!("SX8634: operating mode changed");
    }
    if pending.compensation() {
      debug!("SX8634: compensation completed");
    }
    if pending.buttons() || pending.slider() {
      if self.update_cap_status(input).await.is_err() {
        warn!("SX8634: failed to read capacitive status");
      }
    }
    if pending.slider() {
      match self.read_slider_position().await {
        Ok(position) => debug!("SX8634: slider at {}", position),
        Err(_) => warn!("SX8634: failed to read slider position"),
      }
    }
    if pending.gpi() {
      match self.read_reg(Reg::GpiStat).await {
        Ok(levels) => {
          debug!("SX8634: GPI changed to {:#x}", levels);
          self.state.gpi = levels;
        }
        Err(_) => warn!("SX8634: failed to read GPI status"),
      }
    }
    if pending.spm() {
      debug!("SX8634: SPM write done");
    }
    if pending.nvm() {
      debug!("SX8634: NVM burn done");
    }
    if pending.ready() {
      debug!("SX8634: device ready");
    }

    self.notifier.notify(pending, &self.state);
    Some(pending)
  }

  /// Read the capacitive status and report one key event per changed
  /// channel, followed by a single sync.
  ///
  /// Both status registers are read before anything is reported or stored,
  /// so a bus error leaves the last known status untouched.
  async fn update_cap_status<K: InputSink>(&mut self, input: &mut K) -> Result<(), Error<E>> {
    let msb = self.read_reg(Reg::CapStatMsb).await?;
    let lsb = self.read_reg(Reg::CapStatLsb).await?;
    let status = u16::from_be_bytes([msb, lsb]);

    let changes = KeyChanges::new(self.state.status, status);
    let emitted = !changes.is_empty();
    for (channel, pressed) in changes {
      debug!("SX8634: channel {} {}", channel, if pressed { "pressed" } else { "released" });
      input.report_key(self.config.keycode(channel), pressed);
    }
    if emitted {
      input.sync();
    }

    self.state.status = status;
    Ok(())
  }

  /// Read the 12 bit slider position and cache it in [`State`].
  pub async fn read_slider_position(&mut self) -> Result<u16, Error<E>> {
    let msb = self.read_reg(Reg::SldPosMsb).await?;
    let lsb = self.read_reg(Reg::SldPosLsb).await?;
    let position = u16::from_be_bytes([msb, lsb]) & 0x0FFF;
    self.state.slider = position;
    Ok(position)
  }
}
