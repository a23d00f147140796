use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::reg::*;
use crate::{Error, InterruptSource, Sx8634};

impl<'a, I, E, D> Sx8634<'a, I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Read a single register.
  ///
  /// Also used by sibling drivers sharing the chip. Bus errors are returned
  /// as-is; nothing is retried.
  pub async fn read_reg(&mut self, reg: Reg) -> Result<u8, Error<E>> {
    let mut b = [0u8; 1];
    self.read_bytes(reg.into(), &mut b).await?;
    Ok(b[0])
  }

  /// Write a single register.
  pub async fn write_reg(&mut self, reg: Reg, value: u8) -> Result<(), Error<E>> {
    self.write_bytes(reg.into(), &[value]).await
  }

  pub(crate) async fn read_bytes(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), Error<E>> {
    self.i2c.write_read(self.address, &[addr], buf).await.map_err(Error::I2c)
  }

  pub(crate) async fn write_bytes(&mut self, addr: u8, data: &[u8]) -> Result<(), Error<E>> {
    let len = data.len();
    if len > 8 {
      return Err(Error::OutOfRange);
    }
    let mut buf = [0u8; 9];
    buf[0] = addr;
    buf[1..=len].copy_from_slice(data);
    self.i2c.write(self.address, &buf[..=len]).await.map_err(Error::I2c)
  }

  /// Poll [`Reg::IrqSrc`] until one of the `wanted` flags is set.
  ///
  /// Sleeps `interval_ms` between reads and gives up with [`Error::Timeout`]
  /// after `retries` reads. Bus errors end the poll immediately. Any other
  /// flag seen on the way is kept for the next
  /// [`Sx8634::handle_interrupt`], since the read clears it on the device.
  pub(crate) async fn poll_irq_src(
    &mut self,
    wanted: InterruptSource,
    retries: u32,
    interval_ms: u32,
  ) -> Result<(), Error<E>> {
    let wanted = wanted.into_bits();
    for _ in 0..retries {
      let pending = self.read_reg(Reg::IrqSrc).await?;
      self.state.deferred |= pending & !wanted;
      if pending & wanted != 0 {
        return Ok(());
      }
      self.delay.delay_ms(interval_ms).await;
    }
    Err(Error::Timeout)
  }
}
