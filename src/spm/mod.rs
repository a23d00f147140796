use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::reg::*;
use crate::{Error, InterruptSource, Sx8634};

mod cache;
mod layout;

pub use cache::*;
pub use layout::*;

impl<'a, I, E, D> Sx8634<'a, I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Reload the whole SPM cache from the device.
  ///
  /// Pending local writes are discarded. The returned bitmap names the blocks
  /// that were still dirty; it is zero in the normal case. On error the cache
  /// content is undefined and should be reloaded before use.
  pub async fn load_spm(&mut self) -> Result<u16, Error<E>> {
    let discarded = self.state.spm.take_dirty();
    if discarded != 0 {
      warn!("SX8634: discarding uncommitted SPM blocks {:#x}", discarded);
    }

    for block in 0..SPM_NUM_BLOCKS {
      let mut data = [0u8; SPM_BLOCK_SIZE];
      self.read_spm_block(block, &mut data).await?;
      self.state.spm.fill_block(block, &data);
    }

    Ok(discarded)
  }

  /// Write every dirty block back to the device, lowest block first.
  ///
  /// A missing SPM ready acknowledgement after a block write is logged and
  /// ignored. Bus errors abort the remaining blocks; blocks already written
  /// stay clean.
  pub async fn sync_spm(&mut self) -> Result<(), Error<E>> {
    let dirty = self.state.spm.dirty();

    for block in (0..SPM_NUM_BLOCKS).filter(|b| dirty & (1 << b) != 0) {
      let data = self.state.spm.block(block);
      self.write_spm_block(block, &data).await?;
      self.state.spm.clear_dirty(block);

      match self.poll_irq_src(InterruptSource::new().with_spm(true), SPM_READY_RETRIES, SPM_READY_INTERVAL_MS).await {
        Ok(()) => {}
        Err(Error::Timeout) => warn!("SX8634: no SPM ready after writing block {}", block),
        Err(e) => return Err(e),
      }
    }

    Ok(())
  }

  /// Cached SPM byte at `offset`.
  pub fn spm_read(&self, offset: usize) -> Result<u8, Error<E>> {
    self.state.spm.read(offset).ok_or(Error::OutOfRange)
  }

  /// Stage an SPM byte in the cache. The device is updated by
  /// [`Sx8634::sync_spm`].
  pub fn spm_write(&mut self, offset: usize, value: u8) -> Result<(), Error<E>> {
    if self.state.spm.write(offset, value) {
      Ok(())
    } else {
      Err(Error::OutOfRange)
    }
  }

  /// Hex dump of the cached SPM, 16 lines of 8 bytes.
  pub fn dump_spm(&self) -> SpmDump<'_> {
    self.state.spm.dump()
  }

  async fn read_spm_block(&mut self, block: usize, data: &mut [u8; SPM_BLOCK_SIZE]) -> Result<(), Error<E>> {
    self.write_reg(Reg::SpmCfg, SPM_CFG_ON | SPM_CFG_READ).await?;
    self.write_reg(Reg::SpmBase, (block * SPM_BLOCK_SIZE) as u8).await?;
    self.read_bytes(SPM_DATA, data).await?;
    self.write_reg(Reg::SpmCfg, SPM_CFG_OFF).await
  }

  async fn write_spm_block(&mut self, block: usize, data: &[u8; SPM_BLOCK_SIZE]) -> Result<(), Error<E>> {
    self.write_reg(Reg::SpmCfg, SPM_CFG_ON | SPM_CFG_WRITE).await?;
    self.write_reg(Reg::SpmBase, (block * SPM_BLOCK_SIZE) as u8).await?;
    self.write_bytes(SPM_DATA, data).await?;
    self.write_reg(Reg::SpmCfg, SPM_CFG_OFF).await
  }
}
