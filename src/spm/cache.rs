use core::fmt;

use super::layout::{SPM_BLOCK_SIZE, SPM_NUM_BLOCKS, SPM_SIZE};

/// Local shadow of the controller's scratchpad memory.
///
/// Every byte is either the value last loaded from the device or a pending
/// local write. Writes mark their 8 byte block dirty; only dirty blocks are
/// written back by [`crate::Sx8634::sync_spm`].
#[derive(Clone, PartialEq, Eq)]
pub struct Spm {
  data: [u8; SPM_SIZE],
  dirty: u16,
}

impl Spm {
  pub const fn new() -> Self {
    Self { data: [0; SPM_SIZE], dirty: 0 }
  }

  /// Cached byte at `offset`, or `None` past the end of the SPM.
  pub fn read(&self, offset: usize) -> Option<u8> {
    self.data.get(offset).copied()
  }

  /// Update the cached byte at `offset` and mark its block dirty.
  ///
  /// Returns `false` (and changes nothing) past the end of the SPM.
  pub fn write(&mut self, offset: usize, value: u8) -> bool {
    match self.data.get_mut(offset) {
      Some(byte) => {
        *byte = value;
        self.dirty |= 1 << (offset / SPM_BLOCK_SIZE);
        true
      }
      None => false,
    }
  }

  /// Bitmap of dirty blocks, bit `n` for block `n`.
  pub const fn dirty(&self) -> u16 {
    self.dirty
  }

  pub const fn is_dirty(&self) -> bool {
    self.dirty != 0
  }

  pub fn block(&self, block: usize) -> [u8; SPM_BLOCK_SIZE] {
    let mut out = [0u8; SPM_BLOCK_SIZE];
    out.copy_from_slice(&self.data[block * SPM_BLOCK_SIZE..(block + 1) * SPM_BLOCK_SIZE]);
    out
  }

  pub fn as_bytes(&self) -> &[u8; SPM_SIZE] {
    &self.data
  }

  /// Clear and return the dirty bitmap.
  pub(crate) fn take_dirty(&mut self) -> u16 {
    core::mem::take(&mut self.dirty)
  }

  pub(crate) fn clear_dirty(&mut self, block: usize) {
    self.dirty &= !(1 << block);
  }

  /// Replace a block with data read from the device, without dirtying it.
  pub(crate) fn fill_block(&mut self, block: usize, data: &[u8; SPM_BLOCK_SIZE]) {
    self.data[block * SPM_BLOCK_SIZE..(block + 1) * SPM_BLOCK_SIZE].copy_from_slice(data);
  }

  /// Hex dump of the whole cache, see [`SpmDump`].
  pub fn dump(&self) -> SpmDump<'_> {
    SpmDump(self)
  }
}

impl Default for Spm {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for Spm {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Spm").field("dirty", &format_args!("{:#06x}", self.dirty)).finish_non_exhaustive()
  }
}

/// One line per block, eight lowercase hex bytes separated by single spaces,
/// each line terminated by `\n`.
pub struct SpmDump<'s>(&'s Spm);

impl fmt::Display for SpmDump<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for block in 0..SPM_NUM_BLOCKS {
      let bytes = self.0.block(block);
      for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
          f.write_str(" ")?;
        }
        write!(f, "{:02x}", byte)?;
      }
      f.write_str("\n")?;
    }
    Ok(())
  }
}
