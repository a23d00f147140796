//! Placement of the per-channel fields inside the SPM.
//!
//! Modes are packed 2 bits per channel over three bytes (channels 0..=3 in
//! the highest address), sensitivities 4 bits per channel over six bytes
//! (even channel in the high nibble), thresholds one byte per channel.

use crate::{CapMode, ConfigError, CAP_CHANNELS};

pub const SPM_BLOCK_SIZE: usize = 8;
pub const SPM_NUM_BLOCKS: usize = 16;
pub const SPM_SIZE: usize = SPM_BLOCK_SIZE * SPM_NUM_BLOCKS;

const CAP_MODE_MASK: u8 = 0b11;
const CAP_SENS_MASK: u8 = 0b1111;
const CAP_SENS_BASE: usize = 0x0D;
const CAP_THRESHOLD_BASE: usize = 0x13;

const fn check(channel: usize) -> Result<(), ConfigError> {
  if channel < CAP_CHANNELS {
    Ok(())
  } else {
    Err(ConfigError::ChannelOutOfRange)
  }
}

pub const fn cap_mode_offset(channel: usize) -> Result<usize, ConfigError> {
  match check(channel) {
    Ok(()) => Ok(match channel {
      0..=3 => 0x0C,
      4..=7 => 0x0B,
      _ => 0x0A,
    }),
    Err(e) => Err(e),
  }
}

const fn cap_mode_shift(channel: usize) -> u32 {
  ((channel & 3) * 2) as u32
}

pub const fn cap_sensitivity_offset(channel: usize) -> Result<usize, ConfigError> {
  match check(channel) {
    Ok(()) => Ok(CAP_SENS_BASE + channel / 2),
    Err(e) => Err(e),
  }
}

const fn cap_sensitivity_shift(channel: usize) -> u32 {
  if channel & 1 == 1 {
    0
  } else {
    4
  }
}

pub const fn cap_threshold_offset(channel: usize) -> Result<usize, ConfigError> {
  match check(channel) {
    Ok(()) => Ok(CAP_THRESHOLD_BASE + channel),
    Err(e) => Err(e),
  }
}

/// Merge `mode` for `channel` into the mode byte `existing`.
pub fn pack_mode(channel: usize, mode: CapMode, existing: u8) -> Result<u8, ConfigError> {
  check(channel)?;
  let shift = cap_mode_shift(channel);
  Ok((existing & !(CAP_MODE_MASK << shift)) | ((mode.into_bits() & CAP_MODE_MASK) << shift))
}

pub fn unpack_mode(channel: usize, byte: u8) -> Result<CapMode, ConfigError> {
  check(channel)?;
  Ok(CapMode::from_bits((byte >> cap_mode_shift(channel)) & CAP_MODE_MASK))
}

/// Merge `sensitivity` for `channel` into the sensitivity byte `existing`.
pub fn pack_sensitivity(channel: usize, sensitivity: u8, existing: u8) -> Result<u8, ConfigError> {
  check(channel)?;
  let shift = cap_sensitivity_shift(channel);
  Ok((existing & !(CAP_SENS_MASK << shift)) | ((sensitivity & CAP_SENS_MASK) << shift))
}

pub fn unpack_sensitivity(channel: usize, byte: u8) -> Result<u8, ConfigError> {
  check(channel)?;
  Ok((byte >> cap_sensitivity_shift(channel)) & CAP_SENS_MASK)
}
