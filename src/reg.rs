/******************************************************************************
 * Refer to SX8634 datasheet for more information, available here:            *
 * - https://www.semtech.com/products/smart-sensing                           *
 * ========================================================================== *
 *                        SX8634 - Registers & Memory Map                     *
*******************************************************************************/

/// Default 7-bit I²C address of the controller.
pub const DEFAULT_ADDR: u8 = 0x2B;

/// I²C register space of the controller.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reg {
  // Interrupt and sensor status (0x00..0x07)
  IrqSrc = 0x00,
  CapStatMsb = 0x01,
  CapStatLsb = 0x02,
  SldPosMsb = 0x03,
  SldPosLsb = 0x04,
  GpiStat = 0x07,

  // Operating mode and GPP control (0x09..0x0C)
  CompOpMode = 0x09,
  GppPinId = 0x0B,
  GppIntensity = 0x0C,

  // SPM access (0x0D..0x0E)
  SpmCfg = 0x0D,
  SpmBase = 0x0E,

  // Reset
  SoftReset = 0xB1,
}

impl From<Reg> for u8 {
  #[inline]
  fn from(r: Reg) -> Self {
    r as u8
  }
}

/// Register address of the 8 byte SPM window while the SPM interface is on.
pub(crate) const SPM_DATA: u8 = 0x00;

// SpmCfg bits
pub(crate) const SPM_CFG_WRITE: u8 = 0 << 3;
pub(crate) const SPM_CFG_READ: u8 = 1 << 3;
pub(crate) const SPM_CFG_OFF: u8 = 0 << 4;
pub(crate) const SPM_CFG_ON: u8 = 1 << 4;

// SoftReset sequence
pub(crate) const SOFT_RESET_SENTINEL: u8 = 0xDE;
pub(crate) const SOFT_RESET_RELEASE: u8 = 0x00;

// Bounded polling for hardware handshakes
pub(crate) const RESET_RETRIES: u32 = 10;
pub(crate) const RESET_INTERVAL_MS: u32 = 20;
pub(crate) const SPM_READY_RETRIES: u32 = 20;
pub(crate) const SPM_READY_INTERVAL_MS: u32 = 10;

/// Width of the reset pulse on the hardware reset line.
pub(crate) const RESET_PULSE_MS: u32 = 1;

/// Number of GPIO pins that can be driven as GPP (PWM) outputs.
pub const GPP_PINS: u8 = 8;
