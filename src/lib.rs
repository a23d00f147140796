#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Async, `no_std` driver for the Semtech SX8634 capacitive button and slider
//! controller.
//!
//! The SX8634 senses up to twelve capacitive channels that can be configured
//! as discrete buttons or grouped into a slider. Its configuration lives in a
//! 128 byte scratchpad memory (SPM) that can only be accessed in 8 byte blocks.
//! This crate exposes a strongly typed API on top of the raw register map, with
//! helpers for:
//!
//! - Keeping a local shadow of the SPM with dirty block tracking, so channel
//!   configuration is written back in one batched pass
//! - Running the soft reset and SPM handshakes with bounded, sleep based polls
//! - Decoding interrupts into key press/release events for an input consumer
//! - Fanning interrupts out to additional subscribers (e.g. a backlight driver
//!   sharing the chip's GPP outputs)
//! - Using `embedded-hal` / `embedded-hal-async` 1.0 traits so the driver works
//!   across MCU families
//!
//! The interrupt line stays with the application. Wait for its falling edge
//! without holding the driver, then let [`Sx8634::handle_interrupt`] decode
//! it. A controller shared between tasks is locked only for the second step:
//!
//! ```no_run
//! use embedded_hal_async::{delay::DelayNs, digital::Wait, i2c::{I2c, SevenBitAddress}};
//! use futures::lock::Mutex;
//! use sx8634::{keys, Channel, Config, InputSink, Sx8634};
//!
//! async fn example<I2C, IRQ, D, E, K>(
//!   controller: &Mutex<Sx8634<'_, I2C, D>>,
//!   irq: &mut IRQ,
//!   input: &mut K,
//! ) -> Result<(), sx8634::Error<E>>
//! where
//!   I2C: I2c<SevenBitAddress, Error = E>,
//!   IRQ: Wait,
//!   D: DelayNs,
//!   K: InputSink,
//! {
//!   let config = Config::default()
//!     .with_channel(0, Channel::button(keys::KEY_MENU))?
//!     .with_channel(1, Channel::button(keys::KEY_HELP))?;
//!
//!   {
//!     let mut sx = controller.lock().await;
//!     sx.set_config(config);
//!     sx.initialize().await?;
//!   }
//!
//!   loop {
//!     irq.wait_for_falling_edge().await.map_err(|_| sx8634::Error::Pin)?;
//!     controller.lock().await.handle_interrupt(input).await;
//!   }
//! }
//! ```
#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

mod config;
mod control;
mod event;
mod init;
mod notify;
mod reg;
mod rw;
mod spm;

#[cfg(test)]
mod mock;

pub use config::*;
pub use control::*;
pub use event::*;
pub use init::InitState;
pub use notify::*;
pub use reg::{Reg, DEFAULT_ADDR, GPP_PINS};
pub use spm::*;

/// Errors that can occur while interacting with the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
  /// I²C bus transaction failed with the underlying driver error.
  I2c(E),
  /// A bounded poll ran out of retries waiting for a readiness flag.
  Timeout,
  /// SPM offset, channel, or GPP pin index outside the valid range.
  OutOfRange,
  /// Channel configuration rejected before touching the hardware.
  InvalidConfig(ConfigError),
  /// The interrupt or reset line reported an error.
  Pin,
  /// All subscriber slots are taken.
  SubscribersFull,
}

/// Driver for one SX8634 controller.
///
/// The driver owns the I²C peripheral and a delay provider. The interrupt
/// line is left to the caller so the edge can be awaited without holding the
/// driver. All register, cache and subscriber access goes through
/// `&mut self`, which serializes every multi-step register sequence for this
/// device. Create an instance with [`Sx8634::new`], then call
/// [`Sx8634::initialize`] to reset the chip and push the channel
/// configuration.
pub struct Sx8634<'a, I, D> {
  i2c: I,
  delay: D,
  address: u8,
  config: Config,
  state: State,
  notifier: Notifier<'a>,
}

impl<'a, I, E, D> Sx8634<'a, I, D>
where
  I: embedded_hal_async::i2c::I2c<embedded_hal_async::i2c::SevenBitAddress, Error = E>,
  D: embedded_hal_async::delay::DelayNs,
{
  /// Create a new driver instance at [`DEFAULT_ADDR`].
  ///
  /// Nothing is sent to the device until [`Sx8634::initialize`] is called.
  pub fn new(i2c: I, delay: D, config: Config) -> Self {
    Self::with_address(i2c, delay, DEFAULT_ADDR, config)
  }

  /// Create a new driver instance for a controller strapped to `address`.
  pub fn with_address(i2c: I, delay: D, address: u8, config: Config) -> Self {
    Self { i2c, delay, address, config, state: State::new(), notifier: Notifier::new() }
  }

  /// Tear the driver down and hand the peripherals back.
  pub fn release(self) -> (I, D) {
    (self.i2c, self.delay)
  }

  /// The channel configuration applied by [`Sx8634::initialize`].
  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Replace the staged channel configuration.
  ///
  /// Takes effect on the next [`Sx8634::initialize`], or immediately in the
  /// cache through [`Sx8634::configure`].
  pub fn set_config(&mut self, config: Config) {
    self.config = config;
  }

  /// Read-only view of the cached device state.
  pub fn state(&self) -> &State {
    &self.state
  }
}
