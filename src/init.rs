use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use super::{Error, OperatingMode, Sx8634};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitState {
  Validate,
  Reset,
  LoadSpm,
  Configure,
  SyncSpm,
  Enable,
}

impl<'a, I, E, D> Sx8634<'a, I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Reset the controller and push the staged [`crate::Config`].
  ///
  /// The configuration is validated before any bus traffic. A reset that
  /// times out is retried once; a second timeout, or any bus error, aborts
  /// initialization.
  pub async fn initialize(&mut self) -> Result<(), Error<E>> {
    let mut state = InitState::Validate;
    let mut reset_timeouts = 0;

    loop {
      debug!("SX8634: init step {}", state);

      match state {
        InitState::Validate => {
          self.config.validate()?;
          state = InitState::Reset;
        }

        InitState::Reset => match self.reset().await {
          Ok(()) => state = InitState::LoadSpm,
          Err(Error::Timeout) if reset_timeouts == 0 => {
            warn!("SX8634: reset timed out, retrying");
            reset_timeouts += 1;
          }
          Err(e) => {
            error!("SX8634: reset failed");
            return Err(e);
          }
        },

        InitState::LoadSpm => {
          self.load_spm().await?;
          state = InitState::Configure;
        }

        InitState::Configure => {
          let config = self.config;
          self.configure(&config)?;
          state = InitState::SyncSpm;
        }

        InitState::SyncSpm => {
          self.sync_spm().await?;
          state = InitState::Enable;
        }

        InitState::Enable => {
          self.set_operating_mode(OperatingMode::Active).await?;
          self.state.status = 0;
          info!("SX8634: initialized at {:#x}", self.address);
          return Ok(());
        }
      }
    }
  }
}
