//! Logging shim: forwards to `defmt` when the `defmt` feature is enabled and
//! compiles to nothing otherwise.
#![allow(unused_macros)]

macro_rules! debug {
  ($s:literal $(, $x:expr)* $(,)?) => {{
    #[cfg(feature = "defmt")]
    ::defmt::debug!($s $(, $x)*);
    #[cfg(not(feature = "defmt"))]
    let _ = ($(&$x,)*);
  }};
}

macro_rules! info {
  ($s:literal $(, $x:expr)* $(,)?) => {{
    #[cfg(feature = "defmt")]
    ::defmt::info!($s $(, $x)*);
    #[cfg(not(feature = "defmt"))]
    let _ = ($(&$x,)*);
  }};
}

macro_rules! warn {
  ($s:literal $(, $x:expr)* $(,)?) => {{
    #[cfg(feature = "defmt")]
    ::defmt::warn!($s $(, $x)*);
    #[cfg(not(feature = "defmt"))]
    let _ = ($(&$x,)*);
  }};
}

macro_rules! error {
  ($s:literal $(, $x:expr)* $(,)?) => {{
    #[cfg(feature = "defmt")]
    ::defmt::error!($s $(, $x)*);
    #[cfg(not(feature = "defmt"))]
    let _ = ($(&$x,)*);
  }};
}
