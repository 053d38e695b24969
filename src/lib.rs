//! Monte Carlo driver for the Yasso soil carbon model.
//!
//! Re-exports [`yasso_core`]. With the `python` feature the crate also builds
//! the `_lib` extension module.

pub use yasso_core::*;

#[cfg(feature = "python")]
mod python;
