#![doc = include_str!("../README.md")]

mod cancel;
mod engine;
mod error;
mod format;
mod policy;
mod random;
mod reservation;
#[cfg(feature = "async-tokio")]
mod runtime;
mod sequence;
mod store;
mod time;

pub use crate::cancel::*;
pub use crate::engine::*;
pub use crate::error::*;
pub use crate::format::*;
pub use crate::policy::*;
pub use crate::random::*;
pub use crate::reservation::*;
#[cfg(feature = "async-tokio")]
pub use crate::runtime::*;
pub use crate::sequence::*;
pub use crate::store::*;
pub use crate::time::*;
