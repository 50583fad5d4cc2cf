#[cfg(feature = "async-tokio")]
mod tokio_engine;

#[cfg(feature = "async-tokio")]
pub use tokio_engine::*;
