use ordinal::{SequenceEngine, Store, SystemClock, ThreadRandom};
use std::sync::Arc;

/// Store backend chosen at startup: in-memory, or a data directory.
pub type Backend = Arc<dyn Store>;

/// Engine shared by every request handler and the sweeper.
pub type Engine = SequenceEngine<Backend, SystemClock, ThreadRandom>;
