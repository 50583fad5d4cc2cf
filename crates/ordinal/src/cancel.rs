use core::sync::atomic::{AtomicBool, Ordering};

/// Signals that the caller no longer wants the result of an operation.
///
/// The engine polls this after entering the critical section and again right
/// before writing the record. Once it reports `true` the operation aborts with
/// [`Error::Cancelled`](crate::Error::Cancelled) and nothing is persisted.
pub trait CancelSignal {
    fn is_cancelled(&self) -> bool;
}

/// A signal that never fires.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl CancelSignal for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

#[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
#[cfg(feature = "async-tokio")]
impl CancelSignal for tokio_util::sync::CancellationToken {
    fn is_cancelled(&self) -> bool {
        tokio_util::sync::CancellationToken::is_cancelled(self)
    }
}
