use crate::{
    Allocation, Error, RandSource, ReapSummary, Result, Sequence, SequenceConfig,
    SequenceConfigPatch, SequenceEngine, Store, SweepReport, TimeSource,
};
use core::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Extension trait for driving a shared [`SequenceEngine`] from the
/// [`tokio`](https://docs.rs/tokio) runtime.
///
/// Engine operations block on the per-name lock and on store I/O, so each
/// method moves the call onto tokio's blocking pool with
/// [`spawn_blocking`](tokio::task::spawn_blocking) and awaits it there.
pub trait SequenceEngineAsyncTokioExt {
    /// Async [`SequenceEngine::init_sequence`].
    fn init_sequence_async(
        &self,
        name: String,
        patch: SequenceConfigPatch,
        begin: Option<i64>,
    ) -> impl Future<Output = Result<SequenceConfig>> + Send;

    /// Async [`SequenceEngine::next_with`].
    ///
    /// Cancel `token` when the caller goes away (e.g. a dropped request) and
    /// the allocation is abandoned before anything is written.
    fn next_async(
        &self,
        name: String,
        token: CancellationToken,
    ) -> impl Future<Output = Result<Allocation>> + Send;

    /// Async [`SequenceEngine::confirm`].
    fn confirm_async(
        &self,
        name: String,
        index: i64,
    ) -> impl Future<Output = Result<ReapSummary>> + Send;

    /// Async [`SequenceEngine::release`].
    fn release_async(
        &self,
        name: String,
        index: i64,
    ) -> impl Future<Output = Result<ReapSummary>> + Send;

    /// Async [`SequenceEngine::reap_all`].
    fn reap_all_async(&self) -> impl Future<Output = Result<SweepReport>> + Send;

    /// Async [`SequenceEngine::describe`].
    fn describe_async(&self, name: String) -> impl Future<Output = Result<Sequence>> + Send;
}

impl<S, T, R> SequenceEngineAsyncTokioExt for Arc<SequenceEngine<S, T, R>>
where
    S: Store + 'static,
    T: TimeSource + Send + Sync + 'static,
    R: RandSource + Send + Sync + 'static,
{
    fn init_sequence_async(
        &self,
        name: String,
        patch: SequenceConfigPatch,
        begin: Option<i64>,
    ) -> impl Future<Output = Result<SequenceConfig>> + Send {
        let engine = Arc::clone(self);
        blocking(name.clone(), move || {
            engine.init_sequence(&name, &patch, begin)
        })
    }

    fn next_async(
        &self,
        name: String,
        token: CancellationToken,
    ) -> impl Future<Output = Result<Allocation>> + Send {
        let engine = Arc::clone(self);
        blocking(name.clone(), move || engine.next_with(&name, &token))
    }

    fn confirm_async(
        &self,
        name: String,
        index: i64,
    ) -> impl Future<Output = Result<ReapSummary>> + Send {
        let engine = Arc::clone(self);
        blocking(name.clone(), move || engine.confirm(&name, index))
    }

    fn release_async(
        &self,
        name: String,
        index: i64,
    ) -> impl Future<Output = Result<ReapSummary>> + Send {
        let engine = Arc::clone(self);
        blocking(name.clone(), move || engine.release(&name, index))
    }

    fn reap_all_async(&self) -> impl Future<Output = Result<SweepReport>> + Send {
        let engine = Arc::clone(self);
        blocking(String::from("*"), move || engine.reap_all())
    }

    fn describe_async(&self, name: String) -> impl Future<Output = Result<Sequence>> + Send {
        let engine = Arc::clone(self);
        blocking(name.clone(), move || engine.describe(&name))
    }
}

/// Runs `op` on the blocking pool. A panic inside `op` is resumed on the
/// awaiting task; a task aborted by runtime shutdown reads as cancelled.
async fn blocking<F, O>(name: String, op: F) -> Result<O>
where
    F: FnOnce() -> Result<O> + Send + 'static,
    O: Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(_) => Err(Error::Cancelled { name }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use std::collections::HashSet;

    fn engine() -> Arc<SequenceEngine<MemoryStore>> {
        Arc::new(SequenceEngine::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn next_async_issues_in_order() {
        let engine = engine();
        engine
            .init_sequence_async("ord".into(), SequenceConfigPatch::default(), Some(1))
            .await
            .unwrap();

        for expected in ["ord1", "ord2", "ord3"] {
            let alloc = engine
                .next_async("ord".into(), CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(alloc.identifier, expected);
        }
        assert_eq!(engine.describe_async("ord".into()).await.unwrap().last, 3);
    }

    #[tokio::test]
    async fn cancelled_token_writes_nothing() {
        let engine = engine();
        engine
            .init_sequence_async("k".into(), SequenceConfigPatch::default(), None)
            .await
            .unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let err = engine.next_async("k".into(), token).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled { .. }));

        let seq = engine.describe_async("k".into()).await.unwrap();
        assert!(!seq.started);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_tasks_never_share_an_index() {
        let engine = engine();
        engine
            .init_sequence_async("c".into(), SequenceConfigPatch::default(), None)
            .await
            .unwrap();

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    engine
                        .next_async("c".into(), CancellationToken::new())
                        .await
                        .unwrap()
                        .index
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for task in tasks {
            assert!(seen.insert(task.await.unwrap()));
        }
        assert_eq!(seen.len(), 64);
        assert_eq!(engine.describe_async("c".into()).await.unwrap().last, 63);
    }

    #[tokio::test]
    async fn confirm_and_release_round_through_the_pool() {
        let engine = engine();
        let patch = SequenceConfigPatch {
            reclaim_keys: Some(true),
            require_confirm: Some(true),
            ..Default::default()
        };
        engine
            .init_sequence_async("r".into(), patch, Some(1))
            .await
            .unwrap();

        let first = engine
            .next_async("r".into(), CancellationToken::new())
            .await
            .unwrap();
        let second = engine
            .next_async("r".into(), CancellationToken::new())
            .await
            .unwrap();
        engine.confirm_async("r".into(), first.index).await.unwrap();
        engine.release_async("r".into(), second.index).await.unwrap();

        let again = engine
            .next_async("r".into(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(again.index, second.index);
        assert!(again.reissued);

        let report = engine.reap_all_async().await.unwrap();
        assert_eq!(report.scanned, 1);
        assert!(report.reaped.is_empty());
    }
}
