//! Abstraction for spawning slot chains on a runtime.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

/// Abstraction for spawning task execution on a runtime.
pub trait Spawn {
    /// Spawn an async task that returns a future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Type-erased spawner held by a scheduler.
pub(crate) type SpawnFn = Arc<dyn Fn(BoxFuture<'static, ()>) + Send + Sync>;

/// Erase a concrete spawner so the scheduler does not carry it as a type parameter.
pub(crate) fn erase<S>(spawner: S) -> SpawnFn
where
    S: Spawn + Send + Sync + 'static,
{
    Arc::new(move |fut: BoxFuture<'static, ()>| spawner.spawn(fut))
}
