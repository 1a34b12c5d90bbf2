use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::executor::types::Task;

/// The collaborator that performs the work a task represents.
///
/// The scheduler never inspects the payload; it hands each task to the
/// runner exactly once. Returning `Err` (or panicking) marks the task failed
/// without affecting its siblings.
#[async_trait]
pub trait TaskRunner<P>: Send + Sync + 'static
where
    P: Send + Sync + 'static,
{
    type Output: Send + 'static;

    async fn run(&self, task: Arc<Task<P>>) -> anyhow::Result<Self::Output>;
}

/// Adapts an async closure into a [`TaskRunner`].
pub struct FnRunner<F, P> {
    f: F,
    _payload: PhantomData<fn(P)>,
}

impl<F, P> FnRunner<F, P> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, O, P> TaskRunner<P> for FnRunner<F, P>
where
    P: Send + Sync + 'static,
    F: Fn(Arc<Task<P>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
    O: Send + 'static,
{
    type Output = O;

    async fn run(&self, task: Arc<Task<P>>) -> anyhow::Result<O> {
        (self.f)(task).await
    }
}

/// Adapts a synchronous, possibly blocking closure into a [`TaskRunner`].
///
/// Each call runs on tokio's blocking pool, so a runner stuck in I/O does
/// not stall the async workers that enforce deadlines.
pub struct BlockingFnRunner<F, P> {
    f: Arc<F>,
    _payload: PhantomData<fn(P)>,
}

impl<F, P> BlockingFnRunner<F, P> {
    pub fn new(f: F) -> Self {
        Self {
            f: Arc::new(f),
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<F, O, P> TaskRunner<P> for BlockingFnRunner<F, P>
where
    P: Send + Sync + 'static,
    F: Fn(&Task<P>) -> anyhow::Result<O> + Send + Sync + 'static,
    O: Send + 'static,
{
    type Output = O;

    async fn run(&self, task: Arc<Task<P>>) -> anyhow::Result<O> {
        let f = Arc::clone(&self.f);
        match tokio::task::spawn_blocking(move || f(task.as_ref())).await {
            Ok(res) => res,
            Err(join_err) if join_err.is_panic() => {
                std::panic::resume_unwind(join_err.into_panic())
            }
            Err(join_err) => Err(anyhow::anyhow!("blocking runner cancelled: {join_err}")),
        }
    }
}
