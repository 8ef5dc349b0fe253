//! Interception chains
//!
//! A [`Chain`] composes an ordered list of [`Interceptor`]s around a terminal
//! operation. The last registered interceptor is invoked first, and each one
//! wraps everything registered before it:
//!
//! ```text
//! registered: [A, B]      entry: B -> A -> terminal      exit: terminal -> A -> B
//! ```
//!
//! An interceptor receives the input and a [`Next`] continuation. Calling
//! [`Next::proceed`] runs the rest of the chain; not calling it short-circuits
//! both the remaining interceptors and the terminal.

use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Middleware unit for one chain kind
#[async_trait::async_trait]
pub trait Interceptor<I, O>: Send + Sync
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Handle the input, optionally delegating to `next`
    async fn intercept(&self, input: I, next: Next<'_, I, O>) -> O;
}

/// Innermost operation of a chain
pub type Terminal<I, O> = dyn Fn(I) -> BoxFuture<'static, O> + Send + Sync;

/// Continuation representing the rest of a chain
pub struct Next<'a, I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    interceptors: &'a [Arc<dyn Interceptor<I, O>>],
    terminal: &'a Terminal<I, O>,
}

impl<I, O> Next<'_, I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Run the remaining interceptors and the terminal
    pub async fn proceed(self, input: I) -> O {
        match self.interceptors.split_last() {
            Some((outer, rest)) => {
                let next = Next {
                    interceptors: rest,
                    terminal: self.terminal,
                };
                outer.intercept(input, next).await
            }
            None => (self.terminal)(input).await,
        }
    }
}

/// Interceptors folded around a terminal operation
pub struct Chain<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    interceptors: Arc<[Arc<dyn Interceptor<I, O>>]>,
    terminal: Arc<Terminal<I, O>>,
}

impl<I, O> Chain<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Fold interceptors (in registration order) around a terminal
    pub fn new<F>(interceptors: Vec<Arc<dyn Interceptor<I, O>>>, terminal: F) -> Self
    where
        F: Fn(I) -> BoxFuture<'static, O> + Send + Sync + 'static,
    {
        Self {
            interceptors: interceptors.into(),
            terminal: Arc::new(terminal),
        }
    }

    /// Invoke the composed operation
    pub async fn run(&self, input: I) -> O {
        Next {
            interceptors: &self.interceptors,
            terminal: &*self.terminal,
        }
        .proceed(input)
        .await
    }

    /// Number of registered interceptors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Whether the chain has no interceptors
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl<I, O> Clone for Chain<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            interceptors: Arc::clone(&self.interceptors),
            terminal: Arc::clone(&self.terminal),
        }
    }
}

impl<I, O> fmt::Debug for Chain<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}
