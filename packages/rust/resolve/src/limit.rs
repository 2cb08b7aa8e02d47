//! Concurrency cap for detail page fetches.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Caps how many futures run at once.
///
/// Cloning is cheap and every clone shares the same permit pool. A limit
/// of zero disables the cap entirely.
#[derive(Debug, Clone)]
pub struct Limiter {
    permits: Option<Arc<Semaphore>>,
}

impl Limiter {
    /// Create a limiter allowing `max` futures at once; zero means unlimited.
    pub fn new(max: u32) -> Self {
        let permits = (max > 0).then(|| Arc::new(Semaphore::new(max as usize)));
        Self { permits }
    }

    /// Run a future once a permit is free, releasing it when done.
    ///
    /// Waiters are served in the order they arrived.
    pub async fn run<F, T>(&self, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        match &self.permits {
            Some(sem) => {
                let _permit = sem.acquire().await.expect("semaphore closed");
                fut.await
            }
            None => fut.await,
        }
    }
}
