//! Cancellable handles returned by `CachingTileSource::request`.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

enum HandleState {
    /// Served from cache before `request` returned.
    Completed,
    /// A network fetch running on the runtime.
    Network {
        token: CancellationToken,
        task: JoinHandle<()>,
    },
}

/// Handle to a tile request.
///
/// Dropping the handle does not cancel the request; call [`cancel`](Self::cancel).
pub struct RequestHandle {
    state: HandleState,
}

impl RequestHandle {
    /// Handle for a request that already finished. Cancelling it does nothing.
    pub fn completed() -> Self {
        Self {
            state: HandleState::Completed,
        }
    }

    pub(crate) fn network(token: CancellationToken, task: JoinHandle<()>) -> Self {
        Self {
            state: HandleState::Network { token, task },
        }
    }

    /// Abort an in-flight network request.
    ///
    /// If the response has not arrived yet, no cache is touched and the
    /// callback receives a single `TransportError::Cancelled` response.
    pub fn cancel(&self) {
        if let HandleState::Network { token, .. } = &self.state {
            token.cancel();
        }
    }

    /// Whether `cancel` was called on a network request.
    pub fn is_cancelled(&self) -> bool {
        match &self.state {
            HandleState::Completed => false,
            HandleState::Network { token, .. } => token.is_cancelled(),
        }
    }

    /// Whether the request served from cache rather than the network.
    pub fn is_cache_hit(&self) -> bool {
        matches!(self.state, HandleState::Completed)
    }

    /// Whether the callback has run.
    pub fn is_finished(&self) -> bool {
        match &self.state {
            HandleState::Completed => true,
            HandleState::Network { task, .. } => task.is_finished(),
        }
    }

    /// Wait until the callback has run.
    pub async fn wait(self) {
        if let HandleState::Network { task, .. } = self.state {
            // A panicking callback is the caller's bug; the request is over either way
            let _ = task.await;
        }
    }
}

impl std::fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("cache_hit", &self.is_cache_hit())
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completed_handle_ignores_cancel() {
        let handle = RequestHandle::completed();
        handle.cancel();
        assert!(!handle.is_cancelled());
        assert!(handle.is_finished());
        assert!(handle.is_cache_hit());
        handle.wait().await;
    }

    #[tokio::test]
    async fn test_network_handle_cancel_sets_token() {
        let token = CancellationToken::new();
        let child = token.clone();
        let task = tokio::spawn(async move { child.cancelled().await });

        let handle = RequestHandle::network(token, task);
        assert!(!handle.is_cancelled());
        handle.cancel();
        assert!(handle.is_cancelled());
        handle.wait().await;
    }
}
