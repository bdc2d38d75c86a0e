// Call-scoped context: actor, cancellation and deadline
use auth_rbac::Actor;
use error_common::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Travels with every store and wrapper call
///
/// Cloning is cheap. Derived contexts (`with_actor`, `with_timeout`) never
/// mutate the parent; a canceled parent cancels every context derived from it.
#[derive(Debug, Clone)]
pub struct Context {
    actor: Option<Arc<Actor>>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// Root context with no actor, no deadline
    pub fn background() -> Self {
        Self {
            actor: None,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_actor(&self, actor: Actor) -> Self {
        Self {
            actor: Some(Arc::new(actor)),
            cancel: self.cancel.clone(),
            deadline: self.deadline,
        }
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_deref()
    }

    /// Child context that expires after `timeout`, or at the parent's
    /// deadline if that comes first
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            actor: self.actor.clone(),
            cancel: self.cancel.child_token(),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    /// Child context that can be canceled on its own
    pub fn child(&self) -> Self {
        Self {
            actor: self.actor.clone(),
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast if the context is already done
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Canceled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` until it completes, the context is canceled, or the
    /// deadline passes
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Canceled),
            _ = expired => Err(Error::DeadlineExceeded),
            res = fut => res,
        }
    }
}
