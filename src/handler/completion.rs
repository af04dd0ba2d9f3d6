//! Single-fire completion for callback-style handlers.
//!
//! `proxy_router` hands the handler a [`Done`]; the HTTP side keeps the paired
//! [`Completion`] and waits on it with a deadline. `Done::done` consumes the
//! callback, so a handler can resolve a request at most once.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::handler::event::{HandlerError, InvocationResponse};

/// Why an invocation produced no usable response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvocationError {
    #[error("{0}")]
    Handler(#[from] HandlerError),

    #[error("handler finished without calling done")]
    Dropped,

    #[error("handler did not call done within {0:?}")]
    TimedOut(Duration),
}

/// Callback passed to a handler invocation.
#[derive(Debug)]
pub struct Done {
    tx: oneshot::Sender<Result<InvocationResponse, HandlerError>>,
}

impl Done {
    /// Create a callback and the completion that observes it.
    pub fn channel() -> (Done, Completion) {
        let (tx, rx) = oneshot::channel();
        (Done { tx }, Completion { rx })
    }

    /// Resolve the invocation with an error or a result.
    pub fn done(self, result: Result<InvocationResponse, HandlerError>) {
        if self.tx.send(result).is_err() {
            tracing::debug!("Invocation already abandoned by the caller");
        }
    }

    pub fn succeed(self, response: InvocationResponse) {
        self.done(Ok(response));
    }

    pub fn fail(self, message: impl Into<String>) {
        self.done(Err(HandlerError::new(message)));
    }
}

/// Receiving side of a [`Done`] callback.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Result<InvocationResponse, HandlerError>>,
}

impl Completion {
    /// Wait for the handler to call back, at most `timeout`.
    pub async fn wait(self, timeout: Duration) -> Result<InvocationResponse, InvocationError> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(result)) => result.map_err(InvocationError::Handler),
            Ok(Err(_)) => Err(InvocationError::Dropped),
            Err(_) => Err(InvocationError::TimedOut(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_synchronous_completion() {
        let (done, completion) = Done::channel();
        done.succeed(InvocationResponse {
            status_code: Some(202),
            ..Default::default()
        });

        let response = completion.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(response.status_code(), 202);
    }

    #[tokio::test]
    async fn test_deferred_completion() {
        let (done, completion) = Done::channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            done.fail("later");
        });

        let err = completion.wait(Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err, InvocationError::Handler(HandlerError::new("later")));
    }

    #[tokio::test]
    async fn test_dropped_callback() {
        let (done, completion) = Done::channel();
        drop(done);

        let err = completion.wait(Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err, InvocationError::Dropped);
    }

    #[tokio::test]
    async fn test_timeout() {
        let (done, completion) = Done::channel();
        let err = completion.wait(Duration::from_millis(10)).await.unwrap_err();
        assert_eq!(err, InvocationError::TimedOut(Duration::from_millis(10)));
        drop(done);
    }
}
