//! Polling of long-running operations.
//!
//! [`wait`] polls with exponential backoff until the poll function reports a
//! terminal outcome, the deadline passes or the token is cancelled.

use crate::error::ApiError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Error, Debug)]
pub enum WaitError {
    #[error("{reason}")]
    Failed { reason: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// What a single poll observed.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Done(T),
    Failed(String),
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub deadline: Duration,
    /// Treat 404 as "not yet visible" instead of a failure.
    pub not_found_is_pending: bool,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            deadline: Duration::from_secs(30 * 60),
            not_found_is_pending: false,
        }
    }
}

impl WaitConfig {
    /// For resources that may not be readable right after creation.
    pub fn tolerate_not_found(mut self) -> Self {
        self.not_found_is_pending = true;
        self
    }
}

pub async fn wait<T, F, Fut>(
    config: WaitConfig,
    cancel: &CancellationToken,
    mut poll: F,
) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollOutcome<T>, ApiError>>,
{
    let started = Instant::now();
    let mut backoff = config.initial_backoff;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WaitError::Cancelled),
            outcome = poll() => outcome,
        };

        match outcome {
            Ok(PollOutcome::Done(value)) => {
                debug!("operation finished after {} polls", attempt);
                return Ok(value);
            }
            Ok(PollOutcome::Failed(reason)) => return Err(WaitError::Failed { reason }),
            Ok(PollOutcome::Pending) => {}
            Err(e) if e.is_transient() => debug!("poll {} failed, retrying: {}", attempt, e),
            Err(e) if e.is_not_found() && config.not_found_is_pending => {
                debug!("resource not visible yet")
            }
            Err(e) => return Err(WaitError::Api(e)),
        }

        let elapsed = started.elapsed();
        if elapsed >= config.deadline {
            return Err(WaitError::DeadlineExceeded(config.deadline));
        }
        let pause = backoff.min(config.deadline - elapsed);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WaitError::Cancelled),
            _ = tokio::time::sleep(pause) => {}
        }
        backoff = (backoff * 2).min(config.max_backoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_case::test_case;

    fn status(code: u16) -> ApiError {
        ApiError::Status {
            status: code,
            reason: format!("HTTP {code}"),
            request_id: None,
        }
    }

    #[test_case(1 ; "first poll")]
    #[test_case(2 ; "second poll")]
    #[test_case(7 ; "seventh poll")]
    #[test_case(100 ; "hundredth poll")]
    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_exactly_k_polls(k: usize) {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = WaitConfig {
            deadline: Duration::from_secs(24 * 3600),
            ..WaitConfig::default()
        };
        let counter = calls.clone();
        let result = wait(config, &CancellationToken::new(), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                Ok(if n == k {
                    PollOutcome::Done(n)
                } else {
                    PollOutcome::Pending
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(result, k);
        assert_eq!(calls.load(Ordering::SeqCst), k);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_up_to_max() {
        let stamps = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorder = stamps.clone();
        let start = Instant::now();
        let _ = wait(
            WaitConfig {
                initial_backoff: Duration::from_secs(1),
                max_backoff: Duration::from_secs(4),
                deadline: Duration::from_secs(3600),
                not_found_is_pending: false,
            },
            &CancellationToken::new(),
            move || {
                let mut stamps = recorder.lock().unwrap();
                stamps.push(start.elapsed().as_secs());
                let done = stamps.len() == 6;
                async move {
                    Ok(if done {
                        PollOutcome::Done(())
                    } else {
                        PollOutcome::Pending
                    })
                }
            },
        )
        .await;

        assert_eq!(*stamps.lock().unwrap(), vec![0, 1, 3, 7, 11, 15]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded_within_one_backoff() {
        let config = WaitConfig {
            deadline: Duration::from_secs(100),
            ..WaitConfig::default()
        };
        let start = Instant::now();
        let err = wait(config, &CancellationToken::new(), || async {
            Ok(PollOutcome::<()>::Pending)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::DeadlineExceeded(_)));
        assert!(start.elapsed() <= config.deadline + config.max_backoff);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_returns_promptly() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(45)).await;
            trigger.cancel();
        });

        let config = WaitConfig::default();
        let start = Instant::now();
        let err = wait(config, &cancel, || async { Ok(PollOutcome::<()>::Pending) })
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(45) + config.max_backoff);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_carries_reason() {
        let err = wait(WaitConfig::default(), &CancellationToken::new(), || async {
            Ok(PollOutcome::<()>::Failed("InsufficientQuota".into()))
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "InsufficientQuota");
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result = wait(WaitConfig::default(), &CancellationToken::new(), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                match n {
                    0 => Err(status(503)),
                    1 => Err(status(500)),
                    _ => Ok(PollOutcome::Done("ok")),
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_only_tolerated_when_configured() {
        let err = wait(WaitConfig::default(), &CancellationToken::new(), || async {
            Err::<PollOutcome<()>, _>(status(404))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, WaitError::Api(ref e) if e.is_not_found()));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result = wait(
            WaitConfig::default().tolerate_not_found(),
            &CancellationToken::new(),
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(status(404))
                    } else {
                        Ok(PollOutcome::Done(n))
                    }
                }
            },
        )
        .await
        .unwrap();
        assert_eq!(result, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_errors_are_fatal() {
        let err = wait(WaitConfig::default(), &CancellationToken::new(), || async {
            Err::<PollOutcome<()>, _>(status(403))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, WaitError::Api(ref e) if e.status() == Some(403)));
    }
}
