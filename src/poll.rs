//! Fixed-interval polling for asynchronous platform jobs
//!
//! Exports are produced by an asynchronous pipeline on the platform side with no
//! completion notification, so the exporter checks the job status, sleeps a fixed
//! interval and checks again. The loop is unbounded by default; [`PollingConfig::max_polls`]
//! caps it.
//!
//! # Example
//!
//! ```no_run
//! use layer_export::config::PollingConfig;
//! use layer_export::poll::poll_until_ready;
//!
//! # async fn example() -> layer_export::Result<()> {
//! let config = PollingConfig::default();
//! let polled = poll_until_ready(
//!     &config,
//!     |attempt| async move {
//!         // Return Ok(None) while the job is still running
//!         Ok::<_, layer_export::Error>(if attempt >= 3 { Some("done") } else { None })
//!     },
//!     |attempt| println!("attempt {attempt} pending"),
//! )
//! .await?;
//! assert_eq!(polled.waits, 2);
//! # Ok(())
//! # }
//! ```

use crate::config::PollingConfig;
use crate::error::{Error, Result};
use std::future::Future;

/// Value produced by a successful poll, with the number of waits it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polled<T> {
    /// The ready value
    pub value: T,
    /// Number of interval sleeps performed before the value was ready
    pub waits: u32,
}

/// Run `probe` until it yields a value, sleeping `config.interval` between attempts
///
/// `probe` receives the 1-based attempt number and returns `Ok(None)` while the job is
/// still pending. Errors from `probe` end the loop immediately. `on_pending` is called
/// with the attempt number right before each sleep, so it runs exactly `waits` times.
/// When `config.max_polls` is set and that many attempts were pending, returns
/// [`Error::PollExhausted`] with an empty `export_id`; callers fill in context.
pub async fn poll_until_ready<F, Fut, T, P>(
    config: &PollingConfig,
    mut probe: F,
    mut on_pending: P,
) -> Result<Polled<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
    P: FnMut(u32),
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        if let Some(value) = probe(attempt).await? {
            if attempt > 1 {
                tracing::debug!(attempts = attempt, "job ready after polling");
            }
            return Ok(Polled {
                value,
                waits: attempt - 1,
            });
        }

        if config.max_polls.is_some_and(|max| attempt >= max) {
            tracing::warn!(attempts = attempt, "giving up, job still pending");
            return Err(Error::PollExhausted {
                export_id: String::new(),
                attempts: attempt,
            });
        }

        tracing::debug!(
            attempt = attempt,
            interval_ms = config.interval.as_millis(),
            "job pending, sleeping"
        );
        on_pending(attempt);
        tokio::time::sleep(config.interval).await;
    }
}
