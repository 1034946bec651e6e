//! Condition polling with bounded exponential backoff.
//!
//! Replaces fixed sleeps: every wait names the observable state it is
//! waiting for and gives up after a fixed budget.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::config::PollConfig;
use crate::error::{HarnessError, Result};

/// Sleep schedule between polls: doubles from `initial` up to `max`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
	next: Duration,
	max: Duration,
}

impl Backoff {
	pub fn new(config: PollConfig) -> Self {
		Self {
			next: config.initial,
			max: config.max,
		}
	}

	/// Returns the next delay and advances the schedule.
	pub fn next_delay(&mut self) -> Duration {
		let current = self.next;
		self.next = (self.next * 2).min(self.max);
		current
	}
}

/// Polls `probe` until it yields `Some`, or fails with [`HarnessError::Timeout`].
///
/// Probe errors are treated as "not yet": a page mid-navigation routinely
/// rejects evaluations. The probe always runs at least once.
pub async fn poll_until<T, F, Fut>(condition: &str, timeout: Duration, poll: PollConfig, mut probe: F) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<Option<T>>>,
{
	let deadline = Instant::now() + timeout;
	let mut backoff = Backoff::new(poll);
	let mut attempts = 0u32;

	loop {
		attempts += 1;
		match probe().await {
			Ok(Some(value)) => return Ok(value),
			Ok(None) => {}
			Err(err) => trace!(target = "repos", condition, error = %err, "poll probe failed"),
		}

		let now = Instant::now();
		if now >= deadline {
			trace!(target = "repos", condition, attempts, "poll budget exhausted");
			return Err(HarnessError::Timeout {
				ms: timeout.as_millis() as u64,
				condition: condition.to_string(),
			});
		}
		let delay = backoff.next_delay().min(deadline - now);
		tokio::time::sleep(delay).await;
	}
}

/// Polls a boolean probe until it reports `true`.
pub async fn wait_for<F, Fut>(condition: &str, timeout: Duration, poll: PollConfig, mut probe: F) -> Result<()>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<bool>>,
{
	poll_until(condition, timeout, poll, || {
		let fut = probe();
		async move { fut.await.map(|ready| ready.then_some(())) }
	})
	.await
}
