//! Fail-safe aware delays.
//!
//! Waits are sliced into short polls so that both the cancellation token
//! and the pointer gesture are noticed while the workflow is idle, not
//! only when the next key is injected.

use std::time::Duration;

use tokio::time::Instant;

use crate::failsafe::{AbortSignal, UserAbort};

/// How often the pointer gesture is polled during a wait.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Paces workflow steps.
#[derive(Debug, Clone)]
pub struct StepTimer {
    simulate: bool,
    poll_interval: Duration,
}

impl StepTimer {
    /// With `simulate == false` waits return immediately after the abort
    /// check. Used for dry runs that should not take real time.
    pub fn new(simulate: bool) -> Self {
        Self {
            simulate,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    /// Sleep for `duration`, returning early with [`UserAbort`] if the
    /// fail-safe fires.
    pub async fn wait<S: AbortSignal>(&self, duration: Duration, signal: &S) -> Result<(), UserAbort> {
        signal.check_abort()?;
        if !self.simulate {
            return Ok(());
        }

        let deadline = Instant::now() + duration;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            let slice = (deadline - now).min(self.poll_interval);

            tokio::select! {
                _ = signal.cancellation().cancelled() => return Err(UserAbort),
                _ = tokio::time::sleep(slice) => {}
            }

            signal.check_abort()?;
        }
    }

    /// Count down `seconds`, calling `on_tick` with the remaining seconds
    /// before each one-second wait.
    pub async fn countdown<S: AbortSignal>(
        &self,
        seconds: u32,
        signal: &S,
        mut on_tick: impl FnMut(u32),
    ) -> Result<(), UserAbort> {
        for remaining in (1..=seconds).rev() {
            on_tick(remaining);
            self.wait(Duration::from_secs(1), signal).await?;
        }
        signal.check_abort()
    }
}

impl Default for StepTimer {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio_util::sync::CancellationToken;

    /// Signal whose gesture fires once `polls` checks have happened.
    struct Gesture {
        token: CancellationToken,
        fire_after: usize,
        polls: Cell<usize>,
    }

    impl Gesture {
        fn new(fire_after: usize) -> Self {
            Self {
                token: CancellationToken::new(),
                fire_after,
                polls: Cell::new(0),
            }
        }
    }

    impl AbortSignal for Gesture {
        fn check_abort(&self) -> Result<(), UserAbort> {
            self.polls.set(self.polls.get() + 1);
            if self.token.is_cancelled() || self.polls.get() > self.fire_after {
                self.token.cancel();
                return Err(UserAbort);
            }
            Ok(())
        }

        fn cancellation(&self) -> &CancellationToken {
            &self.token
        }
    }

    #[tokio::test(start_paused = true)]
    async fn wait_runs_full_duration() {
        let signal = Gesture::new(usize::MAX);
        let started = Instant::now();

        StepTimer::new(true)
            .wait(Duration::from_millis(500), &signal)
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(500));
        // One check up front plus one per poll slice.
        assert_eq!(signal.polls.get(), 1 + 10);
    }

    #[tokio::test(start_paused = true)]
    async fn gesture_interrupts_wait() {
        let signal = Gesture::new(3);
        let started = Instant::now();

        let result = StepTimer::new(true)
            .wait(Duration::from_secs(10), &signal)
            .await;

        assert_eq!(result, Err(UserAbort));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_interrupts_wait() {
        let signal = Gesture::new(usize::MAX);
        let token = signal.token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            token.cancel();
        });

        let result = StepTimer::new(true)
            .with_poll_interval(Duration::from_secs(5))
            .wait(Duration::from_secs(30), &signal)
            .await;

        assert_eq!(result, Err(UserAbort));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_reports_each_second() {
        let signal = Gesture::new(usize::MAX);
        let mut ticks = Vec::new();

        StepTimer::new(true)
            .countdown(3, &signal, |remaining| ticks.push(remaining))
            .await
            .unwrap();

        assert_eq!(ticks, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn unsimulated_wait_still_checks_abort() {
        let signal = Gesture::new(0);
        let result = StepTimer::new(false)
            .wait(Duration::from_secs(3600), &signal)
            .await;
        assert_eq!(result, Err(UserAbort));
    }
}
