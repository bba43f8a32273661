//! Poll-until-converged waiter
//!
//! Cloud resources report a lifecycle status that moves on its own time: a
//! server is not running the moment the create call returns, and a deleted
//! balancer lingers while it drains. Callers hand this module a query
//! closure bound to one resource and get back a single [`PollOutcome`]. The
//! waiter queries at a fixed cadence until the state matches, fails,
//! disappears, or the time budget runs out. It never blocks past
//! [`PollPolicy::max_wait`].

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Timing configuration for a single wait.
///
/// All fields are durations; a `max_wait` of zero means "check once, right
/// now" and performs no sleeping at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Time to wait before the first query
    pub initial_delay: Duration,

    /// Time between queries
    pub interval: Duration,

    /// Total time budget for the wait
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(300),
        }
    }
}

impl PollPolicy {
    /// Create a policy with the default cadence
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay before the first query
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the time between queries
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the total time budget
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Reject policies that cannot terminate.
    ///
    /// A zero interval with a non-zero budget would spin against the
    /// provider API; that is a programming error, not a wait outcome.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() && !self.max_wait.is_zero() {
            return Err(Error::invalid_policy(
                "interval must be non-zero when max_wait is non-zero",
            ));
        }
        Ok(())
    }
}

/// Terminal result of one wait invocation.
///
/// Exactly one outcome is produced per invocation. Timeout and failure are
/// ordinary outcomes, not errors; only programming mistakes (an invalid
/// policy) and cancellation surface as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<S> {
    /// The resource reached a success state
    Success(S),
    /// The resource reached a failure state
    Failed(S),
    /// The resource was not found
    NotFound,
    /// The budget elapsed before any terminal state was observed
    TimedOut,
}

impl<S> PollOutcome<S> {
    /// Whether the wait ended in a success state
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Success(_))
    }

    /// Whether the budget elapsed
    pub fn is_timed_out(&self) -> bool {
        matches!(self, PollOutcome::TimedOut)
    }

    /// The final observed state, if the outcome carries one
    pub fn state(&self) -> Option<&S> {
        match self {
            PollOutcome::Success(state) | PollOutcome::Failed(state) => Some(state),
            _ => None,
        }
    }
}

impl<S: std::fmt::Display> std::fmt::Display for PollOutcome<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollOutcome::Success(state) => write!(f, "success ({})", state),
            PollOutcome::Failed(state) => write!(f, "failed ({})", state),
            PollOutcome::NotFound => write!(f, "not found"),
            PollOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Poll `query` until a terminal condition is met or the budget elapses.
///
/// `query` reports the resource's current state: `Ok(Some(state))` when
/// observed, `Ok(None)` when the resource does not exist, `Err(_)` for a
/// transport problem. Transport errors are transient by contract - they are
/// logged and retried within the remaining budget; callers needing harder
/// semantics wrap their query accordingly.
///
/// A missing resource terminates the wait with [`PollOutcome::NotFound`].
/// Delete-and-wait flows, where absence is the goal, should go through
/// [`Waiter::treat_missing_as`] instead.
///
/// Each tick evaluates `is_failure` before `is_match`, then the elapsed
/// budget. Cancellation is checked between ticks and returns
/// [`Error::Cancelled`].
pub async fn poll_until<S, Q, Fut, E>(
    policy: &PollPolicy,
    cancel: Option<&CancellationToken>,
    mut query: Q,
    is_match: impl Fn(&S) -> bool,
    is_failure: impl Fn(&S) -> bool,
) -> Result<PollOutcome<S>>
where
    Q: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<Option<S>, E>>,
    E: std::fmt::Display,
{
    policy.validate()?;

    let start = Instant::now();

    if !policy.initial_delay.is_zero() && !policy.max_wait.is_zero() {
        // The delay never extends past the budget; one query still runs.
        sleep_or_cancel(policy.initial_delay.min(policy.max_wait), cancel).await?;
    }

    loop {
        match query().await {
            Ok(Some(state)) => {
                if is_failure(&state) {
                    return Ok(PollOutcome::Failed(state));
                }
                if is_match(&state) {
                    return Ok(PollOutcome::Success(state));
                }
                debug!("State not terminal yet, still waiting");
            }
            Ok(None) => return Ok(PollOutcome::NotFound),
            Err(err) => {
                warn!(error = %err, "Transient poll error, retrying");
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= policy.max_wait {
            return Ok(PollOutcome::TimedOut);
        }

        sleep_or_cancel(policy.interval.min(policy.max_wait - elapsed), cancel).await?;
    }
}

async fn sleep_or_cancel(nap: Duration, cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) => {
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }
            tokio::select! {
                _ = tokio::time::sleep(nap) => Ok(()),
                _ = token.cancelled() => Err(Error::Cancelled),
            }
        }
        None => {
            tokio::time::sleep(nap).await;
            Ok(())
        }
    }
}

/// Set-based wait builder over [`poll_until`].
///
/// Collects terminal-success and terminal-failure states, an optional
/// substitute state for a missing resource, and an optional cancellation
/// token, then runs the wait against a query closure.
#[derive(Debug, Clone)]
pub struct Waiter<S> {
    policy: PollPolicy,
    match_states: Vec<S>,
    fail_states: Vec<S>,
    missing_as: Option<S>,
    cancel: Option<CancellationToken>,
}

impl<S> Waiter<S>
where
    S: Clone + PartialEq,
{
    /// Create a waiter with the given timing policy
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            match_states: Vec::new(),
            fail_states: Vec::new(),
            missing_as: None,
            cancel: None,
        }
    }

    /// Add a terminal-success state
    pub fn with_match_state(mut self, state: S) -> Self {
        self.match_states.push(state);
        self
    }

    /// Add a terminal-failure state
    pub fn with_fail_state(mut self, state: S) -> Self {
        self.fail_states.push(state);
        self
    }

    /// Substitute the given state when the resource is not found.
    ///
    /// Delete-and-wait flows map absence to their terminal state (for
    /// example `Deleted`) so that found-then-gone counts as success; without
    /// a substitute, absence ends the wait with [`PollOutcome::NotFound`].
    pub fn treat_missing_as(mut self, state: S) -> Self {
        self.missing_as = Some(state);
        self
    }

    /// Abandon the wait when this token is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run the wait against a query closure
    pub async fn run<Q, Fut, E>(&self, mut query: Q) -> Result<PollOutcome<S>>
    where
        Q: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<Option<S>, E>>,
        E: std::fmt::Display,
    {
        let missing = self.missing_as.clone();
        let wrapped = move || {
            let fut = query();
            let missing = missing.clone();
            async move { fut.await.map(|observed| observed.or(missing)) }
        };

        poll_until(
            &self.policy,
            self.cancel.as_ref(),
            wrapped,
            |state| self.match_states.contains(state),
            |state| self.fail_states.contains(state),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum State {
        Pending,
        Active,
        Deleted,
        Error,
    }

    /// Scripted query: each call pops the next canned response.
    struct Script {
        steps: RefCell<VecDeque<std::result::Result<Option<State>, String>>>,
        calls: RefCell<usize>,
    }

    impl Script {
        fn new(steps: Vec<std::result::Result<Option<State>, String>>) -> Self {
            Self {
                steps: RefCell::new(steps.into()),
                calls: RefCell::new(0),
            }
        }

        fn next(&self) -> std::result::Result<Option<State>, String> {
            *self.calls.borrow_mut() += 1;
            self.steps
                .borrow_mut()
                .pop_front()
                .expect("query called after the wait should have ended")
        }

        fn calls(&self) -> usize {
            *self.calls.borrow()
        }
    }

    fn ticks(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn policy(max_ticks: u64) -> PollPolicy {
        PollPolicy::new()
            .with_interval(ticks(1))
            .with_max_wait(ticks(max_ticks))
    }

    #[tokio::test]
    async fn test_zero_budget_single_query() {
        tokio::time::pause();
        let script = Script::new(vec![Ok(Some(State::Pending))]);
        let start = Instant::now();

        let outcome = poll_until(
            &policy(0),
            None,
            || {
                let step = script.next();
                async move { step }
            },
            |s| *s == State::Active,
            |_| false,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(script.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_zero_budget_immediate_match() {
        tokio::time::pause();
        let script = Script::new(vec![Ok(Some(State::Active))]);

        let outcome = poll_until(
            &policy(0),
            None,
            || {
                let step = script.next();
                async move { step }
            },
            |s| *s == State::Active,
            |_| false,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Success(State::Active));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn test_success_before_budget() {
        tokio::time::pause();
        let script = Script::new(vec![
            Ok(Some(State::Pending)),
            Ok(Some(State::Pending)),
            Ok(Some(State::Active)),
        ]);
        let start = Instant::now();

        let outcome = poll_until(
            &policy(5),
            None,
            || {
                let step = script.next();
                async move { step }
            },
            |s| *s == State::Active,
            |_| false,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Success(State::Active));
        assert_eq!(script.calls(), 3);
        // Match observed on the third tick, well inside the budget.
        assert!(start.elapsed() >= ticks(2));
        assert!(start.elapsed() < ticks(5));
    }

    #[tokio::test]
    async fn test_timeout_stops_querying() {
        tokio::time::pause();
        // Six responses: the last query lands exactly at the budget edge.
        // Script panics on any query past that, so completion proves the
        // waiter stopped.
        let script = Script::new(vec![Ok(Some(State::Pending)); 6]);
        let start = Instant::now();

        let outcome = poll_until(
            &policy(5),
            None,
            || {
                let step = script.next();
                async move { step }
            },
            |s| *s == State::Active,
            |_| false,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(script.calls(), 6);
        assert_eq!(start.elapsed(), ticks(5));
    }

    #[tokio::test]
    async fn test_fail_state_terminates_immediately() {
        tokio::time::pause();
        let script = Script::new(vec![Ok(Some(State::Pending)), Ok(Some(State::Error))]);

        let outcome = poll_until(
            &policy(60),
            None,
            || {
                let step = script.next();
                async move { step }
            },
            |s| *s == State::Active,
            |s| *s == State::Error,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Failed(State::Error));
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test]
    async fn test_fail_state_wins_over_match() {
        tokio::time::pause();
        let script = Script::new(vec![Ok(Some(State::Error))]);

        let outcome = poll_until(
            &policy(5),
            None,
            || {
                let step = script.next();
                async move { step }
            },
            |_| true,
            |s| *s == State::Error,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Failed(State::Error));
    }

    #[tokio::test]
    async fn test_missing_is_terminal_without_substitute() {
        tokio::time::pause();
        let script = Script::new(vec![Ok(Some(State::Pending)), Ok(None)]);

        let outcome = poll_until(
            &policy(60),
            None,
            || {
                let step = script.next();
                async move { step }
            },
            |s| *s == State::Active,
            |_| false,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::NotFound);
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        tokio::time::pause();
        let script = Script::new(vec![
            Err("connection reset".to_string()),
            Err("connection reset".to_string()),
            Ok(Some(State::Active)),
        ]);

        let outcome = poll_until(
            &policy(10),
            None,
            || {
                let step = script.next();
                async move { step }
            },
            |s| *s == State::Active,
            |_| false,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Success(State::Active));
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test]
    async fn test_persistent_errors_exhaust_budget() {
        tokio::time::pause();
        let script = Script::new(vec![Err("503".to_string()); 4]);

        let outcome = poll_until(
            &policy(3),
            None,
            || {
                let step = script.next();
                async move { step }
            },
            |s| *s == State::Active,
            |_| false,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(script.calls(), 4);
    }

    #[tokio::test]
    async fn test_initial_delay_precedes_first_query() {
        tokio::time::pause();
        let script = Script::new(vec![Ok(Some(State::Active))]);
        let start = Instant::now();

        let outcome = poll_until(
            &policy(10).with_initial_delay(ticks(2)),
            None,
            || {
                let step = script.next();
                async move { step }
            },
            |s| *s == State::Active,
            |_| false,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Success(State::Active));
        assert_eq!(start.elapsed(), ticks(2));
    }

    #[tokio::test]
    async fn test_invalid_policy_rejected_before_querying() {
        let script = Script::new(vec![]);
        let bad = PollPolicy::new()
            .with_interval(Duration::ZERO)
            .with_max_wait(ticks(5));

        let result = poll_until(
            &bad,
            None,
            || {
                let step = script.next();
                async move { step }
            },
            |s: &State| *s == State::Active,
            |_| false,
        )
        .await;

        assert!(matches!(result, Err(Error::InvalidPolicy(_))));
        assert_eq!(script.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_between_ticks() {
        tokio::time::pause();
        let token = CancellationToken::new();
        token.cancel();
        let script = Script::new(vec![Ok(Some(State::Pending))]);

        let result = poll_until(
            &policy(60),
            Some(&token),
            || {
                let step = script.next();
                async move { step }
            },
            |s| *s == State::Active,
            |_| false,
        )
        .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn test_waiter_deletion_found_then_gone() {
        tokio::time::pause();
        let script = Script::new(vec![
            Ok(Some(State::Active)),
            Ok(Some(State::Active)),
            Ok(None),
        ]);

        let waiter = Waiter::new(policy(5))
            .with_match_state(State::Deleted)
            .treat_missing_as(State::Deleted);

        let outcome = waiter
            .run(|| {
                let step = script.next();
                async move { step }
            })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Success(State::Deleted));
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test]
    async fn test_waiter_deletion_already_gone() {
        tokio::time::pause();
        let script = Script::new(vec![Ok(None)]);

        let waiter = Waiter::new(policy(5))
            .with_match_state(State::Deleted)
            .treat_missing_as(State::Deleted);

        let outcome = waiter
            .run(|| {
                let step = script.next();
                async move { step }
            })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Success(State::Deleted));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn test_waiter_state_sets() {
        tokio::time::pause();
        let script = Script::new(vec![Ok(Some(State::Pending)), Ok(Some(State::Error))]);

        let waiter = Waiter::new(policy(60))
            .with_match_state(State::Active)
            .with_fail_state(State::Error);

        let outcome = waiter
            .run(|| {
                let step = script.next();
                async move { step }
            })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Failed(State::Error));
    }

    #[test]
    fn test_policy_defaults_and_serde() {
        let policy = PollPolicy::default();
        assert_eq!(policy.initial_delay, Duration::ZERO);
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(policy.max_wait, Duration::from_secs(300));

        let json = serde_json::to_string(&policy).unwrap();
        let parsed: PollPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, policy);
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = PollOutcome::Success(State::Active);
        assert!(outcome.is_success());
        assert_eq!(outcome.state(), Some(&State::Active));

        let outcome: PollOutcome<State> = PollOutcome::TimedOut;
        assert!(outcome.is_timed_out());
        assert_eq!(outcome.state(), None);
    }
}
