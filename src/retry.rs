//! Status-driven retry policy for DSL queries.
//!
//! The query executor asks the policy what to do with every HTTP status it
//! sees. The policy is plain data so it can be tested without a server.

use std::time::Duration;

/// Fixed wait before retrying a rate-limited or failed request.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(30);

/// What the executor should do with a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// 200, 400 or 500: decode the body and hand it to the caller.
    Deliver,
    /// 429: wait and resend the same query, without limit.
    RateLimited,
    /// 403: log in again and resend the same query once.
    SessionExpired,
    /// Anything else: wait and resend while the retry budget lasts.
    Transient,
}

impl Disposition {
    /// Classify an HTTP status code.
    pub fn of(status: u16) -> Self {
        match status {
            200 | 400 | 500 => Disposition::Deliver,
            429 => Disposition::RateLimited,
            403 => Disposition::SessionExpired,
            _ => Disposition::Transient,
        }
    }
}

/// Next step chosen by [`RetryState::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Deliver,
    /// Sleep for the given duration, then resend.
    Wait(Duration),
    /// Log in again, then resend.
    Relogin,
    /// Give up and surface the status as an error.
    Fail,
}

/// Retry configuration shared by every query a client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait between attempts.
    pub backoff: Duration,
    /// Retries allowed for unexpected statuses (default 0).
    pub retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: DEFAULT_BACKOFF,
            retries: 0,
        }
    }
}

impl RetryPolicy {
    /// Start tracking a single query dispatch.
    pub fn start(&self) -> RetryState {
        RetryState {
            backoff: self.backoff,
            budget: self.retries,
            relogged: false,
        }
    }
}

/// Per-query retry bookkeeping.
#[derive(Debug, Clone)]
pub struct RetryState {
    backoff: Duration,
    budget: u32,
    relogged: bool,
}

impl RetryState {
    /// Decide what to do after receiving `status`.
    ///
    /// A 403 earns one re-login. A second 403 right after it means the fresh
    /// token was rejected too, so it is handled like any unexpected status.
    pub fn next(&mut self, status: u16) -> Action {
        let disposition = Disposition::of(status);
        if disposition != Disposition::SessionExpired {
            self.relogged = false;
        }

        match disposition {
            Disposition::Deliver => Action::Deliver,
            Disposition::RateLimited => Action::Wait(self.backoff),
            Disposition::SessionExpired if !self.relogged => {
                self.relogged = true;
                Action::Relogin
            }
            Disposition::SessionExpired | Disposition::Transient => {
                if self.budget > 0 {
                    self.budget -= 1;
                    Action::Wait(self.backoff)
                } else {
                    Action::Fail
                }
            }
        }
    }

    /// Retries left for unexpected statuses.
    pub fn remaining(&self) -> u32 {
        self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(retries: u32) -> RetryPolicy {
        RetryPolicy {
            backoff: Duration::from_millis(5),
            retries,
        }
    }

    #[test]
    fn test_classify_statuses() {
        assert_eq!(Disposition::of(200), Disposition::Deliver);
        assert_eq!(Disposition::of(400), Disposition::Deliver);
        assert_eq!(Disposition::of(500), Disposition::Deliver);
        assert_eq!(Disposition::of(429), Disposition::RateLimited);
        assert_eq!(Disposition::of(403), Disposition::SessionExpired);
        assert_eq!(Disposition::of(503), Disposition::Transient);
        assert_eq!(Disposition::of(404), Disposition::Transient);
        assert_eq!(Disposition::of(201), Disposition::Transient);
    }

    #[test]
    fn test_default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.backoff, Duration::from_secs(30));
        assert_eq!(p.retries, 0);
    }

    #[test]
    fn test_rate_limit_never_gives_up() {
        let mut state = policy(0).start();
        for _ in 0..100 {
            assert_eq!(state.next(429), Action::Wait(Duration::from_millis(5)));
        }
        assert_eq!(state.next(200), Action::Deliver);
    }

    #[test]
    fn test_transient_without_budget_fails_immediately() {
        let mut state = policy(0).start();
        assert_eq!(state.next(503), Action::Fail);
    }

    #[test]
    fn test_transient_budget_counts_down() {
        let mut state = policy(2).start();
        assert_eq!(state.next(503), Action::Wait(Duration::from_millis(5)));
        assert_eq!(state.remaining(), 1);
        assert_eq!(state.next(502), Action::Wait(Duration::from_millis(5)));
        assert_eq!(state.remaining(), 0);
        assert_eq!(state.next(503), Action::Fail);
    }

    #[test]
    fn test_rate_limit_does_not_spend_budget() {
        let mut state = policy(1).start();
        state.next(429);
        state.next(429);
        assert_eq!(state.remaining(), 1);
    }

    #[test]
    fn test_single_relogin_per_403() {
        let mut state = policy(0).start();
        assert_eq!(state.next(403), Action::Relogin);
        assert_eq!(state.next(403), Action::Fail);
    }

    #[test]
    fn test_relogin_again_after_other_status() {
        let mut state = policy(0).start();
        assert_eq!(state.next(403), Action::Relogin);
        assert!(matches!(state.next(429), Action::Wait(_)));
        assert_eq!(state.next(403), Action::Relogin);
    }
}
