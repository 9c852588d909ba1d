use std::time::{Duration, Instant};

/// Where an authenticated portal session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Unauthenticated,
    Authenticated,
    /// Older than the configured ceiling; must be replaced before the next cycle.
    Expired,
    /// The portal stopped accepting it.
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub max_age: Duration,
    /// Minimum spacing between two login attempts.
    pub reauth_cooldown: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(2 * 60 * 60),
            reauth_cooldown: Duration::from_secs(60),
        }
    }
}

/// Tracks one session through
/// `Unauthenticated -> Authenticated -> (Expired | Invalid) -> Unauthenticated`.
#[derive(Debug, Clone)]
pub struct SessionLifecycle {
    phase: SessionPhase,
    established_at: Option<Instant>,
    max_age: Duration,
}

impl SessionLifecycle {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            phase: SessionPhase::Unauthenticated,
            established_at: None,
            max_age: policy.max_age,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn established(&mut self, now: Instant) {
        self.phase = SessionPhase::Authenticated;
        self.established_at = Some(now);
    }

    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.established_at
            .map(|since| now.saturating_duration_since(since))
    }

    /// Moves an authenticated session past its ceiling to `Expired`.
    pub fn check_expiry(&mut self, now: Instant) -> SessionPhase {
        if self.phase == SessionPhase::Authenticated
            && self.age(now).is_some_and(|age| age > self.max_age)
        {
            self.phase = SessionPhase::Expired;
        }
        self.phase
    }

    pub fn invalidate(&mut self) {
        if self.phase == SessionPhase::Authenticated {
            self.phase = SessionPhase::Invalid;
        }
    }

    /// Drops the session so the next cycle logs in again.
    pub fn reset(&mut self) {
        self.phase = SessionPhase::Unauthenticated;
        self.established_at = None;
    }
}

/// Rate limit for login attempts.
#[derive(Debug, Clone)]
pub struct ReauthGate {
    cooldown: Duration,
    last_attempt: Option<Instant>,
}

impl ReauthGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_attempt: None,
        }
    }

    /// How long to wait at `now` before another attempt is allowed.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_attempt {
            None => Duration::ZERO,
            Some(last) => self
                .cooldown
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }

    pub fn record_attempt(&mut self, now: Instant) {
        self.last_attempt = Some(now);
    }
}
