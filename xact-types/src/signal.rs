use std::fmt;

/// A control signal returned (never propagated as a Rust error) from a
/// node's `step`/`reset`. The scheduler (component E) collects every
/// signal raised within one tranche and honours the highest-priority one.
///
/// Priority, highest first: `NonRecoverableError` -> `Halt` -> `ResetAndRetry`.
#[derive(Debug)]
pub enum ControlSignal {
    /// Planned clean shutdown. The process exits with `code`.
    Halt(i32),
    /// Controlled recovery: re-enter the scheduler's outer loop, calling
    /// `reset` on every local node before resuming stepping.
    ResetAndRetry,
    /// A runtime failure that cannot be recovered in-process. Carries the
    /// cause so it can be logged before the process exits non-zero.
    NonRecoverableError(Box<dyn std::error::Error + Send + Sync>),
}

impl ControlSignal {
    /// Ranking used by the scheduler's signal-priority merge (§4.E, §8).
    /// Lower value = higher priority.
    pub fn priority(&self) -> u8 {
        match self {
            ControlSignal::NonRecoverableError(_) => 0,
            ControlSignal::Halt(_) => 1,
            ControlSignal::ResetAndRetry => 2,
        }
    }
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlSignal::Halt(code) => write!(f, "Halt({code})"),
            ControlSignal::ResetAndRetry => write!(f, "ResetAndRetry"),
            ControlSignal::NonRecoverableError(cause) => {
                write!(f, "NonRecoverableError({cause})")
            }
        }
    }
}

/// Given every signal raised within a single tranche/step, return the one
/// that should be honoured, per the documented priority order. Returns
/// `None` if no node raised a signal.
pub fn highest_priority(signals: Vec<ControlSignal>) -> Option<ControlSignal> {
    let mut best: Option<ControlSignal> = None;
    for signal in signals {
        match &best {
            None => best = Some(signal),
            Some(current) if signal.priority() < current.priority() => best = Some(signal),
            Some(_) => {}
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_recoverable_error_always_wins() {
        let signals = vec![
            ControlSignal::ResetAndRetry,
            ControlSignal::Halt(0),
            ControlSignal::NonRecoverableError("boom".into()),
        ];
        let winner = highest_priority(signals).unwrap();
        assert_eq!(winner.priority(), 0);
    }

    #[test]
    fn halt_beats_reset_and_retry() {
        let signals = vec![ControlSignal::ResetAndRetry, ControlSignal::Halt(3)];
        let winner = highest_priority(signals).unwrap();
        assert!(matches!(winner, ControlSignal::Halt(3)));
    }

    #[test]
    fn no_signals_is_none() {
        assert!(highest_priority(vec![]).is_none());
    }
}

impl From<&str> for ControlSignal {
    fn from(msg: &str) -> Self {
        ControlSignal::NonRecoverableError(msg.to_string().into())
    }
}

impl From<String> for ControlSignal {
    fn from(msg: String) -> Self {
        ControlSignal::NonRecoverableError(msg.into())
    }
}
