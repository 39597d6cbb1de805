//! Bounded retry loop for cache file I/O.
//!
//! # Invariants
//! - Only `io::ErrorKind::NotFound` is retried; every other error returns
//!   immediately.
//! - The loop never runs more than `max_attempts` attempts (at least one).

use std::fmt::{Display, Formatter};
use std::io;

/// First attempt plus two retries.
pub const MAX_CACHE_ATTEMPTS: u32 = 3;

/// Cache operation that went through the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Load,
    Save,
}

impl Display for CacheOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Save => f.write_str("save"),
        }
    }
}

/// Result of a bounded retry run that did not hit a fatal error.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Done { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: io::Error },
}

/// Runs `attempt` until it succeeds, calling `recover` after each NotFound.
///
/// `attempt` receives the 1-based attempt number. Errors from `recover`
/// are fatal and returned as-is.
pub fn retry_on_not_found<T, A, R>(
    max_attempts: u32,
    mut attempt: A,
    mut recover: R,
) -> io::Result<RetryOutcome<T>>
where
    A: FnMut(u32) -> io::Result<T>,
    R: FnMut() -> io::Result<()>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0;
    loop {
        attempts += 1;
        match attempt(attempts) {
            Ok(value) => return Ok(RetryOutcome::Done { value, attempts }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if attempts >= max_attempts {
                    return Ok(RetryOutcome::Exhausted {
                        attempts,
                        last_error: err,
                    });
                }
                recover()?;
            }
            Err(err) => return Err(err),
        }
    }
}
