// retry.rs
//
// Every remote operation (sheet, mail, site) goes through `with_backoff` or
// its non-fatal variant. Errors are classified into a closed kind set at the
// transport boundary so nothing above it has to sniff error strings.

use rand::Rng;
use std::fmt;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 5;
const BASE_DELAY_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 10_000;
const JITTER_MAX_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    RateLimited,
    Server,
    Timeout,
    ConnectionReset,
    Fatal,
}

#[derive(Debug)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Fatal, message)
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind, RemoteErrorKind::Fatal)
    }

    /// Classify an HTTP status code the way the quota'd Google APIs and the
    /// auction site report pressure: 429 and 5xx are worth retrying.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            429 => RemoteErrorKind::RateLimited,
            500..=599 => RemoteErrorKind::Server,
            _ => RemoteErrorKind::Fatal,
        };
        Self::new(kind, format!("HTTP {status}: {body}"))
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            RemoteErrorKind::Timeout
        } else if err.is_connect() || err.is_request() {
            RemoteErrorKind::ConnectionReset
        } else {
            RemoteErrorKind::Fatal
        };
        Self::new(kind, err.to_string())
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            RemoteErrorKind::RateLimited => "rate limited",
            RemoteErrorKind::Server => "server error",
            RemoteErrorKind::Timeout => "timeout",
            RemoteErrorKind::ConnectionReset => "connection reset",
            RemoteErrorKind::Fatal => "fatal",
        };
        write!(f, "{kind}: {}", self.message)
    }
}

impl std::error::Error for RemoteError {}

fn backoff_delay(attempt: u32) -> Duration {
    let exponential = BASE_DELAY_MS.saturating_mul(1u64 << attempt.min(16));
    let capped = std::cmp::min(exponential, MAX_BACKOFF_MS);
    let jitter = rand::thread_rng().gen_range(0..=JITTER_MAX_MS);
    Duration::from_millis(capped + jitter)
}

/// Retry `op` with exponential backoff until it succeeds, fails fatally, or
/// the attempt cap is reached. Fatal errors propagate immediately.
pub fn with_backoff<T, F>(label: &str, mut op: F) -> Result<T, RemoteError>
where
    F: FnMut() -> Result<T, RemoteError>,
{
    let mut last_err = None;

    for attempt in 1..=MAX_ATTEMPTS {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() => {
                eprintln!("⚠️ {label} attempt {attempt} failed: {e}");
                last_err = Some(e);
                if attempt < MAX_ATTEMPTS {
                    std::thread::sleep(backoff_delay(attempt));
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| RemoteError::fatal(format!("{label}: retry loop failed"))))
}

/// Non-fatal variant: exhausting retries (or a fatal error) is reported as
/// `None` so the caller can skip this unit of work and continue.
pub fn with_backoff_soft<T, F>(label: &str, op: F) -> Option<T>
where
    F: FnMut() -> Result<T, RemoteError>,
{
    match with_backoff(label, op) {
        Ok(v) => Some(v),
        Err(e) => {
            eprintln!("⚠️ {label} giving up: {e}");
            None
        }
    }
}
