//! Rate limit rule model and the `count/window` config syntax.
//!
//! Rules are written as comma-separated `count/window` tokens, e.g.
//! `5/minute,30/hour`. Recognized windows are `second`, `minute`, and `hour`
//! (a trailing `s` is tolerated). A request is denied if **any** rule for its
//! route is violated.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Seconds per recognized window unit.
const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;

/// A single fixed-window rate limit: at most `count` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitRule {
    /// Maximum admitted requests per window. Always > 0.
    pub count: u32,
    /// Window duration. Windows are aligned to epoch boundaries of this size.
    pub window: Duration,
}

impl LimitRule {
    /// Create a rule, rejecting a zero count.
    pub fn new(count: u32, window: Duration) -> Result<Self, RuleParseError> {
        if count == 0 {
            return Err(RuleParseError::ZeroCount);
        }
        if window.is_zero() {
            return Err(RuleParseError::ZeroWindow);
        }
        Ok(Self { count, window })
    }

    /// Window size in whole seconds.
    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }
}

impl fmt::Display for LimitRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}s", self.count, self.window.as_secs())
    }
}

/// Error type for rate limit rule parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleParseError {
    #[error("invalid rate limit token '{0}'; expected format like '10/minute'")]
    InvalidToken(String),

    #[error("unknown rate limit window '{0}'; expected second, minute, or hour")]
    UnknownWindow(String),

    #[error("rate limit count must be greater than 0")]
    ZeroCount,

    #[error("rate limit window must be greater than 0")]
    ZeroWindow,

    #[error("at least one rate limit rule is required")]
    Empty,
}

/// Parse a comma-separated rule list like `5/minute,30/hour`.
///
/// The returned rules are sorted by ascending window so the limiter can
/// evaluate the tightest window first.
pub fn parse_rules(raw: &str) -> Result<Vec<LimitRule>, RuleParseError> {
    let mut rules = Vec::new();

    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (count_part, window_part) = token
            .split_once('/')
            .ok_or_else(|| RuleParseError::InvalidToken(token.to_string()))?;

        let count: u32 = count_part
            .trim()
            .parse()
            .map_err(|_| RuleParseError::InvalidToken(token.to_string()))?;

        let window = parse_window(window_part.trim())?;
        rules.push(LimitRule::new(count, window)?);
    }

    if rules.is_empty() {
        return Err(RuleParseError::Empty);
    }

    rules.sort_by_key(LimitRule::window_secs);
    Ok(rules)
}

/// Parse a window unit name into a duration. Tolerates plural forms.
fn parse_window(raw: &str) -> Result<Duration, RuleParseError> {
    let unit = raw.to_ascii_lowercase();
    let secs = match unit.trim_end_matches('s') {
        "second" => 1,
        "minute" => SECONDS_PER_MINUTE,
        "hour" => SECONDS_PER_HOUR,
        _ => return Err(RuleParseError::UnknownWindow(raw.to_string())),
    };
    Ok(Duration::from_secs(secs))
}
