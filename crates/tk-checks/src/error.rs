//! Error types for the check engine.

use thiserror::Error;

/// Result type for check-engine operations.
pub type CheckEngineResult<T> = Result<T, CheckError>;

/// Errors that can occur while resolving checks.
///
/// Unknown characters are deliberately absent: lookups for a missing
/// character degrade to a zero-modifier record with an explicit `error`
/// field so a session can keep running.
#[derive(Debug, Error)]
pub enum CheckError {
    /// A rule name is not registered in any profile, custom rule, or
    /// override. Always a hard error, never a silent default.
    #[error("unknown rule: {0}")]
    UnknownRule(String),

    /// The request context was not a JSON object.
    #[error("malformed context: {0}")]
    MalformedContext(String),

    /// A profile name did not match any known profile.
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    /// The request itself was unusable (e.g. empty actor id).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A modifier fell outside the profile's permitted range.
    #[error("modifier {value} outside permitted range ±{cap}")]
    ModifierOutOfRange {
        /// The offending modifier.
        value: i32,
        /// The profile's cap on absolute modifier size.
        cap: i32,
    },

    /// An error surfaced from the dice engine.
    #[error("dice error: {0}")]
    Dice(#[from] tk_dice::DiceError),
}
