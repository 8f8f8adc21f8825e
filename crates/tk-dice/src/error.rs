//! Error types for the dice engine.

/// Errors that can occur during dice operations.
#[derive(Debug, thiserror::Error)]
pub enum DiceError {
    /// A die was requested with fewer than two sides.
    #[error("invalid die: d{0} (dice need at least 2 sides)")]
    InvalidDie(u32),

    /// A damage-expression term could not be parsed.
    ///
    /// Recorded per term; evaluation skips the bad term and continues
    /// with the remaining valid ones.
    #[error("bad damage term: '{0}'")]
    BadDamageTerm(String),

    /// A damage expression contained no valid terms at all.
    #[error("empty damage expression: '{0}'")]
    EmptyExpression(String),
}

/// Convenience result type for dice operations.
pub type DiceResult<T> = Result<T, DiceError>;
