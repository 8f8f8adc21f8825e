//! Damage-expression parsing and evaluation.
//!
//! The grammar is a sequence of terms separated by `+` or `-`. Each term
//! is either `<count>d<sides>` (count defaults to 1) or a bare integer
//! constant. Malformed terms are skipped with a recorded reason; the
//! remaining valid terms still evaluate.

use serde::{Deserialize, Serialize};

use crate::die::Die;
use crate::error::{DiceError, DiceResult};
use crate::source::RandomSource;

/// One parsed term of a damage expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageTerm {
    /// Roll `count` dice of the given type; `negative` subtracts the sum.
    Dice {
        /// How many dice to roll.
        count: u32,
        /// The die type.
        die: Die,
        /// Whether this term is subtracted.
        negative: bool,
    },
    /// A flat constant, already signed.
    Constant(i32),
}

impl std::fmt::Display for DamageTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dice {
                count,
                die,
                negative,
            } => {
                let sign = if *negative { "-" } else { "" };
                write!(f, "{sign}{count}{die}")
            }
            Self::Constant(n) => write!(f, "{n}"),
        }
    }
}

/// A parsed damage expression like `2d6+3` or `1d8+1d6-1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageExpression {
    /// The original expression text.
    pub text: String,
    /// The terms that parsed cleanly.
    pub terms: Vec<DamageTerm>,
    /// Terms that were skipped, with the reason each failed.
    pub skipped: Vec<String>,
}

impl DamageExpression {
    /// Parse an expression, skipping malformed terms.
    ///
    /// Fails only when no term parses at all.
    pub fn parse(text: &str) -> DiceResult<Self> {
        let mut terms = Vec::new();
        let mut skipped = Vec::new();

        for (raw, negative) in split_terms(text) {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            match parse_term(trimmed, negative) {
                Some(term) => terms.push(term),
                None => skipped.push(DiceError::BadDamageTerm(trimmed.to_string()).to_string()),
            }
        }

        if terms.is_empty() {
            return Err(DiceError::EmptyExpression(text.to_string()));
        }

        Ok(Self {
            text: text.to_string(),
            terms,
            skipped,
        })
    }

    /// Evaluate the expression against a random source.
    ///
    /// Dice terms are rolled and summed, constants added, and the explicit
    /// modifier added last.
    pub fn evaluate(&self, modifier: i32, source: &mut dyn RandomSource) -> DamageRollOutcome {
        let mut term_rolls = Vec::new();
        let mut subtotal = 0i32;

        for term in &self.terms {
            match term {
                DamageTerm::Dice {
                    count,
                    die,
                    negative,
                } => {
                    let rolls: Vec<u32> = (0..*count).map(|_| source.next(die.sides())).collect();
                    let sum: i32 = rolls.iter().map(|&v| v as i32).sum();
                    subtotal += if *negative { -sum } else { sum };
                    term_rolls.push(TermRoll {
                        term: term.clone(),
                        rolls,
                    });
                }
                DamageTerm::Constant(n) => {
                    subtotal += n;
                    term_rolls.push(TermRoll {
                        term: term.clone(),
                        rolls: Vec::new(),
                    });
                }
            }
        }

        DamageRollOutcome {
            expression: self.text.clone(),
            term_rolls,
            subtotal,
            modifier,
            total: subtotal + modifier,
            skipped_terms: self.skipped.clone(),
        }
    }
}

impl std::fmt::Display for DamageExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// The dice rolled for a single term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermRoll {
    /// The term that was evaluated.
    pub term: DamageTerm,
    /// Individual die values (empty for constants).
    pub rolls: Vec<u32>,
}

/// The result of evaluating a damage expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageRollOutcome {
    /// The expression text that was evaluated.
    pub expression: String,
    /// Per-term rolls in expression order.
    pub term_rolls: Vec<TermRoll>,
    /// Sum of all term values before the explicit modifier.
    pub subtotal: i32,
    /// The explicit modifier added last.
    pub modifier: i32,
    /// Final damage total.
    pub total: i32,
    /// Reasons for any skipped malformed terms.
    pub skipped_terms: Vec<String>,
}

impl std::fmt::Display for DamageRollOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.expression, self.total)
    }
}

/// Split an expression into (term, negative) pairs on `+`/`-` boundaries.
fn split_terms(text: &str) -> Vec<(String, bool)> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut negative = false;

    for ch in text.chars() {
        match ch {
            '+' | '-' => {
                if !current.trim().is_empty() {
                    out.push((current.clone(), negative));
                }
                current.clear();
                negative = ch == '-';
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        out.push((current, negative));
    }
    out
}

/// Parse a single term: `<count>d<sides>` or a bare integer.
fn parse_term(term: &str, negative: bool) -> Option<DamageTerm> {
    let lower = term.to_lowercase();

    if let Some(d_pos) = lower.find('d') {
        let count_part = &lower[..d_pos];
        let sides_part = &lower[d_pos + 1..];

        let count = if count_part.is_empty() {
            1
        } else {
            count_part.parse::<u32>().ok().filter(|&c| c > 0)?
        };
        let sides = sides_part.parse::<u32>().ok()?;
        let die = Die::from_sides(sides)?;

        return Some(DamageTerm::Dice {
            count,
            die,
            negative,
        });
    }

    let value = lower.parse::<i32>().ok()?;
    Some(DamageTerm::Constant(if negative { -value } else { value }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FixedSource, SeededSource};
    use proptest::prelude::*;

    #[test]
    fn parse_simple() {
        let expr = DamageExpression::parse("2d6+3").unwrap();
        assert_eq!(expr.terms.len(), 2);
        assert_eq!(
            expr.terms[0],
            DamageTerm::Dice {
                count: 2,
                die: Die::D6,
                negative: false
            }
        );
        assert_eq!(expr.terms[1], DamageTerm::Constant(3));
        assert!(expr.skipped.is_empty());
    }

    #[test]
    fn parse_count_defaults_to_one() {
        let expr = DamageExpression::parse("d8+2").unwrap();
        assert_eq!(
            expr.terms[0],
            DamageTerm::Dice {
                count: 1,
                die: Die::D8,
                negative: false
            }
        );
    }

    #[test]
    fn parse_negative_terms() {
        let expr = DamageExpression::parse("1d8-2").unwrap();
        assert_eq!(expr.terms[1], DamageTerm::Constant(-2));

        let expr = DamageExpression::parse("2d6-1d4").unwrap();
        assert_eq!(
            expr.terms[1],
            DamageTerm::Dice {
                count: 1,
                die: Die::D4,
                negative: true
            }
        );
    }

    #[test]
    fn malformed_terms_skipped_not_fatal() {
        let expr = DamageExpression::parse("2d6+xd4+3").unwrap();
        assert_eq!(expr.terms.len(), 2);
        assert_eq!(expr.skipped.len(), 1);
        assert!(expr.skipped[0].contains("xd4"));
    }

    #[test]
    fn all_terms_malformed_is_error() {
        assert!(matches!(
            DamageExpression::parse("foo+bar"),
            Err(DiceError::EmptyExpression(_))
        ));
    }

    #[test]
    fn evaluate_two_d6_plus_three() {
        let expr = DamageExpression::parse("2d6+3").unwrap();
        let mut source = FixedSource::new([4, 5]);
        let outcome = expr.evaluate(0, &mut source);
        assert_eq!(outcome.subtotal, 12);
        assert_eq!(outcome.total, 12);
        assert_eq!(outcome.term_rolls[0].rolls, vec![4, 5]);
    }

    #[test]
    fn evaluate_with_explicit_modifier() {
        let expr = DamageExpression::parse("1d8+2").unwrap();
        let mut source = FixedSource::new([6]);
        let outcome = expr.evaluate(0, &mut source);
        assert_eq!(outcome.total, 8);

        let mut source = FixedSource::new([6]);
        let outcome = expr.evaluate(3, &mut source);
        assert_eq!(outcome.total, 11);
    }

    #[test]
    fn evaluate_subtracting_dice() {
        let expr = DamageExpression::parse("2d6-1d4").unwrap();
        let mut source = FixedSource::new([4, 5, 2]);
        let outcome = expr.evaluate(0, &mut source);
        assert_eq!(outcome.total, 7);
    }

    #[test]
    fn skipped_terms_carried_on_outcome() {
        let expr = DamageExpression::parse("2d6+junk").unwrap();
        let mut source = FixedSource::new([1, 1]);
        let outcome = expr.evaluate(0, &mut source);
        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.skipped_terms.len(), 1);
    }

    #[test]
    fn term_display() {
        let expr = DamageExpression::parse("2d6-1d4+3").unwrap();
        assert_eq!(expr.terms[0].to_string(), "2d6");
        assert_eq!(expr.terms[1].to_string(), "-1d4");
        assert_eq!(expr.terms[2].to_string(), "3");
    }

    proptest! {
        #[test]
        fn dice_totals_stay_in_range(count in 1u32..8, modifier in -5i32..10, seed in 0u64..500) {
            let expr = DamageExpression::parse(&format!("{count}d6")).unwrap();
            let mut source = SeededSource::new(seed);
            let outcome = expr.evaluate(modifier, &mut source);
            let count = count as i32;
            prop_assert!(outcome.subtotal >= count);
            prop_assert!(outcome.subtotal <= count * 6);
            prop_assert_eq!(outcome.total, outcome.subtotal + modifier);
        }
    }
}
