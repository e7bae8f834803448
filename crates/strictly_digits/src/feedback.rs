//! Codes, per-digit marks, and the guess evaluator.
//!
//! A code is always five decimal digits, leading zeros included. Evaluation
//! runs in three passes so that repeated digits are never credited more often
//! than they occur in the target.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{GameError, GameErrorKind};

/// Number of digits in every code.
pub const CODE_LENGTH: usize = 5;

/// Number of distinct codes (`00000` through `99999`).
pub const CODE_SPACE: u32 = 100_000;

/// A five-digit code, either a secret target or a player's guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code([u8; CODE_LENGTH]);

impl Code {
    /// Parses exactly five ASCII digits.
    ///
    /// # Errors
    ///
    /// Returns [`GameErrorKind::InvalidFormat`] for any other shape, including
    /// surrounding whitespace and non-ASCII digits.
    #[instrument]
    pub fn parse(input: &str) -> Result<Self, GameError> {
        let bytes = input.as_bytes();
        if bytes.len() != CODE_LENGTH || !bytes.iter().all(u8::is_ascii_digit) {
            return Err(GameError::new(GameErrorKind::InvalidFormat(
                input.to_string(),
            )));
        }

        let mut digits = [0u8; CODE_LENGTH];
        for (slot, byte) in digits.iter_mut().zip(bytes) {
            *slot = byte - b'0';
        }
        Ok(Self(digits))
    }

    /// Builds a code from an integer in `0..CODE_SPACE`, left-padding with zeros.
    ///
    /// # Errors
    ///
    /// Returns [`GameErrorKind::InvalidFormat`] if `value` has more than five digits.
    #[instrument]
    pub fn from_number(value: u32) -> Result<Self, GameError> {
        if value >= CODE_SPACE {
            return Err(GameError::new(GameErrorKind::InvalidFormat(
                value.to_string(),
            )));
        }
        Ok(Self::padded(value))
    }

    /// Draws a code uniformly from `00000..=99999`.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::padded(rng.gen_range(0..CODE_SPACE))
    }

    fn padded(mut value: u32) -> Self {
        let mut digits = [0u8; CODE_LENGTH];
        for slot in digits.iter_mut().rev() {
            *slot = (value % 10) as u8;
            value /= 10;
        }
        Self(digits)
    }

    /// Returns the digits, most significant first.
    pub fn digits(&self) -> &[u8; CODE_LENGTH] {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digit in self.0 {
            write!(f, "{}", digit)?;
        }
        Ok(())
    }
}

impl FromStr for Code {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Code {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.to_string()
    }
}

/// Classification of one guessed digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mark {
    /// Right digit, right position.
    Correct,
    /// Digit occurs in an unmatched target position elsewhere.
    Misplaced,
    /// Digit has no unmatched occurrence left in the target.
    Wrong,
}

/// Per-position marks for one guess, aligned with the guessed digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feedback([Mark; CODE_LENGTH]);

impl Feedback {
    /// Wraps a set of marks.
    pub fn new(marks: [Mark; CODE_LENGTH]) -> Self {
        Self(marks)
    }

    /// Returns the marks in guess order.
    pub fn marks(&self) -> &[Mark; CODE_LENGTH] {
        &self.0
    }

    /// Counts positions with the given mark.
    pub fn count(&self, mark: Mark) -> usize {
        self.0.iter().filter(|m| **m == mark).count()
    }

    /// True when every position is [`Mark::Correct`].
    pub fn is_solved(&self) -> bool {
        self.count(Mark::Correct) == CODE_LENGTH
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, mark) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", mark)?;
        }
        Ok(())
    }
}

/// Scores `guess` against `target`.
///
/// 1. Exact matches are [`Mark::Correct`] and consume their target position.
/// 2. Each remaining guess position, left to right, takes the first
///    unconsumed target position holding the same digit and becomes
///    [`Mark::Misplaced`].
/// 3. Whatever is left is [`Mark::Wrong`].
///
/// For any digit, the number of Correct plus Misplaced marks never exceeds its
/// multiplicity in the target.
#[instrument(level = "trace", skip(target), fields(guess = %guess))]
pub fn evaluate(target: &Code, guess: &Code) -> Feedback {
    let target = target.digits();
    let guess = guess.digits();

    let mut marks: [Option<Mark>; CODE_LENGTH] = [None; CODE_LENGTH];
    let mut consumed = [false; CODE_LENGTH];

    for i in 0..CODE_LENGTH {
        if guess[i] == target[i] {
            marks[i] = Some(Mark::Correct);
            consumed[i] = true;
        }
    }

    for i in 0..CODE_LENGTH {
        if marks[i].is_some() {
            continue;
        }
        if let Some(j) = (0..CODE_LENGTH).find(|&j| !consumed[j] && target[j] == guess[i]) {
            consumed[j] = true;
            marks[i] = Some(Mark::Misplaced);
        }
    }

    Feedback(marks.map(|mark| mark.unwrap_or(Mark::Wrong)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use Mark::{Correct, Misplaced, Wrong};

    fn code(s: &str) -> Code {
        Code::parse(s).expect("valid code")
    }

    #[test]
    fn test_parse_keeps_leading_zeros() {
        let c = code("00042");
        assert_eq!(c.digits(), &[0, 0, 0, 4, 2]);
        assert_eq!(c.to_string(), "00042");
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        for input in ["", "1234", "123456", "12a45", " 1234", "1234 ", "１２３４５", "-1234"] {
            let err = Code::parse(input).expect_err("should be rejected");
            assert!(
                matches!(err.kind(), GameErrorKind::InvalidFormat(s) if s == input),
                "unexpected error for {input:?}: {err}"
            );
        }
    }

    #[test]
    fn test_from_number_pads() {
        assert_eq!(Code::from_number(7).expect("in range").to_string(), "00007");
        assert_eq!(Code::from_number(99_999).expect("in range").to_string(), "99999");
        assert!(Code::from_number(100_000).is_err());
    }

    #[test]
    fn test_serde_uses_string_form() {
        let json = serde_json::to_string(&code("01234")).expect("serialize");
        assert_eq!(json, "\"01234\"");
        let back: Code = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, code("01234"));
        assert!(serde_json::from_str::<Code>("\"0123\"").is_err());
    }

    #[test]
    fn test_evaluate_documented_scenario() {
        let feedback = evaluate(&code("04321"), &code("01234"));
        assert_eq!(
            feedback.marks(),
            &[Correct, Misplaced, Misplaced, Misplaced, Misplaced]
        );
    }

    #[test]
    fn test_evaluate_exact_match() {
        let feedback = evaluate(&code("55555"), &code("55555"));
        assert!(feedback.is_solved());
    }

    #[test]
    fn test_evaluate_no_common_digits() {
        let feedback = evaluate(&code("11111"), &code("22222"));
        assert_eq!(feedback.count(Wrong), 5);
    }

    #[test]
    fn test_guess_repeats_digit_more_than_target() {
        // Only one '1' in the target: the exact match takes it, the rest are wrong.
        let feedback = evaluate(&code("12345"), &code("11111"));
        assert_eq!(feedback.marks(), &[Correct, Wrong, Wrong, Wrong, Wrong]);
    }

    #[test]
    fn test_misplaced_assigned_left_to_right() {
        // Target has a single '7'; both guessed sevens are misplaced candidates,
        // only the leftmost gets credit.
        let feedback = evaluate(&code("70000"), &code("07700"));
        assert_eq!(feedback.marks(), &[Misplaced, Misplaced, Wrong, Correct, Correct]);
    }

    #[test]
    fn test_exact_match_wins_over_earlier_misplaced() {
        let feedback = evaluate(&code("12345"), &code("33000"));
        assert_eq!(feedback.marks(), &[Misplaced, Wrong, Wrong, Wrong, Wrong]);

        // The '3' at index 4 is exact, so the leading '3' finds nothing left.
        let feedback = evaluate(&code("00003"), &code("30003"));
        assert_eq!(feedback.marks(), &[Wrong, Correct, Correct, Correct, Correct]);
    }

    #[test]
    fn test_target_with_repeats() {
        let feedback = evaluate(&code("11223"), &code("21321"));
        // Exact at 1 and 3. Then '2'->idx2, '3'->idx4, '1'->idx0.
        assert_eq!(
            feedback.marks(),
            &[Misplaced, Correct, Misplaced, Correct, Misplaced]
        );
    }

    #[test]
    fn test_feedback_display() {
        let feedback = Feedback::new([Correct, Misplaced, Wrong, Wrong, Correct]);
        assert_eq!(
            feedback.to_string(),
            "correct, misplaced, wrong, wrong, correct"
        );
    }
}
