//! Problem identifiers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A problem identifier such as `1873G2`: a numeric contest number followed
/// by the problem's index within that contest.
///
/// The split is purely lexical — everything before the first non-digit
/// character is the contest, everything from it onward is the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProblemId {
    raw: String,
    /// Byte offset of the first non-digit character.
    split: usize,
}

impl ProblemId {
    /// Contest number, e.g. `1873` for `1873G2`.
    pub fn contest(&self) -> &str {
        &self.raw[..self.split]
    }

    /// Index within the contest, e.g. `G2` for `1873G2`.
    pub fn index(&self) -> &str {
        &self.raw[self.split..]
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseProblemIdError {
    #[error("problem id {0:?} starts with a non-digit, expected a contest number")]
    MissingContest(String),
    #[error("problem id {0:?} has no index part")]
    MissingIndex(String),
}

impl FromStr for ProblemId {
    type Err = ParseProblemIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
            Some((0, _)) => Err(ParseProblemIdError::MissingContest(s.to_string())),
            Some((i, _)) => Ok(ProblemId {
                raw: s.to_string(),
                split: i,
            }),
            None => Err(ParseProblemIdError::MissingIndex(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_splits_contest_and_index() {
        let id: ProblemId = "1873G2".parse().unwrap();
        assert_eq!(id.contest(), "1873");
        assert_eq!(id.index(), "G2");
        assert_eq!(id.as_str(), "1873G2");
    }

    #[test]
    fn test_single_digit_contest() {
        let id: ProblemId = "2A".parse().unwrap();
        assert_eq!(id.contest(), "2");
        assert_eq!(id.index(), "A");
    }

    #[test]
    fn test_rejects_leading_non_digit() {
        let err = "G2".parse::<ProblemId>().unwrap_err();
        assert_eq!(err, ParseProblemIdError::MissingContest("G2".to_string()));
    }

    #[test]
    fn test_rejects_digits_only() {
        let err = "123".parse::<ProblemId>().unwrap_err();
        assert_eq!(err, ParseProblemIdError::MissingIndex("123".to_string()));
    }

    #[test]
    fn test_rejects_empty() {
        assert!("".parse::<ProblemId>().is_err());
    }
}
