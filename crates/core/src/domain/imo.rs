// IMO ship identification number

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};

/// Seven digit IMO number with a valid check digit.
///
/// The check digit is the last digit of the sum of the first six digits
/// weighted 7 down to 2.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Imo(String);

impl Imo {
    /// Parse an IMO number, accepting an optional `IMO` prefix and surrounding
    /// whitespace (`"IMO 9074729"`, `"9074729"`).
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("IMO")
            .or_else(|| trimmed.strip_prefix("imo"))
            .unwrap_or(trimmed)
            .trim();

        if digits.len() != 7 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidImo(raw.to_string()));
        }

        let values: Vec<u32> = digits.bytes().map(|b| u32::from(b - b'0')).collect();
        let weighted: u32 = values[..6]
            .iter()
            .zip((2..=7).rev())
            .map(|(digit, weight)| digit * weight)
            .sum();

        if weighted % 10 != values[6] {
            return Err(DomainError::InvalidImo(raw.to_string()));
        }

        Ok(Self(digits.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Imo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Imo {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Imo::parse(&value)
    }
}

impl From<Imo> for String {
    fn from(imo: Imo) -> Self {
        imo.0
    }
}
