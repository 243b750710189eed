// Severity and screening status enums

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Ordinal verdict of a check. Declaration order is the aggregation order:
/// `OK < WARNING < CRITICAL < UNKNOWN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Unknown => "UNKNOWN",
        }
    }

    /// Highest severity of the set, `None` for an empty set
    pub fn aggregate<I>(severities: I) -> Option<Severity>
    where
        I: IntoIterator<Item = Severity>,
    {
        severities.into_iter().max()
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Severity::Ok),
            "WARNING" => Ok(Severity::Warning),
            "CRITICAL" => Ok(Severity::Critical),
            "UNKNOWN" => Ok(Severity::Unknown),
            other => Err(DomainError::UnknownVariant {
                kind: "severity",
                value: other.to_string(),
            }),
        }
    }
}

/// How the overall severity moved compared to the previous completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityChange {
    Increased,
    Decreased,
    Unchanged,
}

impl SeverityChange {
    pub fn between(previous: Option<Severity>, current: Option<Severity>) -> Option<Self> {
        let (previous, current) = (previous?, current?);
        Some(match current.cmp(&previous) {
            std::cmp::Ordering::Greater => SeverityChange::Increased,
            std::cmp::Ordering::Less => SeverityChange::Decreased,
            std::cmp::Ordering::Equal => SeverityChange::Unchanged,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityChange::Increased => "INCREASED",
            SeverityChange::Decreased => "DECREASED",
            SeverityChange::Unchanged => "UNCHANGED",
        }
    }
}

impl std::fmt::Display for SeverityChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeverityChange {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCREASED" => Ok(SeverityChange::Increased),
            "DECREASED" => Ok(SeverityChange::Decreased),
            "UNCHANGED" => Ok(SeverityChange::Unchanged),
            other => Err(DomainError::UnknownVariant {
                kind: "severity change",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle of a single check, and of a screening as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScreeningStatus {
    Created,
    Scheduled,
    InProgress,
    Done,
}

impl ScreeningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreeningStatus::Created => "CREATED",
            ScreeningStatus::Scheduled => "SCHEDULED",
            ScreeningStatus::InProgress => "IN_PROGRESS",
            ScreeningStatus::Done => "DONE",
        }
    }

    /// Overall status derived from the per-check statuses.
    ///
    /// All done is done. Any check running, or a mix of finished and
    /// pending checks, is in progress. Otherwise the least advanced
    /// pending state wins.
    pub fn aggregate<I>(statuses: I) -> ScreeningStatus
    where
        I: IntoIterator<Item = ScreeningStatus>,
    {
        let mut any_done = false;
        let mut any_running = false;
        let mut any_scheduled = false;
        let mut any_created = false;

        for status in statuses {
            match status {
                ScreeningStatus::Done => any_done = true,
                ScreeningStatus::InProgress => any_running = true,
                ScreeningStatus::Scheduled => any_scheduled = true,
                ScreeningStatus::Created => any_created = true,
            }
        }

        let any_pending = any_running || any_scheduled || any_created;
        if !any_pending {
            if any_done {
                ScreeningStatus::Done
            } else {
                ScreeningStatus::Created
            }
        } else if any_running || any_done {
            ScreeningStatus::InProgress
        } else if any_scheduled {
            ScreeningStatus::Scheduled
        } else {
            ScreeningStatus::Created
        }
    }
}

impl std::fmt::Display for ScreeningStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScreeningStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(ScreeningStatus::Created),
            "SCHEDULED" => Ok(ScreeningStatus::Scheduled),
            "IN_PROGRESS" => Ok(ScreeningStatus::InProgress),
            "DONE" => Ok(ScreeningStatus::Done),
            other => Err(DomainError::UnknownVariant {
                kind: "screening status",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Ok < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
        assert!(Severity::Critical < Severity::Unknown);
    }

    #[test]
    fn test_aggregate_takes_max() {
        let severities = [Severity::Warning, Severity::Ok, Severity::Critical];
        assert_eq!(Severity::aggregate(severities), Some(Severity::Critical));
        assert_eq!(
            Severity::aggregate([Severity::Critical, Severity::Unknown]),
            Some(Severity::Unknown)
        );
        assert_eq!(Severity::aggregate(Vec::new()), None);
    }

    #[test]
    fn test_severity_change() {
        assert_eq!(
            SeverityChange::between(Some(Severity::Ok), Some(Severity::Critical)),
            Some(SeverityChange::Increased)
        );
        assert_eq!(
            SeverityChange::between(Some(Severity::Warning), Some(Severity::Ok)),
            Some(SeverityChange::Decreased)
        );
        assert_eq!(
            SeverityChange::between(Some(Severity::Ok), Some(Severity::Ok)),
            Some(SeverityChange::Unchanged)
        );
        assert_eq!(SeverityChange::between(None, Some(Severity::Ok)), None);
    }

    #[test]
    fn test_status_aggregate() {
        use ScreeningStatus::*;
        assert_eq!(ScreeningStatus::aggregate([Done, Done]), Done);
        assert_eq!(ScreeningStatus::aggregate([Done, Scheduled]), InProgress);
        assert_eq!(ScreeningStatus::aggregate([Scheduled, InProgress]), InProgress);
        assert_eq!(ScreeningStatus::aggregate([Scheduled, Scheduled]), Scheduled);
        assert_eq!(ScreeningStatus::aggregate([Created, Created]), Created);
    }

    #[test]
    fn test_round_trip_strings() {
        for severity in [
            Severity::Ok,
            Severity::Warning,
            Severity::Critical,
            Severity::Unknown,
        ] {
            assert_eq!(severity.as_str().parse::<Severity>().unwrap(), severity);
        }
        assert_eq!(
            "IN_PROGRESS".parse::<ScreeningStatus>().unwrap(),
            ScreeningStatus::InProgress
        );
        assert!("BOGUS".parse::<Severity>().is_err());
    }
}
