// Bulk Screening Domain Model

use crate::domain::error::DomainError;
use crate::domain::screening::ScreeningId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type BulkScreeningId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkScreeningStatus {
    Scheduled,
    Done,
    InvalidImo,
    NotFound,
}

impl BulkScreeningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkScreeningStatus::Scheduled => "SCHEDULED",
            BulkScreeningStatus::Done => "DONE",
            BulkScreeningStatus::InvalidImo => "INVALID_IMO",
            BulkScreeningStatus::NotFound => "NOT_FOUND",
        }
    }
}

impl std::fmt::Display for BulkScreeningStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BulkScreeningStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(BulkScreeningStatus::Scheduled),
            "DONE" => Ok(BulkScreeningStatus::Done),
            "INVALID_IMO" => Ok(BulkScreeningStatus::InvalidImo),
            "NOT_FOUND" => Ok(BulkScreeningStatus::NotFound),
            other => Err(DomainError::UnknownVariant {
                kind: "bulk screening status",
                value: other.to_string(),
            }),
        }
    }
}

/// One IMO of a bulk screening request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkScreening {
    pub id: BulkScreeningId,
    pub account_id: String,
    /// IMO as submitted, validated only when processed
    pub imo: String,
    pub status: BulkScreeningStatus,
    pub screening_id: Option<ScreeningId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl BulkScreening {
    pub fn new(
        id: impl Into<String>,
        account_id: impl Into<String>,
        imo: impl Into<String>,
        now_millis: i64,
    ) -> Self {
        Self {
            id: id.into(),
            account_id: account_id.into(),
            imo: imo.into(),
            status: BulkScreeningStatus::Scheduled,
            screening_id: None,
            created_at: now_millis,
            updated_at: now_millis,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == BulkScreeningStatus::Scheduled
    }

    pub fn resolve(&mut self, screening_id: impl Into<String>, now_millis: i64) {
        self.status = BulkScreeningStatus::Done;
        self.screening_id = Some(screening_id.into());
        self.updated_at = now_millis;
    }

    pub fn reject(&mut self, status: BulkScreeningStatus, now_millis: i64) {
        self.status = status;
        self.updated_at = now_millis;
    }
}
