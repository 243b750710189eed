//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results.

use serde::{Deserialize, Serialize};
use shipscreen_core::domain::{HistoryEntry, Ship};

/// screening.create.v1
#[derive(Debug, Deserialize)]
pub struct CreateScreeningRequest {
    pub account_id: String,
    pub imo: String,
}

/// Result of screening.create.v1 and screening.schedule.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningStatusResponse {
    pub screening_id: String,
    pub status: String,
}

/// screening.get.v1 / screening.schedule.v1 / screening.history.v1
#[derive(Debug, Deserialize)]
pub struct ScreeningRequest {
    pub screening_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub screening_id: String,
    /// Newest first
    pub entries: Vec<HistoryEntry>,
}

/// ship.upsert.v1
#[derive(Debug, Deserialize)]
pub struct UpsertShipRequest {
    pub ship: Ship,
}

/// ship.get.v1
#[derive(Debug, Deserialize)]
pub struct ShipRequest {
    pub imo: String,
}

/// bulk.create.v1
#[derive(Debug, Deserialize)]
pub struct CreateBulkRequest {
    pub account_id: String,
    pub imos: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBulkResponse {
    pub bulk_ids: Vec<String>,
}

/// bulk.get.v1
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub bulk_id: String,
}

/// admin.stats.v1
#[derive(Debug, Default, Deserialize)]
pub struct StatsRequest {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobCounts {
    pub queued: i64,
    pub running: i64,
    pub done: i64,
    pub failed: i64,
    pub superseded: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreeningCounts {
    pub created: i64,
    pub scheduled: i64,
    pub in_progress: i64,
    pub done: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub jobs: JobCounts,
    pub screenings: ScreeningCounts,
    pub cache_entries: i64,
    pub db_size_bytes: i64,
    pub uptime_seconds: i64,
}

/// admin.maintenance.v1
#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceRequest {
    #[serde(default)]
    pub force_vacuum: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceResponse {
    pub vacuum_run: bool,
    pub jobs_deleted: i64,
    pub cache_entries_deleted: u64,
    pub db_size_before: i64,
    pub db_size_after: i64,
}
