// External data provider ports (sanctions, inspections, movements)

use crate::domain::Imo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider errors, split by whether a retry can help
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Provider rate limited")]
    RateLimited,

    #[error("Provider rejected credentials")]
    Unauthorized,

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Refresh already in progress: {0}")]
    RefreshInProgress(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Unavailable(_)
                | ProviderError::RateLimited
                | ProviderError::RefreshInProgress(_)
        )
    }
}

/// Entry of a sanctions list matching the queried entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionHit {
    pub list: String,
    pub entity: String,
    #[serde(default)]
    pub listed_on: Option<String>,
}

/// Port state control inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub inspected_at: i64, // epoch ms
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub authority: Option<String>,
    pub detained: bool,
    #[serde(default)]
    pub deficiencies: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortCall {
    pub port: String,
    /// ISO alpha-2 country of the port
    pub country: String,
    pub arrived_at: i64,
    #[serde(default)]
    pub departed_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneVisit {
    pub zone: String,
    pub entered_at: i64,
    #[serde(default)]
    pub exited_at: Option<i64>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SanctionsSource: Send + Sync {
    /// Sanction list entries naming the ship
    async fn ship_sanctions(&self, imo: &Imo) -> Result<Vec<SanctionHit>, ProviderError>;

    /// Sanction list entries naming the company
    async fn company_sanctions(&self, name: &str) -> Result<Vec<SanctionHit>, ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InspectionsSource: Send + Sync {
    /// Inspections of the ship since `since` (epoch ms)
    async fn inspections(&self, imo: &Imo, since: i64) -> Result<Vec<Inspection>, ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MovementsSource: Send + Sync {
    async fn port_calls(&self, imo: &Imo, since: i64) -> Result<Vec<PortCall>, ProviderError>;

    async fn zone_visits(&self, imo: &Imo, since: i64) -> Result<Vec<ZoneVisit>, ProviderError>;
}

// ============================================================================
// In-memory implementation for tests
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory provider data. Implements every source port.
    #[derive(Default)]
    pub struct StaticSources {
        ship_hits: Mutex<HashMap<String, Vec<SanctionHit>>>,
        company_hits: Mutex<HashMap<String, Vec<SanctionHit>>>,
        inspections: Mutex<HashMap<String, Vec<Inspection>>>,
        port_calls: Mutex<HashMap<String, Vec<PortCall>>>,
        zone_visits: Mutex<HashMap<String, Vec<ZoneVisit>>>,
        failure: Mutex<Option<ProviderError>>,
        calls: AtomicUsize,
    }

    impl StaticSources {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sanction_ship(&self, imo: &Imo, list: &str) {
            self.ship_hits
                .lock()
                .unwrap()
                .entry(imo.to_string())
                .or_default()
                .push(SanctionHit {
                    list: list.to_string(),
                    entity: imo.to_string(),
                    listed_on: None,
                });
        }

        pub fn sanction_company(&self, name: &str, list: &str) {
            self.company_hits
                .lock()
                .unwrap()
                .entry(name.to_string())
                .or_default()
                .push(SanctionHit {
                    list: list.to_string(),
                    entity: name.to_string(),
                    listed_on: None,
                });
        }

        pub fn add_inspection(&self, imo: &Imo, inspection: Inspection) {
            self.inspections
                .lock()
                .unwrap()
                .entry(imo.to_string())
                .or_default()
                .push(inspection);
        }

        pub fn add_port_call(&self, imo: &Imo, call: PortCall) {
            self.port_calls
                .lock()
                .unwrap()
                .entry(imo.to_string())
                .or_default()
                .push(call);
        }

        pub fn add_zone_visit(&self, imo: &Imo, visit: ZoneVisit) {
            self.zone_visits
                .lock()
                .unwrap()
                .entry(imo.to_string())
                .or_default()
                .push(visit);
        }

        /// Make every call fail with `error` until cleared with `None`
        pub fn set_failure(&self, error: Option<ProviderError>) {
            *self.failure.lock().unwrap() = error;
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn enter(&self) -> Result<(), ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failure.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl SanctionsSource for StaticSources {
        async fn ship_sanctions(&self, imo: &Imo) -> Result<Vec<SanctionHit>, ProviderError> {
            self.enter()?;
            Ok(self
                .ship_hits
                .lock()
                .unwrap()
                .get(imo.as_str())
                .cloned()
                .unwrap_or_default())
        }

        async fn company_sanctions(&self, name: &str) -> Result<Vec<SanctionHit>, ProviderError> {
            self.enter()?;
            Ok(self
                .company_hits
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .unwrap_or_default())
        }
    }

    #[async_trait]
    impl InspectionsSource for StaticSources {
        async fn inspections(&self, imo: &Imo, since: i64) -> Result<Vec<Inspection>, ProviderError> {
            self.enter()?;
            Ok(self
                .inspections
                .lock()
                .unwrap()
                .get(imo.as_str())
                .map(|all| {
                    all.iter()
                        .filter(|i| i.inspected_at >= since)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    #[async_trait]
    impl MovementsSource for StaticSources {
        async fn port_calls(&self, imo: &Imo, since: i64) -> Result<Vec<PortCall>, ProviderError> {
            self.enter()?;
            Ok(self
                .port_calls
                .lock()
                .unwrap()
                .get(imo.as_str())
                .map(|all| all.iter().filter(|c| c.arrived_at >= since).cloned().collect())
                .unwrap_or_default())
        }

        async fn zone_visits(&self, imo: &Imo, since: i64) -> Result<Vec<ZoneVisit>, ProviderError> {
            self.enter()?;
            Ok(self
                .zone_visits
                .lock()
                .unwrap()
                .get(imo.as_str())
                .map(|all| all.iter().filter(|v| v.entered_at >= since).cloned().collect())
                .unwrap_or_default())
        }
    }
}
