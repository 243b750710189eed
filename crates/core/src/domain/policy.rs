// Screening policy: thresholds and country/zone risk ratings

use crate::domain::severity::Severity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Tunables of the check rules, loaded from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningPolicy {
    /// ISO alpha-2 codes rated CRITICAL
    pub sanctioned_countries: BTreeSet<String>,
    /// ISO alpha-2 codes rated WARNING
    pub high_risk_countries: BTreeSet<String>,
    /// Zone name to severity; unlisted zones are OK
    pub zone_severities: BTreeMap<String, Severity>,
    pub inspection_lookback_days: i64,
    pub detention_warning_threshold: usize,
    pub detention_critical_threshold: usize,
    pub movement_lookback_days: i64,
}

impl Default for ScreeningPolicy {
    fn default() -> Self {
        let codes = |list: &[&str]| list.iter().map(|c| c.to_string()).collect();
        Self {
            sanctioned_countries: codes(&["CU", "IR", "KP", "SY"]),
            high_risk_countries: codes(&["BY", "MM", "RU", "VE"]),
            zone_severities: BTreeMap::new(),
            inspection_lookback_days: 730,
            detention_warning_threshold: 1,
            detention_critical_threshold: 2,
            movement_lookback_days: 365,
        }
    }
}

impl ScreeningPolicy {
    /// Risk rating of a country code (case-insensitive)
    pub fn country_severity(&self, code: &str) -> Severity {
        let code = code.trim().to_ascii_uppercase();
        if self.sanctioned_countries.contains(&code) {
            Severity::Critical
        } else if self.high_risk_countries.contains(&code) {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }

    pub fn zone_severity(&self, zone: &str) -> Severity {
        self.zone_severities
            .get(zone)
            .copied()
            .unwrap_or(Severity::Ok)
    }

    pub fn detention_severity(&self, detentions: usize) -> Severity {
        if detentions >= self.detention_critical_threshold {
            Severity::Critical
        } else if detentions >= self.detention_warning_threshold {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }

    pub fn inspection_since(&self, now_millis: i64) -> i64 {
        now_millis - self.inspection_lookback_days * DAY_MS
    }

    pub fn movement_since(&self, now_millis: i64) -> i64 {
        now_millis - self.movement_lookback_days * DAY_MS
    }
}
