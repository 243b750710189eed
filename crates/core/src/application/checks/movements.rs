// Movement checks: port calls and zone visits within the lookback window

use crate::domain::{CheckOutcome, ScreeningPolicy, Severity, Ship};
use crate::port::{MovementsSource, ProviderError};
use serde_json::json;

pub(super) async fn port_visits(
    source: &dyn MovementsSource,
    policy: &ScreeningPolicy,
    ship: &Ship,
    now_millis: i64,
) -> Result<CheckOutcome, ProviderError> {
    let since = policy.movement_since(now_millis);
    let calls = source.port_calls(&ship.imo, since).await?;

    let flagged: Vec<_> = calls
        .iter()
        .filter(|c| c.arrived_at >= since)
        .map(|c| (c, policy.country_severity(&c.country)))
        .filter(|(_, severity)| *severity > Severity::Ok)
        .collect();

    let severity = Severity::aggregate(flagged.iter().map(|(_, s)| *s)).unwrap_or(Severity::Ok);

    Ok(CheckOutcome::new(
        severity,
        json!({
            "port_calls": calls.len(),
            "flagged": flagged
                .iter()
                .map(|(call, severity)| json!({
                    "port": call.port,
                    "country": call.country,
                    "arrived_at": call.arrived_at,
                    "severity": severity,
                }))
                .collect::<Vec<_>>(),
        }),
    ))
}

/// Highest configured severity among visited zones; unlisted zones are OK
pub(super) async fn zone_visits(
    source: &dyn MovementsSource,
    policy: &ScreeningPolicy,
    ship: &Ship,
    now_millis: i64,
) -> Result<CheckOutcome, ProviderError> {
    let since = policy.movement_since(now_millis);
    let visits = source.zone_visits(&ship.imo, since).await?;

    let flagged: Vec<_> = visits
        .iter()
        .filter(|v| v.exited_at.map_or(true, |exited| exited >= since))
        .map(|v| (v, policy.zone_severity(&v.zone)))
        .filter(|(_, severity)| *severity > Severity::Ok)
        .collect();

    let severity = Severity::aggregate(flagged.iter().map(|(_, s)| *s)).unwrap_or(Severity::Ok);

    Ok(CheckOutcome::new(
        severity,
        json!({
            "zone_visits": visits.len(),
            "flagged": flagged
                .iter()
                .map(|(visit, severity)| json!({
                    "zone": visit.zone,
                    "entered_at": visit.entered_at,
                    "severity": severity,
                }))
                .collect::<Vec<_>>(),
        }),
    ))
}
