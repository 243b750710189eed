// Port state control inspection check

use crate::domain::{CheckOutcome, ScreeningPolicy, Ship};
use crate::port::{InspectionsSource, ProviderError};
use serde_json::json;

/// Grade detentions within the lookback window
pub(super) async fn detentions(
    source: &dyn InspectionsSource,
    policy: &ScreeningPolicy,
    ship: &Ship,
    now_millis: i64,
) -> Result<CheckOutcome, ProviderError> {
    let since = policy.inspection_since(now_millis);
    let inspections = source.inspections(&ship.imo, since).await?;

    let detained: Vec<_> = inspections
        .iter()
        .filter(|i| i.detained && i.inspected_at >= since)
        .collect();

    Ok(CheckOutcome::new(
        policy.detention_severity(detained.len()),
        json!({
            "inspections": inspections.len(),
            "detentions": detained.len(),
            "detained": detained,
        }),
    ))
}
