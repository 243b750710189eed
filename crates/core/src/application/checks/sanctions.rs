// Sanctions checks: the ship, its companies and associated ships

use crate::domain::{CheckOutcome, CompanyRole, Imo, Severity, Ship};
use crate::port::{ProviderError, SanctionsSource};
use futures::future::try_join_all;
use serde_json::json;

pub(super) async fn ship(
    source: &dyn SanctionsSource,
    ship: &Ship,
) -> Result<CheckOutcome, ProviderError> {
    let hits = source.ship_sanctions(&ship.imo).await?;
    let severity = if hits.is_empty() {
        Severity::Ok
    } else {
        Severity::Critical
    };
    Ok(CheckOutcome::new(severity, json!({ "hits": hits })))
}

pub(super) async fn company(
    source: &dyn SanctionsSource,
    ship: &Ship,
    role: CompanyRole,
) -> Result<CheckOutcome, ProviderError> {
    let Some(company) = ship.company(role) else {
        return Ok(CheckOutcome::new(
            Severity::Ok,
            json!({ "role": role.as_str(), "company": null }),
        ));
    };

    let hits = source.company_sanctions(&company.name).await?;
    let severity = if hits.is_empty() {
        Severity::Ok
    } else {
        Severity::Critical
    };
    Ok(CheckOutcome::new(
        severity,
        json!({ "role": role.as_str(), "company": company.name, "hits": hits }),
    ))
}

/// WARNING when any associated ship is sanctioned
pub(super) async fn associations(
    source: &dyn SanctionsSource,
    ship: &Ship,
) -> Result<CheckOutcome, ProviderError> {
    let lookups = ship.associated_imos.iter().map(|imo| async move {
        let hits = source.ship_sanctions(imo).await?;
        Ok::<(&Imo, bool), ProviderError>((imo, !hits.is_empty()))
    });

    let sanctioned: Vec<&Imo> = try_join_all(lookups)
        .await?
        .into_iter()
        .filter_map(|(imo, hit)| hit.then_some(imo))
        .collect();

    let severity = if sanctioned.is_empty() {
        Severity::Ok
    } else {
        Severity::Warning
    };
    Ok(CheckOutcome::new(
        severity,
        json!({
            "associated": ship.associated_imos.len(),
            "sanctioned": sanctioned,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::sources::MockSanctionsSource;
    use crate::port::SanctionHit;

    fn hit(entity: &str) -> SanctionHit {
        SanctionHit {
            list: "OFAC SDN".to_string(),
            entity: entity.to_string(),
            listed_on: Some("2022-03-15".to_string()),
        }
    }

    fn test_ship() -> Ship {
        let mut s = Ship::new(Imo::parse("9074729").unwrap(), "NORDIC STAR", 0);
        s.associated_imos = vec![
            Imo::parse("9321483").unwrap(),
            Imo::parse("9176187").unwrap(),
        ];
        s
    }

    #[tokio::test]
    async fn test_ship_hit_is_critical() {
        let mut source = MockSanctionsSource::new();
        source
            .expect_ship_sanctions()
            .times(1)
            .returning(|imo| Ok(vec![hit(imo.as_str())]));

        let outcome = ship(&source, &test_ship()).await.unwrap();
        assert_eq!(outcome.severity, Severity::Critical);
        assert_eq!(outcome.result["hits"][0]["list"], "OFAC SDN");
    }

    #[tokio::test]
    async fn test_missing_company_is_ok_without_lookup() {
        let source = MockSanctionsSource::new();
        let outcome = company(&source, &test_ship(), CompanyRole::BeneficialOwner)
            .await
            .unwrap();
        assert_eq!(outcome.severity, Severity::Ok);
    }

    #[tokio::test]
    async fn test_sanctioned_associate_is_warning() {
        let mut source = MockSanctionsSource::new();
        source.expect_ship_sanctions().times(2).returning(|imo| {
            if imo.as_str() == "9176187" {
                Ok(vec![hit(imo.as_str())])
            } else {
                Ok(vec![])
            }
        });

        let outcome = associations(&source, &test_ship()).await.unwrap();
        assert_eq!(outcome.severity, Severity::Warning);
        assert_eq!(outcome.result["sanctioned"], json!(["9176187"]));
    }

    #[tokio::test]
    async fn test_no_associates_is_ok() {
        let source = MockSanctionsSource::new();
        let s = Ship::new(Imo::parse("9074729").unwrap(), "ALONE", 0);
        let outcome = associations(&source, &s).await.unwrap();
        assert_eq!(outcome.severity, Severity::Ok);
    }
}
