// Check runner: evaluates one check of a ship against master data and providers

mod countries;
mod inspections;
mod movements;
mod sanctions;

use crate::domain::{CheckKind, CheckOutcome, CheckRule, ScreeningPolicy, Ship};
use crate::port::{InspectionsSource, MovementsSource, ProviderError, SanctionsSource, TimeProvider};
use std::sync::Arc;
use tracing::debug;

pub struct CheckRunner {
    sanctions: Arc<dyn SanctionsSource>,
    inspections: Arc<dyn InspectionsSource>,
    movements: Arc<dyn MovementsSource>,
    policy: Arc<ScreeningPolicy>,
    time_provider: Arc<dyn TimeProvider>,
}

impl CheckRunner {
    pub fn new(
        sanctions: Arc<dyn SanctionsSource>,
        inspections: Arc<dyn InspectionsSource>,
        movements: Arc<dyn MovementsSource>,
        policy: Arc<ScreeningPolicy>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            sanctions,
            inspections,
            movements,
            policy,
            time_provider,
        }
    }

    /// Evaluate a single check. Provider failures are returned as-is so the
    /// caller can decide whether to retry.
    pub async fn run(&self, kind: CheckKind, ship: &Ship) -> Result<CheckOutcome, ProviderError> {
        let now = self.time_provider.now_millis();

        let outcome = match kind.rule() {
            CheckRule::ShipSanction => sanctions::ship(self.sanctions.as_ref(), ship).await?,
            CheckRule::ShipFlag => countries::flag(&self.policy, ship),
            CheckRule::ShipInspections => {
                inspections::detentions(self.inspections.as_ref(), &self.policy, ship, now).await?
            }
            CheckRule::ShipAssociations => {
                sanctions::associations(self.sanctions.as_ref(), ship).await?
            }
            CheckRule::CompanySanction(role) => {
                sanctions::company(self.sanctions.as_ref(), ship, role).await?
            }
            CheckRule::CompanyCountry(role) => countries::company(&self.policy, ship, role),
            CheckRule::PortVisits => {
                movements::port_visits(self.movements.as_ref(), &self.policy, ship, now).await?
            }
            CheckRule::ZoneVisits => {
                movements::zone_visits(self.movements.as_ref(), &self.policy, ship, now).await?
            }
        };

        debug!(imo = %ship.imo, check = %kind, severity = %outcome.severity, "Check evaluated");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Company, CompanyRole, Imo, Severity};
    use crate::port::sources::{MockInspectionsSource, MockMovementsSource, MockSanctionsSource};
    use crate::port::time_provider::mocks::ManualClock;

    fn runner(
        sanctions: MockSanctionsSource,
        inspections: MockInspectionsSource,
        movements: MockMovementsSource,
    ) -> CheckRunner {
        CheckRunner::new(
            Arc::new(sanctions),
            Arc::new(inspections),
            Arc::new(movements),
            Arc::new(ScreeningPolicy::default()),
            Arc::new(ManualClock::new(1_700_000_000_000)),
        )
    }

    fn ship() -> Ship {
        let mut ship = Ship::new(Imo::parse("9074729").unwrap(), "NORDIC STAR", 0);
        ship.flag = Some("IR".to_string());
        ship.companies.insert(
            CompanyRole::Operator,
            Company {
                name: "Blue Ocean Ltd".to_string(),
                country: Some("PA".to_string()),
            },
        );
        ship
    }

    #[tokio::test]
    async fn test_local_checks_never_call_providers() {
        // No expectations set: any provider call would panic
        let runner = runner(
            MockSanctionsSource::new(),
            MockInspectionsSource::new(),
            MockMovementsSource::new(),
        );

        let flag = runner.run(CheckKind::ShipFlag, &ship()).await.unwrap();
        assert_eq!(flag.severity, Severity::Critical);

        let country = runner.run(CheckKind::OperatorCountry, &ship()).await.unwrap();
        assert_eq!(country.severity, Severity::Ok);
    }

    #[tokio::test]
    async fn test_company_sanction_queries_company_name() {
        let mut sanctions = MockSanctionsSource::new();
        sanctions
            .expect_company_sanctions()
            .withf(|name| name.to_string() == "Blue Ocean Ltd")
            .times(1)
            .returning(|_| Ok(vec![]));

        let runner = runner(sanctions, MockInspectionsSource::new(), MockMovementsSource::new());
        let outcome = runner.run(CheckKind::OperatorSanction, &ship()).await.unwrap();
        assert_eq!(outcome.severity, Severity::Ok);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let mut movements = MockMovementsSource::new();
        movements
            .expect_port_calls()
            .returning(|_, _| Err(ProviderError::RateLimited));

        let runner = runner(MockSanctionsSource::new(), MockInspectionsSource::new(), movements);
        let err = runner.run(CheckKind::PortVisits, &ship()).await.unwrap_err();
        assert_eq!(err, ProviderError::RateLimited);
    }
}
