// Ship master data use cases

use crate::application::screening::validate::validate_country_code;
use crate::application::screening::ScreeningService;
use crate::domain::{Imo, Ship};
use crate::error::{AppError, Result};
use crate::port::{ShipRepository, TimeProvider};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

const MAX_NAME_LEN: usize = 256;

/// Result of a ship upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub changed: bool,
    /// Screenings scheduled because of the change
    pub rescheduled: usize,
}

pub struct ShipService {
    ships: Arc<dyn ShipRepository>,
    screening_service: Arc<ScreeningService>,
    time_provider: Arc<dyn TimeProvider>,
}

impl ShipService {
    pub fn new(
        ships: Arc<dyn ShipRepository>,
        screening_service: Arc<ScreeningService>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            ships,
            screening_service,
            time_provider,
        }
    }

    /// Store a ship; a change re-screens every screening of the ship
    pub async fn upsert(&self, mut ship: Ship) -> Result<UpsertOutcome> {
        validate_ship(&ship)?;
        ship.updated_at = self.time_provider.now_millis();

        let changed = self.ships.upsert(&ship).await?;
        let rescheduled = if changed {
            self.screening_service.rescreen_ship(&ship.imo).await?
        } else {
            0
        };

        info!(imo = %ship.imo, changed, rescheduled, "Ship upserted");
        Ok(UpsertOutcome {
            changed,
            rescheduled,
        })
    }

    pub async fn get(&self, imo: &Imo) -> Result<Ship> {
        self.ships
            .find_by_imo(imo)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("ship {}", imo)))
    }
}

fn validate_ship(ship: &Ship) -> Result<()> {
    if ship.name.trim().is_empty() {
        return Err(AppError::Validation("ship name cannot be empty".to_string()));
    }
    if ship.name.len() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "ship name too long (max {} chars)",
            MAX_NAME_LEN
        )));
    }
    if let Some(flag) = &ship.flag {
        validate_country_code("flag", flag)?;
    }
    for (role, company) in &ship.companies {
        if company.name.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "{} company name cannot be empty",
                role.as_str()
            )));
        }
        if let Some(country) = &company.country {
            validate_country_code(role.as_str(), country)?;
        }
    }
    if ship.associated_imos.contains(&ship.imo) {
        return Err(AppError::Validation(
            "a ship cannot be associated with itself".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Company, CompanyRole};

    fn ship() -> Ship {
        let mut ship = Ship::new(Imo::parse("9074729").unwrap(), "NORDIC STAR", 0);
        ship.flag = Some("MT".to_string());
        ship
    }

    #[test]
    fn test_valid_ship() {
        assert!(validate_ship(&ship()).is_ok());
    }

    #[test]
    fn test_rejects_bad_fields() {
        let mut s = ship();
        s.name = " ".to_string();
        assert!(validate_ship(&s).is_err());

        let mut s = ship();
        s.flag = Some("MLT".to_string());
        assert!(validate_ship(&s).is_err());

        let mut s = ship();
        s.companies.insert(
            CompanyRole::Operator,
            Company {
                name: "Op".to_string(),
                country: Some("X".to_string()),
            },
        );
        assert!(validate_ship(&s).is_err());

        let mut s = ship();
        s.associated_imos.push(s.imo.clone());
        assert!(validate_ship(&s).is_err());
    }
}
