// Ship master data

use crate::domain::check::CompanyRole;
use crate::domain::imo::Imo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Company recorded against a ship in one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    /// ISO 3166-1 alpha-2 country of domicile
    #[serde(default)]
    pub country: Option<String>,
}

/// Ship master data record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub imo: Imo,
    pub name: String,
    /// ISO 3166-1 alpha-2 flag state
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(default)]
    pub companies: BTreeMap<CompanyRole, Company>,
    /// Other ships known to share ownership or management
    #[serde(default)]
    pub associated_imos: Vec<Imo>,
    #[serde(default)]
    pub updated_at: i64,
}

impl Ship {
    pub fn new(imo: Imo, name: impl Into<String>, updated_at: i64) -> Self {
        Self {
            imo,
            name: name.into(),
            flag: None,
            companies: BTreeMap::new(),
            associated_imos: Vec::new(),
            updated_at,
        }
    }

    pub fn company(&self, role: CompanyRole) -> Option<&Company> {
        self.companies.get(&role)
    }

    /// True when anything a screening looks at differs between the two records
    pub fn differs_from(&self, other: &Ship) -> bool {
        self.imo != other.imo
            || self.name != other.name
            || self.flag != other.flag
            || self.companies != other.companies
            || self.associated_imos != other.associated_imos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ship() -> Ship {
        let mut ship = Ship::new(Imo::parse("9074729").unwrap(), "NORTHERN STAR", 1000);
        ship.flag = Some("PA".to_string());
        ship.companies.insert(
            CompanyRole::Operator,
            Company {
                name: "Blue Ocean Shipping".to_string(),
                country: Some("GR".to_string()),
            },
        );
        ship
    }

    #[test]
    fn test_timestamp_alone_is_not_a_change() {
        let a = ship();
        let mut b = ship();
        b.updated_at = 99_000;
        assert!(!a.differs_from(&b));
    }

    #[test]
    fn test_company_change_is_a_change() {
        let a = ship();
        let mut b = ship();
        b.companies.get_mut(&CompanyRole::Operator).unwrap().country = Some("IR".to_string());
        assert!(a.differs_from(&b));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let ship: Ship = serde_json::from_value(serde_json::json!({
            "imo": "9321483",
            "name": "MINIMAL",
            "companies": {
                "REGISTERED_OWNER": { "name": "Owner Ltd" }
            }
        }))
        .unwrap();
        assert_eq!(ship.flag, None);
        assert_eq!(
            ship.company(CompanyRole::RegisteredOwner).unwrap().name,
            "Owner Ltd"
        );
        assert!(ship.associated_imos.is_empty());
    }
}
