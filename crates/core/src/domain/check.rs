// Check catalogue

use crate::domain::error::DomainError;
use crate::domain::severity::{ScreeningStatus, Severity};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Company roles recorded against a ship
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompanyRole {
    RegisteredOwner,
    Operator,
    BeneficialOwner,
    ShipManager,
    TechnicalManager,
    DocCompany,
}

impl CompanyRole {
    pub const ALL: [CompanyRole; 6] = [
        CompanyRole::RegisteredOwner,
        CompanyRole::Operator,
        CompanyRole::BeneficialOwner,
        CompanyRole::ShipManager,
        CompanyRole::TechnicalManager,
        CompanyRole::DocCompany,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyRole::RegisteredOwner => "REGISTERED_OWNER",
            CompanyRole::Operator => "OPERATOR",
            CompanyRole::BeneficialOwner => "BENEFICIAL_OWNER",
            CompanyRole::ShipManager => "SHIP_MANAGER",
            CompanyRole::TechnicalManager => "TECHNICAL_MANAGER",
            CompanyRole::DocCompany => "DOC_COMPANY",
        }
    }
}

impl std::fmt::Display for CompanyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The independently scheduled checks that make up a screening
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckKind {
    ShipSanction,
    ShipFlag,
    ShipInspections,
    ShipAssociations,
    RegisteredOwnerSanction,
    OperatorSanction,
    BeneficialOwnerSanction,
    ShipManagerSanction,
    TechnicalManagerSanction,
    DocCompanySanction,
    RegisteredOwnerCountry,
    OperatorCountry,
    BeneficialOwnerCountry,
    ShipManagerCountry,
    TechnicalManagerCountry,
    DocCompanyCountry,
    PortVisits,
    ZoneVisits,
}

impl CheckKind {
    pub const ALL: [CheckKind; 18] = [
        CheckKind::ShipSanction,
        CheckKind::ShipFlag,
        CheckKind::ShipInspections,
        CheckKind::ShipAssociations,
        CheckKind::RegisteredOwnerSanction,
        CheckKind::OperatorSanction,
        CheckKind::BeneficialOwnerSanction,
        CheckKind::ShipManagerSanction,
        CheckKind::TechnicalManagerSanction,
        CheckKind::DocCompanySanction,
        CheckKind::RegisteredOwnerCountry,
        CheckKind::OperatorCountry,
        CheckKind::BeneficialOwnerCountry,
        CheckKind::ShipManagerCountry,
        CheckKind::TechnicalManagerCountry,
        CheckKind::DocCompanyCountry,
        CheckKind::PortVisits,
        CheckKind::ZoneVisits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::ShipSanction => "SHIP_SANCTION",
            CheckKind::ShipFlag => "SHIP_FLAG",
            CheckKind::ShipInspections => "SHIP_INSPECTIONS",
            CheckKind::ShipAssociations => "SHIP_ASSOCIATIONS",
            CheckKind::RegisteredOwnerSanction => "REGISTERED_OWNER_SANCTION",
            CheckKind::OperatorSanction => "OPERATOR_SANCTION",
            CheckKind::BeneficialOwnerSanction => "BENEFICIAL_OWNER_SANCTION",
            CheckKind::ShipManagerSanction => "SHIP_MANAGER_SANCTION",
            CheckKind::TechnicalManagerSanction => "TECHNICAL_MANAGER_SANCTION",
            CheckKind::DocCompanySanction => "DOC_COMPANY_SANCTION",
            CheckKind::RegisteredOwnerCountry => "REGISTERED_OWNER_COUNTRY",
            CheckKind::OperatorCountry => "OPERATOR_COUNTRY",
            CheckKind::BeneficialOwnerCountry => "BENEFICIAL_OWNER_COUNTRY",
            CheckKind::ShipManagerCountry => "SHIP_MANAGER_COUNTRY",
            CheckKind::TechnicalManagerCountry => "TECHNICAL_MANAGER_COUNTRY",
            CheckKind::DocCompanyCountry => "DOC_COMPANY_COUNTRY",
            CheckKind::PortVisits => "PORT_VISITS",
            CheckKind::ZoneVisits => "ZONE_VISITS",
        }
    }

    /// Sanction check for a company role
    pub fn sanction_for(role: CompanyRole) -> CheckKind {
        match role {
            CompanyRole::RegisteredOwner => CheckKind::RegisteredOwnerSanction,
            CompanyRole::Operator => CheckKind::OperatorSanction,
            CompanyRole::BeneficialOwner => CheckKind::BeneficialOwnerSanction,
            CompanyRole::ShipManager => CheckKind::ShipManagerSanction,
            CompanyRole::TechnicalManager => CheckKind::TechnicalManagerSanction,
            CompanyRole::DocCompany => CheckKind::DocCompanySanction,
        }
    }

    /// Country association check for a company role
    pub fn country_for(role: CompanyRole) -> CheckKind {
        match role {
            CompanyRole::RegisteredOwner => CheckKind::RegisteredOwnerCountry,
            CompanyRole::Operator => CheckKind::OperatorCountry,
            CompanyRole::BeneficialOwner => CheckKind::BeneficialOwnerCountry,
            CompanyRole::ShipManager => CheckKind::ShipManagerCountry,
            CompanyRole::TechnicalManager => CheckKind::TechnicalManagerCountry,
            CompanyRole::DocCompany => CheckKind::DocCompanyCountry,
        }
    }

    /// What the check evaluates
    pub fn rule(&self) -> CheckRule {
        match self {
            CheckKind::ShipSanction => CheckRule::ShipSanction,
            CheckKind::ShipFlag => CheckRule::ShipFlag,
            CheckKind::ShipInspections => CheckRule::ShipInspections,
            CheckKind::ShipAssociations => CheckRule::ShipAssociations,
            CheckKind::RegisteredOwnerSanction => {
                CheckRule::CompanySanction(CompanyRole::RegisteredOwner)
            }
            CheckKind::OperatorSanction => CheckRule::CompanySanction(CompanyRole::Operator),
            CheckKind::BeneficialOwnerSanction => {
                CheckRule::CompanySanction(CompanyRole::BeneficialOwner)
            }
            CheckKind::ShipManagerSanction => CheckRule::CompanySanction(CompanyRole::ShipManager),
            CheckKind::TechnicalManagerSanction => {
                CheckRule::CompanySanction(CompanyRole::TechnicalManager)
            }
            CheckKind::DocCompanySanction => CheckRule::CompanySanction(CompanyRole::DocCompany),
            CheckKind::RegisteredOwnerCountry => {
                CheckRule::CompanyCountry(CompanyRole::RegisteredOwner)
            }
            CheckKind::OperatorCountry => CheckRule::CompanyCountry(CompanyRole::Operator),
            CheckKind::BeneficialOwnerCountry => {
                CheckRule::CompanyCountry(CompanyRole::BeneficialOwner)
            }
            CheckKind::ShipManagerCountry => CheckRule::CompanyCountry(CompanyRole::ShipManager),
            CheckKind::TechnicalManagerCountry => {
                CheckRule::CompanyCountry(CompanyRole::TechnicalManager)
            }
            CheckKind::DocCompanyCountry => CheckRule::CompanyCountry(CompanyRole::DocCompany),
            CheckKind::PortVisits => CheckRule::PortVisits,
            CheckKind::ZoneVisits => CheckRule::ZoneVisits,
        }
    }

    /// Company role a check looks at, if any
    pub fn company_role(&self) -> Option<CompanyRole> {
        match self.rule() {
            CheckRule::CompanySanction(role) | CheckRule::CompanyCountry(role) => Some(role),
            _ => None,
        }
    }
}

/// Evaluation rule behind a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckRule {
    ShipSanction,
    ShipFlag,
    ShipInspections,
    ShipAssociations,
    CompanySanction(CompanyRole),
    CompanyCountry(CompanyRole),
    PortVisits,
    ZoneVisits,
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DomainError::UnknownVariant {
                kind: "check",
                value: s.to_string(),
            })
    }
}

/// State of one check inside a screening
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckState {
    pub status: ScreeningStatus,
    pub severity: Option<Severity>,
    pub result: Option<serde_json::Value>,
    pub updated_at: i64,
}

impl CheckState {
    pub fn created(now_millis: i64) -> Self {
        Self {
            status: ScreeningStatus::Created,
            severity: None,
            result: None,
            updated_at: now_millis,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == ScreeningStatus::Done
    }
}

/// Verdict produced by running a check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub severity: Severity,
    pub result: serde_json::Value,
}

impl CheckOutcome {
    pub fn new(severity: Severity, result: serde_json::Value) -> Self {
        Self { severity, result }
    }

    /// Outcome recorded when a check could not produce a verdict
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            severity: Severity::Unknown,
            result: serde_json::json!({ "error": reason.into() }),
        }
    }
}
