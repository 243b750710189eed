// Country risk checks: flag state and company domicile

use crate::domain::{CheckOutcome, CompanyRole, ScreeningPolicy, Severity, Ship};
use serde_json::json;

pub(super) fn flag(policy: &ScreeningPolicy, ship: &Ship) -> CheckOutcome {
    match ship.flag.as_deref() {
        Some(code) => {
            let severity = policy.country_severity(code);
            CheckOutcome::new(severity, json!({ "flag": code }))
        }
        None => CheckOutcome::new(Severity::Unknown, json!({ "flag": null })),
    }
}

pub(super) fn company(policy: &ScreeningPolicy, ship: &Ship, role: CompanyRole) -> CheckOutcome {
    let Some(company) = ship.company(role) else {
        return CheckOutcome::new(Severity::Ok, json!({ "role": role.as_str(), "company": null }));
    };

    let severity = match company.country.as_deref() {
        Some(code) => policy.country_severity(code),
        None => Severity::Unknown,
    };

    CheckOutcome::new(
        severity,
        json!({
            "role": role.as_str(),
            "company": company.name,
            "country": company.country,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Company, Imo};

    fn ship(flag: Option<&str>) -> Ship {
        let mut ship = Ship::new(Imo::parse("9321483").unwrap(), "TEST", 0);
        ship.flag = flag.map(str::to_string);
        ship
    }

    #[test]
    fn test_flag_severity() {
        let policy = ScreeningPolicy::default();
        assert_eq!(flag(&policy, &ship(Some("KP"))).severity, Severity::Critical);
        assert_eq!(flag(&policy, &ship(Some("ru"))).severity, Severity::Warning);
        assert_eq!(flag(&policy, &ship(Some("MT"))).severity, Severity::Ok);
        assert_eq!(flag(&policy, &ship(None)).severity, Severity::Unknown);
    }

    #[test]
    fn test_company_country() {
        let policy = ScreeningPolicy::default();
        let mut s = ship(Some("MT"));

        // No company for the role
        let outcome = company(&policy, &s, CompanyRole::DocCompany);
        assert_eq!(outcome.severity, Severity::Ok);

        s.companies.insert(
            CompanyRole::DocCompany,
            Company {
                name: "Shadow Mgmt".to_string(),
                country: None,
            },
        );
        assert_eq!(
            company(&policy, &s, CompanyRole::DocCompany).severity,
            Severity::Unknown
        );

        s.companies.insert(
            CompanyRole::DocCompany,
            Company {
                name: "Shadow Mgmt".to_string(),
                country: Some("SY".to_string()),
            },
        );
        let outcome = company(&policy, &s, CompanyRole::DocCompany);
        assert_eq!(outcome.severity, Severity::Critical);
        assert_eq!(outcome.result["company"], "Shadow Mgmt");
    }
}
