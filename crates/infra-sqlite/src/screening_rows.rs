// Row mapping shared by the screening repository and the scheduling transaction

use crate::error::{corrupt, map_sqlx_error};
use shipscreen_core::domain::{
    CheckKind, CheckState, DomainError, HistoryEntry, Imo, Screening, ScreeningStatus, Severity,
    SeverityChange,
};
use shipscreen_core::error::Result;
use sqlx::SqliteConnection;
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, sqlx::FromRow)]
struct ScreeningRow {
    id: String,
    account_id: String,
    imo: String,
    status: String,
    severity: Option<String>,
    previous_severity: Option<String>,
    severity_change: Option<String>,
    created_at: i64,
    scheduled_at: Option<i64>,
    completed_at: Option<i64>,
    updated_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct CheckRow {
    kind: String,
    status: String,
    severity: Option<String>,
    result: Option<String>,
    updated_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct HistoryRow {
    screening_id: String,
    severity: Option<String>,
    severity_change: Option<String>,
    checks: String,
    completed_at: Option<i64>,
    recorded_at: i64,
}

fn parse_opt<T>(value: Option<String>) -> Result<Option<T>>
where
    T: FromStr<Err = DomainError>,
{
    Ok(value.map(|v| v.parse::<T>()).transpose()?)
}

impl HistoryRow {
    pub(crate) fn into_entry(self) -> Result<HistoryEntry> {
        Ok(HistoryEntry {
            screening_id: self.screening_id,
            severity: parse_opt::<Severity>(self.severity)?,
            severity_change: parse_opt::<SeverityChange>(self.severity_change)?,
            checks: serde_json::from_str(&self.checks)
                .map_err(|e| corrupt("screening_history.checks", e))?,
            completed_at: self.completed_at,
            recorded_at: self.recorded_at,
        })
    }
}

/// Load a screening with all its checks
pub(crate) async fn load_screening(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Screening>> {
    let row: Option<ScreeningRow> = sqlx::query_as("SELECT * FROM screenings WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    let Some(row) = row else {
        return Ok(None);
    };

    let check_rows: Vec<CheckRow> = sqlx::query_as(
        "SELECT kind, status, severity, result, updated_at FROM screening_checks WHERE screening_id = ?",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    let mut checks = BTreeMap::new();
    for check in check_rows {
        let kind: CheckKind = check.kind.parse()?;
        let result = check
            .result
            .map(|r| serde_json::from_str(&r))
            .transpose()
            .map_err(|e| corrupt("screening_checks.result", e))?;
        checks.insert(
            kind,
            CheckState {
                status: check.status.parse::<ScreeningStatus>()?,
                severity: parse_opt::<Severity>(check.severity)?,
                result,
                updated_at: check.updated_at,
            },
        );
    }

    let imo = Imo::parse(&row.imo).map_err(|e| corrupt("screenings.imo", e))?;

    Ok(Some(Screening {
        id: row.id,
        account_id: row.account_id,
        imo,
        status: row.status.parse()?,
        severity: parse_opt::<Severity>(row.severity)?,
        previous_severity: parse_opt::<Severity>(row.previous_severity)?,
        severity_change: parse_opt::<SeverityChange>(row.severity_change)?,
        checks,
        created_at: row.created_at,
        scheduled_at: row.scheduled_at,
        completed_at: row.completed_at,
        updated_at: row.updated_at,
    }))
}

/// Insert the screening row; fails on a duplicate id or (account, imo)
pub(crate) async fn insert_screening_row(
    conn: &mut SqliteConnection,
    screening: &Screening,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO screenings (
            id, account_id, imo, status, severity, previous_severity, severity_change,
            created_at, scheduled_at, completed_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&screening.id)
    .bind(&screening.account_id)
    .bind(screening.imo.as_str())
    .bind(screening.status.as_str())
    .bind(screening.severity.map(|s| s.as_str()))
    .bind(screening.previous_severity.map(|s| s.as_str()))
    .bind(screening.severity_change.map(|s| s.as_str()))
    .bind(screening.created_at)
    .bind(screening.scheduled_at)
    .bind(screening.completed_at)
    .bind(screening.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Write the aggregate row and every check of an existing screening
pub(crate) async fn save_screening(
    conn: &mut SqliteConnection,
    screening: &Screening,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE screenings
        SET status = ?, severity = ?, previous_severity = ?, severity_change = ?,
            scheduled_at = ?, completed_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(screening.status.as_str())
    .bind(screening.severity.map(|s| s.as_str()))
    .bind(screening.previous_severity.map(|s| s.as_str()))
    .bind(screening.severity_change.map(|s| s.as_str()))
    .bind(screening.scheduled_at)
    .bind(screening.completed_at)
    .bind(screening.updated_at)
    .bind(&screening.id)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    save_checks(conn, screening).await
}

pub(crate) async fn save_checks(conn: &mut SqliteConnection, screening: &Screening) -> Result<()> {
    for (kind, state) in &screening.checks {
        sqlx::query(
            r#"
            INSERT INTO screening_checks (screening_id, kind, status, severity, result, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (screening_id, kind) DO UPDATE SET
                status = excluded.status,
                severity = excluded.severity,
                result = excluded.result,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&screening.id)
        .bind(kind.as_str())
        .bind(state.status.as_str())
        .bind(state.severity.map(|s| s.as_str()))
        .bind(state.result.as_ref().map(|r| r.to_string()))
        .bind(state.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    }
    Ok(())
}

pub(crate) async fn insert_history(conn: &mut SqliteConnection, entry: &HistoryEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO screening_history (
            screening_id, severity, severity_change, checks, completed_at, recorded_at
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.screening_id)
    .bind(entry.severity.map(|s| s.as_str()))
    .bind(entry.severity_change.map(|s| s.as_str()))
    .bind(serde_json::to_string(&entry.checks)?)
    .bind(entry.completed_at)
    .bind(entry.recorded_at)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

/// Take SQLite's write lock before reading, the analog of `SELECT .. FOR UPDATE`.
/// Returns false when the screening does not exist.
pub(crate) async fn lock_screening_row(conn: &mut SqliteConnection, id: &str) -> Result<bool> {
    let touched = sqlx::query("UPDATE screenings SET updated_at = updated_at WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(touched.rows_affected() > 0)
}
