// SQLite ShipRepository Implementation

use crate::error::{corrupt, map_sqlx_error};
use async_trait::async_trait;
use shipscreen_core::domain::{Imo, Ship};
use shipscreen_core::error::Result;
use shipscreen_core::port::ShipRepository;
use sqlx::{SqliteConnection, SqlitePool};

pub struct SqliteShipRepository {
    pool: SqlitePool,
}

impl SqliteShipRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShipRow {
    imo: String,
    name: String,
    flag: Option<String>,
    companies: String,
    associated_imos: String,
    updated_at: i64,
}

impl ShipRow {
    fn into_ship(self) -> Result<Ship> {
        Ok(Ship {
            imo: Imo::parse(&self.imo).map_err(|e| corrupt("ships.imo", e))?,
            name: self.name,
            flag: self.flag,
            companies: serde_json::from_str(&self.companies)
                .map_err(|e| corrupt("ships.companies", e))?,
            associated_imos: serde_json::from_str(&self.associated_imos)
                .map_err(|e| corrupt("ships.associated_imos", e))?,
            updated_at: self.updated_at,
        })
    }
}

async fn load(conn: &mut SqliteConnection, imo: &Imo) -> Result<Option<Ship>> {
    let row: Option<ShipRow> = sqlx::query_as("SELECT * FROM ships WHERE imo = ?")
        .bind(imo.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    row.map(ShipRow::into_ship).transpose()
}

#[async_trait]
impl ShipRepository for SqliteShipRepository {
    async fn upsert(&self, ship: &Ship) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Write first so a concurrent upsert of the same ship waits for us
        sqlx::query("UPDATE ships SET updated_at = updated_at WHERE imo = ?")
            .bind(ship.imo.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let changed = match load(&mut *tx, &ship.imo).await? {
            Some(existing) => existing.differs_from(ship),
            None => true,
        };

        if changed {
            sqlx::query(
                r#"
                INSERT INTO ships (imo, name, flag, companies, associated_imos, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT (imo) DO UPDATE SET
                    name = excluded.name,
                    flag = excluded.flag,
                    companies = excluded.companies,
                    associated_imos = excluded.associated_imos,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(ship.imo.as_str())
            .bind(&ship.name)
            .bind(&ship.flag)
            .bind(serde_json::to_string(&ship.companies)?)
            .bind(serde_json::to_string(&ship.associated_imos)?)
            .bind(ship.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(changed)
    }

    async fn find_by_imo(&self, imo: &Imo) -> Result<Option<Ship>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        load(&mut *conn, imo).await
    }
}
