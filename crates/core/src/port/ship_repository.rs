// Ship Repository Port

use crate::domain::{Imo, Ship};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ShipRepository: Send + Sync {
    /// Insert or replace a ship. Returns true when the stored record changed
    /// in a way screenings care about (see `Ship::differs_from`).
    async fn upsert(&self, ship: &Ship) -> Result<bool>;

    async fn find_by_imo(&self, imo: &Imo) -> Result<Option<Ship>>;
}
