use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use tracing::instrument;

use bloodbank_core::{BloodGroup, DomainResult};
use bloodbank_inventory::{LedgerEntry, MAX_UNITS, ensure_positive_units};

use super::{PostgresStore, map_sqlx_error, parse_column, units_from_db, units_to_db};
use crate::store::{InventoryLedger, StoreError, StoreResult};

/// Conditional updates retried after the row changed between the miss and the re-read.
const MAX_ATTEMPTS: usize = 3;

const RESERVE_SQL: &str = r#"
    UPDATE blood_inventory
    SET available_units = available_units - $2,
        reserved_units = reserved_units + $2,
        last_updated = NOW()
    WHERE blood_group = $1
      AND available_units >= $2
      AND reserved_units <= $3 - $2
    RETURNING blood_group, available_units, reserved_units, last_updated
"#;

const RELEASE_SQL: &str = r#"
    UPDATE blood_inventory
    SET reserved_units = reserved_units - $2,
        available_units = available_units + $2,
        last_updated = NOW()
    WHERE blood_group = $1
      AND reserved_units >= $2
      AND available_units <= $3 - $2
    RETURNING blood_group, available_units, reserved_units, last_updated
"#;

const ADD_SQL: &str = r#"
    UPDATE blood_inventory
    SET available_units = available_units + $2,
        last_updated = NOW()
    WHERE blood_group = $1
      AND available_units <= $3 - $2
    RETURNING blood_group, available_units, reserved_units, last_updated
"#;

type LedgerOp = fn(&mut LedgerEntry, u32, DateTime<Utc>) -> DomainResult<()>;

pub(super) fn ledger_entry_from_row(row: &PgRow) -> StoreResult<LedgerEntry> {
    let blood_group: String = row.try_get("blood_group")?;
    Ok(LedgerEntry::from_storage(
        parse_column::<BloodGroup>(&blood_group, "blood_inventory.blood_group")?,
        units_from_db(row.try_get("available_units")?, "available_units")?,
        units_from_db(row.try_get("reserved_units")?, "reserved_units")?,
        row.try_get("last_updated")?,
    ))
}

impl PostgresStore {
    /// Run a guarded counter update. On a miss the current row is re-read and
    /// the domain operation replayed on it to report the precise failure.
    async fn guarded_update(
        &self,
        operation: &'static str,
        sql: &'static str,
        blood_group: BloodGroup,
        units: u32,
        replay: LedgerOp,
    ) -> StoreResult<LedgerEntry> {
        ensure_positive_units(units)?;
        let units_db = units_to_db(units)?;
        let max_db = units_to_db(MAX_UNITS)?;

        for attempt in 1..=MAX_ATTEMPTS {
            let row = sqlx::query(sql)
                .bind(blood_group.as_str())
                .bind(units_db)
                .bind(max_db)
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error(operation, e))?;
            if let Some(row) = row {
                return ledger_entry_from_row(&row);
            }

            let mut current = self.fetch_entry(blood_group).await?;
            replay(&mut current, units, Utc::now())?;
            tracing::debug!(operation, %blood_group, attempt, "ledger row changed under guarded update");
        }
        Err(StoreError::Contention(format!("{operation} {blood_group}")))
    }

    async fn fetch_entry(&self, blood_group: BloodGroup) -> StoreResult<LedgerEntry> {
        let row = sqlx::query(
            r#"
            SELECT blood_group, available_units, reserved_units, last_updated
            FROM blood_inventory
            WHERE blood_group = $1
            "#,
        )
        .bind(blood_group.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_inventory", e))?;
        match row {
            Some(row) => ledger_entry_from_row(&row),
            None => Err(LedgerEntry::not_found().into()),
        }
    }
}

#[async_trait]
impl InventoryLedger for PostgresStore {
    #[instrument(skip(self), fields(blood_group = %blood_group), err)]
    async fn reserve(&self, blood_group: BloodGroup, units: u32) -> StoreResult<LedgerEntry> {
        self.guarded_update("reserve", RESERVE_SQL, blood_group, units, LedgerEntry::reserve)
            .await
    }

    #[instrument(skip(self), fields(blood_group = %blood_group), err)]
    async fn release(&self, blood_group: BloodGroup, units: u32) -> StoreResult<LedgerEntry> {
        self.guarded_update("release", RELEASE_SQL, blood_group, units, LedgerEntry::release)
            .await
    }

    #[instrument(skip(self), fields(blood_group = %blood_group), err)]
    async fn add(&self, blood_group: BloodGroup, units: u32) -> StoreResult<LedgerEntry> {
        self.guarded_update("add", ADD_SQL, blood_group, units, LedgerEntry::add)
            .await
    }

    #[instrument(skip(self), fields(blood_group = %blood_group), err)]
    async fn set_counts(&self, blood_group: BloodGroup, available: u32, reserved: u32) -> StoreResult<LedgerEntry> {
        // Bounds check only; the row itself is overwritten below.
        LedgerEntry::new(blood_group, available, reserved, Utc::now())?;

        let row = sqlx::query(
            r#"
            UPDATE blood_inventory
            SET available_units = $2, reserved_units = $3, last_updated = NOW()
            WHERE blood_group = $1
            RETURNING blood_group, available_units, reserved_units, last_updated
            "#,
        )
        .bind(blood_group.as_str())
        .bind(units_to_db(available)?)
        .bind(units_to_db(reserved)?)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_counts", e))?;
        match row {
            Some(row) => ledger_entry_from_row(&row),
            None => Err(LedgerEntry::not_found().into()),
        }
    }

    #[instrument(skip(self), fields(blood_group = %blood_group), err)]
    async fn initialize(&self, blood_group: BloodGroup, available: u32, reserved: u32) -> StoreResult<LedgerEntry> {
        LedgerEntry::new(blood_group, available, reserved, Utc::now())?;

        let row = sqlx::query(
            r#"
            INSERT INTO blood_inventory (blood_group, available_units, reserved_units)
            VALUES ($1, $2, $3)
            ON CONFLICT (blood_group) DO NOTHING
            RETURNING blood_group, available_units, reserved_units, last_updated
            "#,
        )
        .bind(blood_group.as_str())
        .bind(units_to_db(available)?)
        .bind(units_to_db(reserved)?)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("initialize", e))?;
        match row {
            Some(row) => ledger_entry_from_row(&row),
            None => Err(LedgerEntry::already_initialized().into()),
        }
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> StoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT blood_group, available_units, reserved_units, last_updated
            FROM blood_inventory
            ORDER BY blood_group COLLATE "C"
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_inventory", e))?;

        rows.iter().map(ledger_entry_from_row).collect()
    }

    #[instrument(skip(self), fields(blood_group = %blood_group), err)]
    async fn get(&self, blood_group: BloodGroup) -> StoreResult<LedgerEntry> {
        self.fetch_entry(blood_group).await
    }
}
