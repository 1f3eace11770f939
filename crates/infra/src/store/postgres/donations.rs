use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use tracing::instrument;

use bloodbank_core::{BloodGroup, DonationId, RequestId, UserId};
use bloodbank_directory::{BloodRequest, User};
use bloodbank_donations::{
    DonationRecord, DonationStatistics, DonationStatus, DonationView, MismatchOutcome, MismatchPolicy,
    ScheduleDonation, check_donor_blood_group,
};
use bloodbank_inventory::LedgerEntry;

use super::inventory::ledger_entry_from_row;
use super::{PostgresStore, map_sqlx_error, parse_column, units_from_db, units_to_db};
use crate::store::{DonationRecorder, StoreResult};

const DONATION_COLUMNS: &str = r#"
    d.id, d.donor_id, d.request_id, d.donation_date, d.blood_group, d.units_donated,
    d.donation_center, d.notes, d.status, d.created_at, d.updated_at
"#;

const VIEW_JOINS: &str = r#"
    u.name AS donor_name, u.email AS donor_email, u.phone AS donor_phone,
    br.patient_name, br.hospital_name
    FROM donations d
    LEFT JOIN users u ON u.id = d.donor_id
    LEFT JOIN blood_requests br ON br.id = d.request_id
"#;

fn donation_from_row(row: &PgRow) -> StoreResult<DonationRecord> {
    let blood_group: String = row.try_get("blood_group")?;
    let status: String = row.try_get("status")?;
    Ok(DonationRecord {
        id: DonationId::new(row.try_get("id")?),
        donor_id: UserId::new(row.try_get("donor_id")?),
        request_id: row.try_get::<Option<i64>, _>("request_id")?.map(RequestId::new),
        donation_date: row.try_get("donation_date")?,
        blood_group: parse_column::<BloodGroup>(&blood_group, "donations.blood_group")?,
        units_donated: units_from_db(row.try_get("units_donated")?, "units_donated")?,
        donation_center: row.try_get("donation_center")?,
        notes: row.try_get("notes")?,
        status: parse_column::<DonationStatus>(&status, "donations.status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn donation_view_from_row(row: &PgRow) -> StoreResult<DonationView> {
    Ok(DonationView {
        donation: donation_from_row(row)?,
        donor_name: row.try_get("donor_name")?,
        donor_email: row.try_get("donor_email")?,
        donor_phone: row.try_get("donor_phone")?,
        patient_name: row.try_get("patient_name")?,
        hospital_name: row.try_get("hospital_name")?,
    })
}

impl PostgresStore {
    async fn views(&self, operation: &'static str, filter: &str, bind: ViewFilter) -> StoreResult<Vec<DonationView>> {
        let sql = format!("SELECT {DONATION_COLUMNS}, {VIEW_JOINS} {filter}");
        let query = sqlx::query(&sql);
        let query = match bind {
            ViewFilter::None => query,
            ViewFilter::Donor(id) => query.bind(id.get()),
            ViewFilter::BloodGroup(group) => query.bind(group.as_str()),
        };
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        rows.iter().map(donation_view_from_row).collect()
    }
}

enum ViewFilter {
    None,
    Donor(UserId),
    BloodGroup(BloodGroup),
}

/// Lock and load a donation inside `tx`.
async fn lock_donation(tx: &mut Transaction<'_, Postgres>, id: DonationId) -> StoreResult<DonationRecord> {
    let sql = format!("SELECT {DONATION_COLUMNS} FROM donations d WHERE d.id = $1 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(id.get())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_donation", e))?;
    match row {
        Some(row) => donation_from_row(&row),
        None => Err(DonationRecord::not_found().into()),
    }
}

async fn write_status(tx: &mut Transaction<'_, Postgres>, record: &DonationRecord) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE donations
        SET status = $2, notes = $3, updated_at = $4
        WHERE id = $1
        "#,
    )
    .bind(record.id.get())
    .bind(record.status.as_str())
    .bind(&record.notes)
    .bind(record.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("write_donation_status", e))?;
    Ok(())
}

#[async_trait]
impl DonationRecorder for PostgresStore {
    #[instrument(skip(self, cmd), fields(donor_id = %cmd.donor_id, blood_group = %cmd.blood_group), err)]
    async fn schedule(&self, cmd: ScheduleDonation, policy: MismatchPolicy) -> StoreResult<DonationRecord> {
        cmd.validate()?;
        // Dropping `tx` on an early return rolls back.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let donor = sqlx::query("SELECT blood_group FROM users WHERE id = $1 FOR UPDATE")
            .bind(cmd.donor_id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("schedule_donation", e))?
            .ok_or_else(User::donor_not_found)?;
        let recorded: String = donor.try_get("blood_group")?;
        let recorded = parse_column::<BloodGroup>(&recorded, "users.blood_group")?;

        if let Some(request_id) = cmd.request_id {
            sqlx::query("SELECT id FROM blood_requests WHERE id = $1")
                .bind(request_id.get())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("schedule_donation", e))?
                .ok_or_else(BloodRequest::not_found)?;
        }

        if let MismatchOutcome::Tolerated { recorded } = check_donor_blood_group(recorded, cmd.blood_group, policy)? {
            tracing::warn!(
                donor_id = %cmd.donor_id,
                recorded = %recorded,
                supplied = %cmd.blood_group,
                "donation blood group differs from donor record"
            );
        }

        let row = sqlx::query(
            r#"
            INSERT INTO donations (
                donor_id, request_id, donation_date, blood_group, units_donated,
                donation_center, notes, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'Scheduled')
            RETURNING id, donor_id, request_id, donation_date, blood_group, units_donated,
                      donation_center, notes, status, created_at, updated_at
            "#,
        )
        .bind(cmd.donor_id.get())
        .bind(cmd.request_id.map(|id| id.get()))
        .bind(cmd.donation_date)
        .bind(cmd.blood_group.as_str())
        .bind(units_to_db(cmd.units_donated)?)
        .bind(&cmd.donation_center)
        .bind(&cmd.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("schedule_donation", e))?;
        let record = donation_from_row(&row)?;

        sqlx::query(
            r#"
            UPDATE users
            SET is_donor = TRUE, last_donation_date = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(record.donor_id.get())
        .bind(record.donation_date)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("schedule_donation", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(record)
    }

    #[instrument(skip(self, notes), fields(donation_id = %id), err)]
    async fn complete(&self, id: DonationId, notes: Option<String>) -> StoreResult<DonationRecord> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut record = lock_donation(&mut tx, id).await?;
        record.complete(notes, now)?;

        let row = sqlx::query(
            r#"
            SELECT blood_group, available_units, reserved_units, last_updated
            FROM blood_inventory
            WHERE blood_group = $1
            FOR UPDATE
            "#,
        )
        .bind(record.blood_group.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("complete_donation", e))?
        .ok_or_else(LedgerEntry::not_found)?;
        let mut entry = ledger_entry_from_row(&row)?;
        entry.add(record.units_donated, now)?;

        sqlx::query(
            r#"
            UPDATE blood_inventory
            SET available_units = $2, last_updated = $3
            WHERE blood_group = $1
            "#,
        )
        .bind(record.blood_group.as_str())
        .bind(units_to_db(entry.available_units())?)
        .bind(entry.last_updated())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("complete_donation", e))?;

        write_status(&mut tx, &record).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(record)
    }

    #[instrument(skip(self), fields(donation_id = %id), err)]
    async fn cancel(&self, id: DonationId) -> StoreResult<DonationRecord> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut record = lock_donation(&mut tx, id).await?;
        record.cancel(Utc::now())?;
        write_status(&mut tx, &record).await?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(record)
    }

    #[instrument(skip(self), err)]
    async fn list_all(&self) -> StoreResult<Vec<DonationView>> {
        self.views("list_donations", "ORDER BY d.created_at DESC, d.id DESC", ViewFilter::None)
            .await
    }

    #[instrument(skip(self), fields(donor_id = %donor_id), err)]
    async fn by_donor(&self, donor_id: UserId) -> StoreResult<Vec<DonationView>> {
        self.views(
            "donations_by_donor",
            "WHERE d.donor_id = $1 ORDER BY d.donation_date DESC, d.id DESC",
            ViewFilter::Donor(donor_id),
        )
        .await
    }

    #[instrument(skip(self), fields(blood_group = %blood_group), err)]
    async fn completed_by_blood_group(&self, blood_group: BloodGroup) -> StoreResult<Vec<DonationView>> {
        self.views(
            "completed_by_blood_group",
            "WHERE d.blood_group = $1 AND d.status = 'Completed' ORDER BY d.donation_date DESC, d.id DESC",
            ViewFilter::BloodGroup(blood_group),
        )
        .await
    }

    #[instrument(skip(self), err)]
    async fn statistics(&self, today: NaiveDate) -> StoreResult<DonationStatistics> {
        let completed = self
            .views(
                "donation_statistics",
                "WHERE d.status = 'Completed'",
                ViewFilter::None,
            )
            .await?;

        let names: HashMap<UserId, String> = completed
            .iter()
            .filter_map(|v| v.donor_name.clone().map(|name| (v.donation.donor_id, name)))
            .collect();
        Ok(DonationStatistics::from_records(
            completed.iter().map(|v| &v.donation),
            |id| names.get(&id).cloned(),
            today,
        ))
    }
}
