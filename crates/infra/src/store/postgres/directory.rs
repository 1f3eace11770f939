use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use tracing::instrument;

use bloodbank_core::{BloodGroup, MessageId, RequestId, UserId};
use bloodbank_directory::{
    BloodRequest, BloodRequestView, ContactMessage, ContactStatistics, ContactStatus, NewBloodRequest,
    NewContactMessage, NewUser, ProfileUpdate, RequestStatus, UrgencyLevel, User, normalize_email,
};

use super::{
    FOREIGN_KEY_VIOLATION, PostgresStore, UNIQUE_VIOLATION, has_sqlstate, map_sqlx_error, parse_column, units_from_db,
    units_to_db,
};
use crate::store::{ContactInbox, RequestDirectory, StoreError, StoreResult, UserDirectory};

const USER_COLUMNS: &str = r#"
    id, name, email, password_hash, phone, blood_group, location, city, state,
    is_donor, is_recipient, last_donation_date, created_at, updated_at
"#;

const REQUEST_VIEW_SELECT: &str = r#"
    SELECT br.id, br.requester_id, br.patient_name, br.blood_group, br.units_required,
           br.hospital_name, br.hospital_address, br.urgency_level, br.contact_person,
           br.contact_phone, br.reason, br.required_date, br.status, br.created_at, br.updated_at,
           u.name AS requester_name, u.email AS requester_email, u.phone AS requester_phone,
           u.city AS requester_city, u.state AS requester_state
    FROM blood_requests br
    LEFT JOIN users u ON u.id = br.requester_id
"#;

const MESSAGE_COLUMNS: &str = "id, name, email, phone, message, status, created_at";

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let blood_group: String = row.try_get("blood_group")?;
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        phone: row.try_get("phone")?,
        blood_group: parse_column::<BloodGroup>(&blood_group, "users.blood_group")?,
        location: row.try_get("location")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        is_donor: row.try_get("is_donor")?,
        is_recipient: row.try_get("is_recipient")?,
        last_donation_date: row.try_get("last_donation_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn request_from_row(row: &PgRow) -> StoreResult<BloodRequest> {
    let blood_group: String = row.try_get("blood_group")?;
    let urgency: String = row.try_get("urgency_level")?;
    let status: String = row.try_get("status")?;
    Ok(BloodRequest {
        id: RequestId::new(row.try_get("id")?),
        requester_id: row.try_get::<Option<i64>, _>("requester_id")?.map(UserId::new),
        patient_name: row.try_get("patient_name")?,
        blood_group: parse_column::<BloodGroup>(&blood_group, "blood_requests.blood_group")?,
        units_required: units_from_db(row.try_get("units_required")?, "units_required")?,
        hospital_name: row.try_get("hospital_name")?,
        hospital_address: row.try_get("hospital_address")?,
        urgency_level: parse_column::<UrgencyLevel>(&urgency, "blood_requests.urgency_level")?,
        contact_person: row.try_get("contact_person")?,
        contact_phone: row.try_get("contact_phone")?,
        reason: row.try_get("reason")?,
        required_date: row.try_get("required_date")?,
        status: parse_column::<RequestStatus>(&status, "blood_requests.status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn request_view_from_row(row: &PgRow) -> StoreResult<BloodRequestView> {
    Ok(BloodRequestView {
        request: request_from_row(row)?,
        requester_name: row.try_get("requester_name")?,
        requester_email: row.try_get("requester_email")?,
        requester_phone: row.try_get("requester_phone")?,
        requester_city: row.try_get("requester_city")?,
        requester_state: row.try_get("requester_state")?,
    })
}

fn message_from_row(row: &PgRow) -> StoreResult<ContactMessage> {
    let status: String = row.try_get("status")?;
    Ok(ContactMessage {
        id: MessageId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        message: row.try_get("message")?,
        status: parse_column::<ContactStatus>(&status, "contact_messages.status")?,
        created_at: row.try_get("created_at")?,
    })
}

impl PostgresStore {
    async fn pending_requests(
        &self,
        operation: &'static str,
        filter: &str,
        binds: &[Option<&str>],
    ) -> StoreResult<Vec<BloodRequestView>> {
        let sql = format!("{REQUEST_VIEW_SELECT} WHERE br.status = 'Pending' {filter}");
        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(*value);
        }
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        let mut views = rows.iter().map(request_view_from_row).collect::<StoreResult<Vec<_>>>()?;
        views.sort_by(BloodRequestView::pending_order);
        Ok(views)
    }
}

#[async_trait]
impl UserDirectory for PostgresStore {
    #[instrument(skip(self, new), err)]
    async fn register(&self, new: NewUser) -> StoreResult<User> {
        let new = new.normalized()?;
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, phone, blood_group, location, city, state)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.phone)
            .bind(new.blood_group.as_str())
            .bind(&new.location)
            .bind(&new.city)
            .bind(&new.state)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| {
                if has_sqlstate(&e, UNIQUE_VIOLATION) {
                    StoreError::from(User::email_taken())
                } else {
                    map_sqlx_error("register_user", e)
                }
            })?;
        user_from_row(&row)
    }

    #[instrument(skip(self, email), err)]
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get(&self, id: UserId) -> StoreResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?
            .ok_or_else(User::not_found)?;
        user_from_row(&row)
    }

    #[instrument(skip(self, update), fields(user_id = %id), err)]
    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> StoreResult<User> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_profile", e))?
            .ok_or_else(User::not_found)?;
        let mut user = user_from_row(&row)?;
        user.apply(update, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE users
            SET name = $2, phone = $3, location = $4, city = $5, state = $6,
                is_donor = $7, is_recipient = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(user.id.get())
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.location)
        .bind(&user.city)
        .bind(&user.state)
        .bind(user.is_donor)
        .bind(user.is_recipient)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_profile", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }
}

#[async_trait]
impl RequestDirectory for PostgresStore {
    #[instrument(skip(self, new), fields(blood_group = %new.blood_group), err)]
    async fn create(&self, new: NewBloodRequest) -> StoreResult<BloodRequest> {
        let new = new.normalized()?;
        let row = sqlx::query(
            r#"
            INSERT INTO blood_requests (
                requester_id, patient_name, blood_group, units_required, hospital_name,
                hospital_address, urgency_level, contact_person, contact_phone, reason, required_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, requester_id, patient_name, blood_group, units_required, hospital_name,
                      hospital_address, urgency_level, contact_person, contact_phone, reason,
                      required_date, status, created_at, updated_at
            "#,
        )
        .bind(new.requester_id.map(|id| id.get()))
        .bind(&new.patient_name)
        .bind(new.blood_group.as_str())
        .bind(units_to_db(new.units_required)?)
        .bind(&new.hospital_name)
        .bind(&new.hospital_address)
        .bind(new.urgency_level.as_str())
        .bind(&new.contact_person)
        .bind(&new.contact_phone)
        .bind(&new.reason)
        .bind(new.required_date)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| {
            if has_sqlstate(&e, FOREIGN_KEY_VIOLATION) {
                StoreError::from(User::not_found())
            } else {
                map_sqlx_error("create_request", e)
            }
        })?;
        request_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn list_all(&self) -> StoreResult<Vec<BloodRequestView>> {
        let sql = format!("{REQUEST_VIEW_SELECT} ORDER BY br.created_at DESC, br.id DESC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_requests", e))?;
        rows.iter().map(request_view_from_row).collect()
    }

    #[instrument(skip(self), fields(blood_group = %blood_group), err)]
    async fn pending_by_blood_group(&self, blood_group: BloodGroup) -> StoreResult<Vec<BloodRequestView>> {
        self.pending_requests(
            "pending_by_blood_group",
            "AND br.blood_group = $1",
            &[Some(blood_group.as_str())],
        )
        .await
    }

    #[instrument(skip(self), err)]
    async fn pending_by_location(
        &self,
        city: Option<String>,
        state: Option<String>,
    ) -> StoreResult<Vec<BloodRequestView>> {
        self.pending_requests(
            "pending_by_location",
            "AND ($1::TEXT IS NULL OR LOWER(u.city) = LOWER($1)) \
             AND ($2::TEXT IS NULL OR LOWER(u.state) = LOWER($2))",
            &[city.as_deref(), state.as_deref()],
        )
        .await
    }

    #[instrument(skip(self), err)]
    async fn urgent(&self) -> StoreResult<Vec<BloodRequestView>> {
        let mut views = self
            .pending_requests(
                "urgent_requests",
                "AND br.urgency_level IN ('High', 'Emergency')",
                &[],
            )
            .await?;
        views.sort_by(BloodRequestView::urgent_order);
        Ok(views)
    }

    #[instrument(skip(self), fields(request_id = %id), err)]
    async fn get(&self, id: RequestId) -> StoreResult<BloodRequestView> {
        let sql = format!("{REQUEST_VIEW_SELECT} WHERE br.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_request", e))?
            .ok_or_else(BloodRequest::not_found)?;
        request_view_from_row(&row)
    }

    #[instrument(skip(self), fields(request_id = %id, status = status.as_str()), err)]
    async fn update_status(&self, id: RequestId, status: RequestStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE blood_requests SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.get())
            .bind(status.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_request_status", e))?;
        if result.rows_affected() == 0 {
            return Err(BloodRequest::not_found().into());
        }
        Ok(())
    }

    #[instrument(skip(self), fields(request_id = %id), err)]
    async fn delete(&self, id: RequestId) -> StoreResult<()> {
        // Linked donations keep their rows; the foreign key clears request_id.
        let result = sqlx::query("DELETE FROM blood_requests WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_request", e))?;
        if result.rows_affected() == 0 {
            return Err(BloodRequest::not_found().into());
        }
        Ok(())
    }
}

#[async_trait]
impl ContactInbox for PostgresStore {
    #[instrument(skip(self, new), err)]
    async fn submit(&self, new: NewContactMessage) -> StoreResult<ContactMessage> {
        let new = new.normalized()?;
        let sql = format!(
            "INSERT INTO contact_messages (name, email, phone, message) VALUES ($1, $2, $3, $4) \
             RETURNING {MESSAGE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.phone)
            .bind(&new.message)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("submit_message", e))?;
        message_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn list_all(&self) -> StoreResult<Vec<ContactMessage>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM contact_messages ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_messages", e))?;
        rows.iter().map(message_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn unread(&self) -> StoreResult<Vec<ContactMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM contact_messages WHERE status = 'Unread' \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("unread_messages", e))?;
        rows.iter().map(message_from_row).collect()
    }

    #[instrument(skip(self), fields(message_id = %id), err)]
    async fn get(&self, id: MessageId) -> StoreResult<ContactMessage> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM contact_messages WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_message", e))?
            .ok_or_else(ContactMessage::not_found)?;
        message_from_row(&row)
    }

    #[instrument(skip(self), fields(message_id = %id, status = status.as_str()), err)]
    async fn set_status(&self, id: MessageId, status: ContactStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE contact_messages SET status = $2 WHERE id = $1")
            .bind(id.get())
            .bind(status.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_message_status", e))?;
        if result.rows_affected() == 0 {
            return Err(ContactMessage::not_found().into());
        }
        Ok(())
    }

    #[instrument(skip(self), fields(message_id = %id), err)]
    async fn delete(&self, id: MessageId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_message", e))?;
        if result.rows_affected() == 0 {
            return Err(ContactMessage::not_found().into());
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn statistics(&self, now: DateTime<Utc>) -> StoreResult<ContactStatistics> {
        let messages = ContactInbox::list_all(self).await?;
        Ok(ContactStatistics::from_messages(&messages, now))
    }
}
