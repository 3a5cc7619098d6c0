// ABOUTME: CAP storage layer using SQLite
// ABOUTME: Owner-scoped create, list, get, partial update, and archive

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, warn};

use cap_storage::{encode_timestamp, StorageError};

use crate::error::{CapError, CapResult};
use crate::input::{non_empty, required_title, trimmed};
use crate::sequence::{self, MAX_CAP_ID_ATTEMPTS};
use crate::types::{
    ApprovalStatus, Cap, CapCreateInput, CapStatus, CapUpdateInput, CapexRevexType,
};

/// A value bound into a dynamically built UPDATE
enum Bind {
    Text(String),
    Real(f64),
}

/// `column = ?` pairs collected for an UPDATE
#[derive(Default)]
struct Assignments {
    columns: Vec<&'static str>,
    values: Vec<Bind>,
}

impl Assignments {
    fn text(&mut self, column: &'static str, value: impl Into<String>) {
        self.columns.push(column);
        self.values.push(Bind::Text(value.into()));
    }

    fn real(&mut self, column: &'static str, value: f64) {
        self.columns.push(column);
        self.values.push(Bind::Real(value));
    }

    fn timestamp(&mut self, column: &'static str, value: &DateTime<Utc>) {
        self.text(column, encode_timestamp(value));
    }

    fn json_list(&mut self, column: &'static str, value: &[String]) -> Result<(), StorageError> {
        self.text(column, serde_json::to_string(value)?);
        Ok(())
    }

    fn set_clause(&self) -> String {
        self.columns
            .iter()
            .map(|column| format!("{} = ?", column))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub struct CapStorage {
    pool: SqlitePool,
}

impl CapStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a CAP for `user_id` with the next capId in their sequence
    pub async fn create_cap(&self, user_id: &str, input: CapCreateInput) -> CapResult<Cap> {
        let title = required_title(&input.title)?;
        let description = trimmed(input.description);
        let assignee = trimmed(input.assignee);
        let tags = serde_json::to_string(&input.tags.unwrap_or_default())?;
        let due_date = input.due_date.as_ref().map(encode_timestamp);

        let id = nanoid::nanoid!();
        let now = encode_timestamp(&cap_storage::now());

        for attempt in 1..=MAX_CAP_ID_ATTEMPTS {
            let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

            let n = sequence::next_value(&mut tx, user_id).await?;
            let cap_id = sequence::format_cap_id(user_id, n);

            debug!(
                "Creating CAP: {} ({}) for user: {} (attempt {})",
                id, cap_id, user_id, attempt
            );

            let inserted = sqlx::query(
                r#"
                INSERT INTO caps (
                    id, cap_id, user_id, title, description, assignee, due_date,
                    status, tags, capex_revex_type, capex_revex_amount, approval_status,
                    created_at, updated_at
                ) VALUES (
                    ?, ?, ?, ?, ?, ?, ?,
                    ?, ?, ?, 0, ?,
                    ?, ?
                )
                RETURNING *
                "#,
            )
            .bind(&id)
            .bind(&cap_id)
            .bind(user_id)
            .bind(&title)
            .bind(&description)
            .bind(&assignee)
            .bind(&due_date)
            .bind(CapStatus::Pending.as_str())
            .bind(&tags)
            .bind(CapexRevexType::None.as_str())
            .bind(ApprovalStatus::Pending.as_str())
            .bind(&now)
            .bind(&now)
            .fetch_one(&mut *tx)
            .await
            .map_err(StorageError::Sqlx);

            match inserted {
                Ok(row) => {
                    let cap = row_to_cap(&row)?;
                    tx.commit().await.map_err(StorageError::Sqlx)?;
                    return Ok(cap);
                }
                Err(err) if err.is_unique_violation() => {
                    warn!(
                        "capId {} already taken, advancing sequence for user: {}",
                        cap_id, user_id
                    );
                    // Keep the bumped counter so the next attempt draws a fresh value
                    sequence::skip_taken(&mut tx, user_id).await?;
                    tx.commit().await.map_err(StorageError::Sqlx)?;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(StorageError::Database(format!(
            "Could not allocate a unique capId for user {} after {} attempts",
            user_id, MAX_CAP_ID_ATTEMPTS
        ))
        .into())
    }

    /// All non-archived CAPs of `user_id`, newest first
    pub async fn list_caps(&self, user_id: &str) -> CapResult<Vec<Cap>> {
        debug!("Fetching CAPs for user: {}", user_id);

        let rows = sqlx::query(
            r#"
            SELECT * FROM caps
            WHERE user_id = ? AND status != ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(user_id)
        .bind(CapStatus::Archived.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        let caps = rows
            .iter()
            .map(row_to_cap)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(caps)
    }

    /// A single CAP, archived or not, if `user_id` owns it
    pub async fn get_cap(&self, user_id: &str, id: &str) -> CapResult<Cap> {
        debug!("Fetching CAP: {} for user: {}", id, user_id);

        let row = sqlx::query("SELECT * FROM caps WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        match row {
            Some(row) => Ok(row_to_cap(&row)?),
            None => Err(CapError::NotFound),
        }
    }

    /// Apply a partial update and the requested transition in one statement
    pub async fn update_cap(
        &self,
        user_id: &str,
        id: &str,
        input: CapUpdateInput,
    ) -> CapResult<Cap> {
        debug!("Updating CAP: {} for user: {}", id, user_id);

        let now = cap_storage::now();
        let mut set = Assignments::default();
        set.timestamp("updated_at", &now);

        if let Some(title) = &input.title {
            set.text("title", required_title(title)?);
        }
        if let Some(description) = trimmed(input.description) {
            set.text("description", description);
        }
        if let Some(assignee) = trimmed(input.assignee) {
            set.text("assignee", assignee);
        }
        if let Some(due_date) = &input.due_date {
            set.timestamp("due_date", due_date);
        }
        if let Some(tags) = &input.tags {
            set.json_list("tags", tags)?;
        }
        if let Some(action) = trimmed(input.corrective_action) {
            set.text("corrective_action", action);
        }
        if let Some(remarks) = trimmed(input.remarks) {
            set.text("remarks", remarks);
        }
        if let Some(closure) = &input.expected_closure_date {
            set.timestamp("expected_closure_date", closure);
        }
        if let Some(members) = &input.team_members {
            set.json_list("team_members", members)?;
        }
        if let Some(kind) = input.capex_revex_type {
            set.text("capex_revex_type", kind.as_str());
        }
        if let Some(amount) = input.capex_revex_amount {
            set.real("capex_revex_amount", amount);
        }
        if let Some(notes) = trimmed(input.approval_notes) {
            set.text("approval_notes", notes);
        }
        if let Some(attachments) = &input.attachments {
            set.json_list("attachments", attachments)?;
        }

        if let Some(transition) = &input.transition {
            let effect = transition.effect(now);
            set.text("status", effect.status.as_str());
            if let Some(approval) = effect.approval_status {
                set.text("approval_status", approval.as_str());
            }
            if let Some(submitted_at) = &effect.submitted_for_approval_at {
                set.timestamp("submitted_for_approval_at", submitted_at);
            }
            if let Some(completed_at) = &effect.completed_at {
                set.timestamp("completed_at", completed_at);
            }
            if effect.completes() {
                if let Some(details) = non_empty(input.completion_details) {
                    set.text("completion_details", details);
                }
                if let Some(url) = non_empty(input.completion_upload_url) {
                    set.text("completion_upload_url", url);
                }
            }
        }

        let mut sql = format!(
            "UPDATE caps SET {} WHERE id = ? AND user_id = ?",
            set.set_clause()
        );
        if input.transition.is_some() {
            sql.push_str(" AND status != ?");
        }
        sql.push_str(" RETURNING *");

        let mut query = sqlx::query(&sql);
        for value in set.values {
            query = match value {
                Bind::Text(text) => query.bind(text),
                Bind::Real(real) => query.bind(real),
            };
        }
        query = query.bind(id).bind(user_id);
        if input.transition.is_some() {
            query = query.bind(CapStatus::Archived.as_str());
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        match row {
            Some(row) => Ok(row_to_cap(&row)?),
            None if input.transition.is_some() => {
                Err(self.classify_missed_transition(user_id, id).await)
            }
            None => Err(CapError::NotFound),
        }
    }

    /// Soft delete: hide the CAP from listings without removing it
    pub async fn archive_cap(&self, user_id: &str, id: &str) -> CapResult<Cap> {
        debug!("Archiving CAP: {} for user: {}", id, user_id);

        let now = encode_timestamp(&cap_storage::now());

        let row = sqlx::query(
            r#"
            UPDATE caps SET status = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING *
            "#,
        )
        .bind(CapStatus::Archived.as_str())
        .bind(&now)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        match row {
            Some(row) => Ok(row_to_cap(&row)?),
            None => Err(CapError::NotFound),
        }
    }

    /// A guarded transition matched no row: either the CAP is archived or it is not ours
    async fn classify_missed_transition(&self, user_id: &str, id: &str) -> CapError {
        let status = sqlx::query_scalar::<_, CapStatus>(
            "SELECT status FROM caps WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;

        match status {
            Ok(Some(CapStatus::Archived)) => CapError::InvalidTransition(format!(
                "CAP {} is archived; its status can no longer change",
                id
            )),
            Ok(_) => CapError::NotFound,
            Err(e) => StorageError::Sqlx(e).into(),
        }
    }
}

fn json_list(row: &SqliteRow, column: &str) -> Result<Vec<String>, StorageError> {
    match row.try_get::<Option<String>, _>(column)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

fn row_to_cap(row: &SqliteRow) -> Result<Cap, StorageError> {
    Ok(Cap {
        id: row.try_get("id")?,
        cap_id: row.try_get("cap_id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        assignee: row.try_get("assignee")?,
        due_date: row.try_get("due_date")?,
        status: row.try_get("status")?,
        completion_details: row.try_get("completion_details")?,
        completion_upload_url: row.try_get("completion_upload_url")?,
        attachments: json_list(row, "attachments")?,
        completed_at: row.try_get("completed_at")?,
        tags: json_list(row, "tags")?,
        corrective_action: row.try_get("corrective_action")?,
        remarks: row.try_get("remarks")?,
        expected_closure_date: row.try_get("expected_closure_date")?,
        team_members: json_list(row, "team_members")?,
        capex_revex_type: row.try_get("capex_revex_type")?,
        capex_revex_amount: row.try_get("capex_revex_amount")?,
        approval_status: row.try_get("approval_status")?,
        approval_notes: row.try_get("approval_notes")?,
        submitted_for_approval_at: row.try_get("submitted_for_approval_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
