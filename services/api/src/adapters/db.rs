//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `WizardSessionStore` port from the `core` crate. It persists wizard
//! sessions in PostgreSQL using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use picture_book_core::ports::{PortError, PortResult, WizardSessionStore};
use picture_book_core::session::WizardSession;
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `WizardSessionStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct WizardSessionRecord {
    id: Uuid,
    user_id: i64,
    uploaded_image_id: Option<i64>,
    uploaded_image_path: Option<String>,
    story_setting_id: Option<i64>,
    story_setting_data: Option<Json<Map<String, Value>>>,
    storybook_id: Option<i64>,
    updated_at: DateTime<Utc>,
}

impl WizardSessionRecord {
    fn to_domain(self) -> WizardSession {
        WizardSession {
            id: self.id,
            user_id: self.user_id,
            uploaded_image_id: self.uploaded_image_id,
            uploaded_image_path: self.uploaded_image_path,
            story_setting_id: self.story_setting_id,
            story_setting_data: self.story_setting_data.map(|Json(data)| data),
            storybook_id: self.storybook_id,
            updated_at: self.updated_at,
        }
    }
}

const SESSION_COLUMNS: &str = "id, user_id, uploaded_image_id, uploaded_image_path, \
     story_setting_id, story_setting_data, storybook_id, updated_at";

fn to_port_error(e: sqlx::Error, session_id: Uuid) -> PortError {
    match e {
        sqlx::Error::RowNotFound => {
            PortError::NotFound(format!("Wizard session {} not found", session_id))
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// `WizardSessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl WizardSessionStore for DbAdapter {
    async fn create(&self, user_id: i64) -> PortResult<WizardSession> {
        let session = WizardSession::new(user_id);
        let sql = format!(
            "INSERT INTO wizard_sessions (id, user_id, updated_at) VALUES ($1, $2, $3) RETURNING {}",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, WizardSessionRecord>(&sql)
            .bind(session.id)
            .bind(session.user_id)
            .bind(session.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        debug!(session_id = %record.id, "Wizard session row created");
        Ok(record.to_domain())
    }

    async fn load(&self, session_id: Uuid) -> PortResult<WizardSession> {
        let sql = format!(
            "SELECT {} FROM wizard_sessions WHERE id = $1",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, WizardSessionRecord>(&sql)
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| to_port_error(e, session_id))?;
        Ok(record.to_domain())
    }

    async fn save(&self, session: &WizardSession) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE wizard_sessions SET uploaded_image_id = $2, uploaded_image_path = $3, \
             story_setting_id = $4, story_setting_data = $5, storybook_id = $6, updated_at = $7 \
             WHERE id = $1",
        )
        .bind(session.id)
        .bind(session.uploaded_image_id)
        .bind(session.uploaded_image_path.as_deref())
        .bind(session.story_setting_id)
        .bind(session.story_setting_data.as_ref().map(Json))
        .bind(session.storybook_id)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Wizard session {} not found",
                session.id
            )));
        }
        Ok(())
    }

    async fn delete(&self, session_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM wizard_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Wizard session {} not found",
                session_id
            )));
        }
        Ok(())
    }
}
