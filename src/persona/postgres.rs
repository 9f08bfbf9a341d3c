//! Postgres-backed persona store
//!
//! Lazily connected pool; the table is created on first use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::{new_session_id, PersonaStore};
use crate::error::AssistantError;
use crate::models::{Persona, PersonaStatus, RiskAffinity};
use crate::Result;

pub struct PgPersonaStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
    session_id: OnceCell<String>,
}

impl PgPersonaStore {
    pub fn connect_lazy(url: &str) -> std::result::Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(url)?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
            session_id: OnceCell::new(),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS personas (
                      id TEXT PRIMARY KEY,
                      name TEXT NOT NULL,
                      summary TEXT NOT NULL,
                      status TEXT NOT NULL,
                      risk_affinity TEXT NOT NULL,
                      tone_preference TEXT NOT NULL,
                      contact_channels TEXT NOT NULL,
                      goals TEXT NOT NULL,
                      created_at TIMESTAMPTZ NOT NULL,
                      updated_at TIMESTAMPTZ NOT NULL
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| storage("Failed to initialize persona schema", e))?;

        Ok(())
    }
}

#[async_trait]
impl PersonaStore for PgPersonaStore {
    async fn get(&self, id: &str) -> Result<Option<Persona>> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            SELECT id, name, summary, status, risk_affinity, tone_preference,
                   contact_channels, goals, created_at, updated_at
            FROM personas
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage("Failed to load persona", e))?;

        row.map(|row| persona_from_row(&row)).transpose()
    }

    async fn save(&self, persona: &Persona) -> Result<()> {
        self.ensure_schema().await?;

        let channels = serde_json::to_string(&persona.contact_channels)
            .map_err(|e| storage("Failed to encode contact channels", e))?;
        let goals = serde_json::to_string(&persona.goals)
            .map_err(|e| storage("Failed to encode goals", e))?;

        sqlx::query(
            r#"
            INSERT INTO personas
              (id, name, summary, status, risk_affinity, tone_preference,
               contact_channels, goals, created_at, updated_at)
            VALUES
              ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
              name = EXCLUDED.name,
              summary = EXCLUDED.summary,
              status = EXCLUDED.status,
              risk_affinity = EXCLUDED.risk_affinity,
              tone_preference = EXCLUDED.tone_preference,
              contact_channels = EXCLUDED.contact_channels,
              goals = EXCLUDED.goals,
              updated_at = GREATEST(personas.updated_at, EXCLUDED.updated_at)
            "#,
        )
        .bind(&persona.id)
        .bind(&persona.name)
        .bind(&persona.summary)
        .bind(persona.status.to_string())
        .bind(persona.risk_affinity.to_string())
        .bind(&persona.tone_preference)
        .bind(channels)
        .bind(goals)
        .bind(persona.created_at)
        .bind(persona.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| storage("Failed to save persona", e))?;

        Ok(())
    }

    async fn get_or_create_session_id(&self) -> Result<String> {
        let id = self
            .session_id
            .get_or_init(|| async { new_session_id() })
            .await;
        Ok(id.clone())
    }
}

fn storage(context: &str, error: impl std::fmt::Display) -> AssistantError {
    AssistantError::Storage(format!("{}: {}", context, error))
}

fn persona_from_row(row: &PgRow) -> Result<Persona> {
    let get_text = |column: &str| -> Result<String> {
        row.try_get::<String, _>(column)
            .map_err(|e| storage("Failed to decode persona row", e))
    };
    let get_time = |column: &str| -> Result<DateTime<Utc>> {
        row.try_get::<DateTime<Utc>, _>(column)
            .map_err(|e| storage("Failed to decode persona row", e))
    };

    let contact_channels: BTreeSet<String> = serde_json::from_str(&get_text("contact_channels")?)
        .map_err(|e| storage("Invalid contact channels", e))?;
    let goals: Vec<String> =
        serde_json::from_str(&get_text("goals")?).map_err(|e| storage("Invalid goals", e))?;

    Ok(Persona {
        id: get_text("id")?,
        name: get_text("name")?,
        summary: get_text("summary")?,
        status: status_from_db(&get_text("status")?)?,
        risk_affinity: affinity_from_db(&get_text("risk_affinity")?)?,
        tone_preference: get_text("tone_preference")?,
        contact_channels,
        goals,
        created_at: get_time("created_at")?,
        updated_at: get_time("updated_at")?,
    })
}

fn status_from_db(value: &str) -> Result<PersonaStatus> {
    match value {
        "active" => Ok(PersonaStatus::Active),
        "learning" => Ok(PersonaStatus::Learning),
        other => Err(storage("Unknown persona status", other)),
    }
}

fn affinity_from_db(value: &str) -> Result<RiskAffinity> {
    match value {
        "conservative" => Ok(RiskAffinity::Conservative),
        "moderate" => Ok(RiskAffinity::Moderate),
        "balanced" => Ok(RiskAffinity::Balanced),
        "growth" => Ok(RiskAffinity::Growth),
        other => Err(storage("Unknown risk affinity", other)),
    }
}
