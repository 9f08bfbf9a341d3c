//! In-memory persona store for development and tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

use super::{new_session_id, PersonaStore};
use crate::models::Persona;
use crate::Result;

pub struct InMemoryPersonaStore {
    personas: Arc<RwLock<HashMap<String, Persona>>>,
    session_id: OnceCell<String>,
}

impl InMemoryPersonaStore {
    pub fn new() -> Self {
        Self {
            personas: Arc::new(RwLock::new(HashMap::new())),
            session_id: OnceCell::new(),
        }
    }

    pub async fn len(&self) -> usize {
        self.personas.read().await.len()
    }
}

impl Default for InMemoryPersonaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersonaStore for InMemoryPersonaStore {
    async fn get(&self, id: &str) -> Result<Option<Persona>> {
        let personas = self.personas.read().await;
        Ok(personas.get(id).cloned())
    }

    async fn save(&self, persona: &Persona) -> Result<()> {
        let mut personas = self.personas.write().await;

        let mut record = persona.clone();
        if let Some(existing) = personas.get(&persona.id) {
            record.updated_at = record.updated_at.max(existing.updated_at);
        }

        personas.insert(record.id.clone(), record);
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
