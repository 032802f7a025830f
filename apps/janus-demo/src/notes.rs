//! # Notes Domain
//!
//! In-memory note store and the executors both transports invoke.
//!
//! ```text
//! ┌──────────────┬─────────┬───────────────────────────────────────┐
//! │ Executor     │ Kind    │ Effect                                │
//! ├──────────────┼─────────┼───────────────────────────────────────┤
//! │ CreateNote   │ command │ insert one note                       │
//! │ ImportNotes  │ command │ insert a batch (all or nothing)       │
//! │ GetNote      │ query   │ read one note, NotFound when missing  │
//! └──────────────┴─────────┴───────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use janus_core::context::RequestContext;
use janus_core::error::{AppError, AppResult};
use janus_cqrs::{async_trait, Executor, ExecutorKind};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Error code for unknown note IDs.
pub const NOTE_NOT_FOUND_CODE: &str = "NOTE_NOT_FOUND";

/// Error code for an import without notes.
pub const EMPTY_IMPORT_CODE: &str = "EMPTY_IMPORT";

// =============================================================================
// Model
// =============================================================================

/// A stored note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub author_email: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for a note that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub author_email: String,
}

impl NewNote {
    fn into_note(self, created_at: DateTime<Utc>) -> Note {
        Note {
            id: Uuid::new_v4(),
            title: self.title,
            body: self.body,
            author_email: self.author_email,
            created_at,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Shared note storage, the dependency bundle of every note executor.
#[derive(Debug, Default)]
pub struct NoteStore {
    notes: RwLock<HashMap<Uuid, Note>>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, new: NewNote) -> Note {
        let note = new.into_note(Utc::now());
        self.notes.write().await.insert(note.id, note.clone());
        note
    }

    /// Inserts every note under one write lock.
    pub async fn insert_all(&self, batch: Vec<NewNote>) -> Vec<Note> {
        let now = Utc::now();
        let mut notes = self.notes.write().await;
        batch
            .into_iter()
            .map(|new| {
                let note = new.into_note(now);
                notes.insert(note.id, note.clone());
                note
            })
            .collect()
    }

    pub async fn get(&self, id: Uuid) -> Option<Note> {
        self.notes.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.notes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// =============================================================================
// Executors
// =============================================================================

/// Stores one note.
#[derive(Debug, Clone)]
pub struct CreateNote(pub NewNote);

#[async_trait]
impl Executor for CreateNote {
    type Deps = NoteStore;
    type Output = Note;

    fn tag() -> &'static str {
        "notes.create"
    }

    async fn execute(self, store: Arc<NoteStore>, ctx: &RequestContext) -> AppResult<Note> {
        let note = store.insert(self.0).await;
        info!(request_id = ctx.request_id(), note_id = %note.id, "note created");
        Ok(note)
    }
}

/// Reads one note.
#[derive(Debug, Clone, Copy)]
pub struct GetNote {
    pub id: Uuid,
}

#[async_trait]
impl Executor for GetNote {
    type Deps = NoteStore;
    type Output = Note;

    const KIND: ExecutorKind = ExecutorKind::Query;

    fn tag() -> &'static str {
        "notes.get"
    }

    async fn execute(self, store: Arc<NoteStore>, _ctx: &RequestContext) -> AppResult<Note> {
        store.get(self.id).await.ok_or_else(|| {
            AppError::not_found(format!("note {} not found", self.id)).with_code(NOTE_NOT_FOUND_CODE)
        })
    }
}

/// Stores a batch of notes received on a client stream.
#[derive(Debug, Clone)]
pub struct ImportNotes(pub Vec<NewNote>);

#[async_trait]
impl Executor for ImportNotes {
    type Deps = NoteStore;
    type Output = Vec<Note>;

    fn tag() -> &'static str {
        "notes.import"
    }

    async fn execute(self, store: Arc<NoteStore>, ctx: &RequestContext) -> AppResult<Vec<Note>> {
        if self.0.is_empty() {
            return Err(AppError::validation("at least one note is required").with_code(EMPTY_IMPORT_CODE));
        }
        let notes = store.insert_all(self.0).await;
        info!(request_id = ctx.request_id(), count = notes.len(), "notes imported");
        Ok(notes)
    }
}
