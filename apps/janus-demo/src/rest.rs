//! REST surface of the notes service.
//!
//! ```text
//! POST /v1/notes        {"title","body","authorEmail"}  ─► 201 Note
//! GET  /v1/notes/{id}                                   ─► 200 Note | 404
//! ```
//! Errors use the standard `{"message", "errorCode"}` body.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use janus_core::context::RequestContext;
use janus_core::error::{AppError, AppResult};
use janus_core::validation::FormatRegistry;
use janus_cqrs::Invoker;
use janus_host::{RestApi, ValidatedJson};
use uuid::Uuid;

use crate::notes::{CreateNote, GetNote, NewNote, Note};

/// Handler state: the shared invoker.
#[derive(Debug, Clone)]
pub struct NotesApi {
    invoker: Invoker,
}

impl NotesApi {
    pub fn new(invoker: Invoker) -> Self {
        Self { invoker }
    }
}

impl RestApi for NotesApi {
    fn router(&self) -> Router {
        Router::new()
            .route("/v1/notes", post(create_note))
            .route("/v1/notes/{id}", get(get_note))
            .with_state(self.clone())
    }
}

async fn create_note(
    State(api): State<NotesApi>,
    ctx: RequestContext,
    ValidatedJson(note): ValidatedJson<NewNote>,
) -> AppResult<(StatusCode, Json<Note>)> {
    let note = api.invoker.invoke(&ctx, CreateNote(note)).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn get_note(
    State(api): State<NotesApi>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> AppResult<Json<Note>> {
    let id = parse_id(&id)?;
    let note = api.invoker.invoke(&ctx, GetNote { id }).await?;
    Ok(Json(note))
}

fn parse_id(raw: &str) -> AppResult<Uuid> {
    FormatRegistry::shared().check("id", "uuid", raw)?;
    Uuid::parse_str(raw).map_err(|e| AppError::validation(format!("id is not a valid uuid: {e}")))
}
