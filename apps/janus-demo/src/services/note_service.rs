//! Notes gRPC service implementation.
//!
//! Thin adapter: every RPC reads the request context the interceptor
//! attached, converts the message, and hands it to the invoker. Validation
//! already happened in the codec by the time a method runs.

use tonic::{Request, Response, Status, Streaming};
use tracing::debug;
use uuid::Uuid;

use janus_core::context::RequestContext;
use janus_cqrs::Invoker;

use crate::notes::{self, CreateNote, GetNote, ImportNotes, NewNote};
use crate::proto::{
    note_service_server::NoteService, CreateNoteRequest, GetNoteRequest, ImportNotesResponse, Note,
};

/// Notes service implementation.
#[derive(Debug, Clone)]
pub struct NoteServiceImpl {
    invoker: Invoker,
}

impl NoteServiceImpl {
    pub fn new(invoker: Invoker) -> Self {
        NoteServiceImpl { invoker }
    }
}

#[tonic::async_trait]
impl NoteService for NoteServiceImpl {
    async fn create_note(&self, request: Request<CreateNoteRequest>) -> Result<Response<Note>, Status> {
        let ctx = RequestContext::from_grpc(&request)?;
        let note = self
            .invoker
            .invoke(&ctx, CreateNote(request.into_inner().into()))
            .await?;
        Ok(Response::new(note.into()))
    }

    async fn get_note(&self, request: Request<GetNoteRequest>) -> Result<Response<Note>, Status> {
        let ctx = RequestContext::from_grpc(&request)?;
        let id = Uuid::parse_str(&request.get_ref().id)
            .map_err(|e| Status::invalid_argument(format!("id is not a valid uuid: {e}")))?;
        let note = self.invoker.invoke(&ctx, GetNote { id }).await?;
        Ok(Response::new(note.into()))
    }

    async fn import_notes(
        &self,
        request: Request<Streaming<CreateNoteRequest>>,
    ) -> Result<Response<ImportNotesResponse>, Status> {
        let ctx = RequestContext::from_grpc(&request)?;
        let mut stream = request.into_inner();

        // A message that fails validation ends the stream with its status
        // before anything is stored.
        let mut batch = Vec::new();
        while let Some(message) = stream.message().await? {
            batch.push(NewNote::from(message));
        }
        debug!(request_id = ctx.request_id(), count = batch.len(), "import stream complete");

        let notes = self.invoker.invoke(&ctx, ImportNotes(batch)).await?;
        Ok(Response::new(ImportNotesResponse {
            ids: notes.iter().map(|note| note.id.to_string()).collect(),
        }))
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<CreateNoteRequest> for NewNote {
    fn from(request: CreateNoteRequest) -> Self {
        NewNote {
            title: request.title,
            body: request.body,
            author_email: request.author_email,
        }
    }
}

impl From<notes::Note> for Note {
    fn from(note: notes::Note) -> Self {
        Note {
            id: note.id.to_string(),
            title: note.title,
            body: note.body,
            author_email: note.author_email,
            created_at: note.created_at.to_rfc3339(),
        }
    }
}
