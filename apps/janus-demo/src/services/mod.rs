//! gRPC service implementations.

pub mod note_service;
