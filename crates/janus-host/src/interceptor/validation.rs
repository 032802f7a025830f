//! Payload validation for both protocols.
//!
//! - gRPC: [`ValidatingCodec`] replaces `ProstCodec` in generated code
//!   (`tonic_build::configure().codec_path("janus_host::ValidatingCodec")`)
//!   and validates each decoded message, so unary requests and every
//!   message on a stream are checked in arrival order.
//! - REST: [`ValidatedJson`] replaces `axum::Json` in handler signatures.

use axum::extract::{FromRequest, Request};
use axum::Json;
use janus_core::error::AppError;
use janus_core::validation::{FormatRegistry, Validate};
use prost::Message;
use serde::de::DeserializeOwned;
use tonic::codec::{Codec, DecodeBuf, Decoder, ProstCodec};
use tonic::Status;
use tracing::warn;

// =============================================================================
// gRPC
// =============================================================================

/// Prost codec whose decoder validates every inbound message.
#[derive(Debug, Clone)]
pub struct ValidatingCodec<T, U> {
    inner: ProstCodec<T, U>,
}

impl<T, U> Default for ValidatingCodec<T, U> {
    fn default() -> Self {
        Self {
            inner: ProstCodec::default(),
        }
    }
}

impl<T, U> Codec for ValidatingCodec<T, U>
where
    T: Message + Send + 'static,
    U: Message + Default + Validate + Send + 'static,
{
    type Encode = T;
    type Decode = U;
    type Encoder = <ProstCodec<T, U> as Codec>::Encoder;
    type Decoder = ValidatingDecoder<<ProstCodec<T, U> as Codec>::Decoder>;

    fn encoder(&mut self) -> Self::Encoder {
        self.inner.encoder()
    }

    fn decoder(&mut self) -> Self::Decoder {
        ValidatingDecoder {
            inner: self.inner.decoder(),
        }
    }
}

/// Decoder half of [`ValidatingCodec`].
#[derive(Debug)]
pub struct ValidatingDecoder<D> {
    inner: D,
}

impl<D> Decoder for ValidatingDecoder<D>
where
    D: Decoder<Error = Status>,
    D::Item: Validate,
{
    type Item = D::Item;
    type Error = Status;

    fn decode(&mut self, buf: &mut DecodeBuf<'_>) -> Result<Option<D::Item>, Status> {
        let message = self.inner.decode(buf)?;
        if let Some(message) = &message {
            if let Err(e) = message.validate(FormatRegistry::shared()) {
                warn!(error = %e, "rejecting gRPC message that failed validation");
                return Err(Status::invalid_argument(e.to_string()));
            }
        }
        Ok(message)
    }
}

// =============================================================================
// REST
// =============================================================================

/// JSON body extractor that validates before the handler runs.
///
/// Malformed JSON and validation failures both answer HTTP 400 with the
/// standard `{"message", "errorCode"}` body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

/// Error code for bodies that are not valid JSON for the target type.
pub const MALFORMED_PAYLOAD_CODE: &str = "MALFORMED_PAYLOAD";

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            AppError::validation(rejection.body_text()).with_code(MALFORMED_PAYLOAD_CODE)
        })?;
        if let Err(e) = value.validate(FormatRegistry::shared()) {
            warn!(error = %e, "rejecting REST payload that failed validation");
            return Err(e.into());
        }
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::post;
    use axum::Router;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use janus_core::validation::{require, ValidationResult};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Signup {
        email: String,
        name: String,
    }

    impl Validate for Signup {
        fn validate(&self, formats: &FormatRegistry) -> ValidationResult<()> {
            require("name", &self.name)?;
            formats.check("email", "email", &self.email)
        }
    }

    fn app() -> Router {
        Router::new().route(
            "/signup",
            post(|ValidatedJson(body): ValidatedJson<Signup>| async move { body.name }),
        )
    }

    async fn post_json(body: &'static str) -> (StatusCode, String) {
        let response = app()
            .oneshot(
                http::Request::post("/signup")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_valid_payload_reaches_handler() {
        let (status, body) = post_json(r#"{"email":"ada@example.com","name":"Ada"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Ada");
    }

    #[tokio::test]
    async fn test_invalid_payload_is_400() {
        let (status, body) = post_json(r#"{"email":"nope","name":"Ada"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["errorCode"], "VALIDATION_FAILED");
        assert_eq!(json["message"], "email is not a valid email");
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let (status, body) = post_json(r#"{"email":"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["errorCode"], MALFORMED_PAYLOAD_CODE);
    }
}
