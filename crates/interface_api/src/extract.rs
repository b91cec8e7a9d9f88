//! Custom extractors

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use domain_ledger::IdempotencyKey;

use crate::error::ApiError;

/// Header carrying the client's settlement idempotency key
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// JSON body that has passed its `validator` rules
///
/// Malformed bodies and rule violations both come back as [`ApiError`], so
/// every rejection uses the common error envelope.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// The `Idempotency-Key` request header, required on settlement
#[derive(Debug)]
pub struct IdempotencyHeader(pub IdempotencyKey);

#[async_trait]
impl<S> FromRequestParts<S> for IdempotencyHeader
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .ok_or_else(|| ApiError::BadRequest("Missing Idempotency-Key header".to_string()))?
            .to_str()
            .map_err(|_| ApiError::BadRequest("Idempotency-Key must be visible ASCII".to_string()))?;

        IdempotencyKey::parse(raw)
            .map(Self)
            .map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}
