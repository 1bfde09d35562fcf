use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ApiError;

/// `Json<T>` whose rejection is an `ApiError`, so malformed bodies come back
/// as `{"message": …}` like every other failure.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(e.to_string()))?;
        Ok(ApiJson(value))
    }
}

/// `Path<Uuid>` with an `ApiError` rejection for non-UUID path segments.
pub struct IdPath(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::validation(e.to_string()))?;
        Ok(IdPath(id))
    }
}

/// `Multipart` with an `ApiError` rejection for non-multipart requests.
pub struct ApiMultipart(pub Multipart);

#[async_trait]
impl<S> FromRequest<S> for ApiMultipart
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mp = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(e.to_string()))?;
        Ok(ApiMultipart(mp))
    }
}
