//! JSON body extractor with `{"error": ...}` rejections
//!
//! axum's own `Json` rejects bad bodies with 415/422 and a plain-text
//! message. Handlers take `ApiJson<T>` instead so a malformed or mistyped
//! body comes back as a 400 in the same shape as every other error.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};

use crate::error::ApiError;

pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}
