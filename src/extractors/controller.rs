//! Build a `WebController` from the incoming request.

use crate::controller::WebController;
use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRef, FromRequest, Request};
use axum::http::StatusCode;

#[async_trait]
impl<S> FromRequest<S> for WebController
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let views = AppState::from_ref(state).views;
        let (parts, body) = req.into_parts();
        let body = Bytes::from_request(Request::from_parts(parts.clone(), body), state)
            .await
            .map_err(|rejection| {
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    AppError::PayloadTooLarge(rejection.body_text())
                } else {
                    AppError::InvalidArgument(format!("request body: {}", rejection.body_text()))
                }
            })?;
        Ok(WebController::from_parts(views, &parts, body))
    }
}
