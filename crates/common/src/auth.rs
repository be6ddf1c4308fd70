use axum::{
    Json,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

pub const USER_SESSION_KEY: &str = "user_id";

/// The signed-in user, inserted into request extensions by [`auth_middleware`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
}

pub async fn auth_middleware(session: Session, mut request: Request, next: Next) -> Response {
    let user_id: Option<i64> = match session.get(USER_SESSION_KEY).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Failed to read session: {}", e);
            None
        }
    };

    match user_id {
        Some(id) => {
            request.extensions_mut().insert(CurrentUser { id });
            next.run(request).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Not signed in" })),
        )
            .into_response(),
    }
}
