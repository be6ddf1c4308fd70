use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use common::{AppState, auth::USER_SESSION_KEY};
use serde_json::json;
use std::sync::Arc;
use tower_sessions::Session;
use users::models::Credentials;
use users::service::{UserError, UserService};

pub struct AuthError(UserError);

impl From<UserError> for AuthError {
    fn from(err: UserError) -> Self {
        AuthError(err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, msg) = match self.0 {
            UserError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            UserError::Conflict => (StatusCode::CONFLICT, "Email is already registered".to_string()),
            UserError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string()),
            UserError::Infrastructure(e) => {
                tracing::error!("Auth infrastructure error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

fn session_failure(e: tower_sessions::session::Error) -> AuthError {
    AuthError(UserError::Infrastructure(format!("session store: {e}")))
}

pub fn auth_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .with_state(state)
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse, AuthError> {
    let id = UserService::register(&state.db, credentials).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse, AuthError> {
    let user = UserService::authenticate(&state.db, &credentials).await?;

    // New id on privilege change.
    session.cycle_id().await.map_err(session_failure)?;
    session.insert(USER_SESSION_KEY, user.id).await.map_err(session_failure)?;

    tracing::info!(user_id = user.id, "User signed in");
    Ok(Json(user))
}

async fn logout(session: Session) -> Result<impl IntoResponse, AuthError> {
    session.flush().await.map_err(session_failure)?;
    Ok(StatusCode::NO_CONTENT)
}
