//! Authentication route handlers.
//!
//! Handles registration, login, and logout. Form actions answer with
//! redirects carrying a query-string notice; the login/register GET
//! endpoints just echo those notices back for the client to render.

use axum::{
    Form, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::AppError;
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthError, AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for error/success notices.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
    pub notice: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Login surface placeholder: echoes redirect notices for the client.
pub async fn login_page(Query(query): Query<MessageQuery>) -> Json<MessageQuery> {
    Json(query)
}

/// Register surface placeholder: echoes redirect notices for the client.
pub async fn register_page(Query(query): Query<MessageQuery>) -> Json<MessageQuery> {
    Json(query)
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let auth = AuthService::new(state.pool());

    match auth.login(&form.email, &form.password).await {
        Ok(user) => establish_session(&session, &user, "/").await,
        Err(AuthError::InvalidCredentials | AuthError::InvalidEmail(_)) => {
            Redirect::to("/login?error=credentials").into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Handle registration form submission.
///
/// Validates, registers, and logs the new user in.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let auth = AuthService::new(state.pool());

    let registration = Registration {
        name: form.name,
        email: form.email,
        password: form.password,
        password_confirm: form.password_confirm,
    };

    match auth.register(&registration).await {
        Ok(user) => establish_session(&session, &user, "/?success=welcome").await,
        Err(AuthError::UserAlreadyExists) => {
            Redirect::to("/register?error=email-taken").into_response()
        }
        // Per-field detail goes out as a structured validation response
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Handle logout.
///
/// Clears the session; calling it while logged out is harmless.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }

    // Also destroy the entire session
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {}", e);
    }

    Redirect::to("/?success=logged-out").into_response()
}

/// Store the user in the session and redirect, or fail onto the login page.
pub(super) async fn establish_session(session: &Session, user: &User, to: &str) -> Response {
    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
    };

    if let Err(e) = set_current_user(session, &current).await {
        tracing::error!("Failed to set session: {}", e);
        return Redirect::to("/login?error=session").into_response();
    }

    Redirect::to(to).into_response()
}
