//! Account route handlers: profile updates and the password-reset flow.

use axum::{
    Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::routes::auth::establish_session;
use crate::services::auth::{AuthError, AuthService};
use crate::services::reset::{PasswordResetService, ResetError};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Account update form data.
#[derive(Debug, Deserialize)]
pub struct AccountForm {
    pub name: String,
    pub email: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetForm {
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Account
// =============================================================================

/// Current account data.
///
/// # Errors
///
/// Returns `AppError` if the session user no longer exists.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>, AppError> {
    let auth = AuthService::new(state.pool());
    let user = auth.get_user(current.id).await?;
    Ok(Json(user))
}

/// Handle account update form submission.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    session: Session,
    Form(form): Form<AccountForm>,
) -> Response {
    let auth = AuthService::new(state.pool());

    match auth.update_account(current.id, &form.name, &form.email).await {
        Ok(user) => {
            // Refresh the session copy so later requests see the new identity
            establish_session(&session, &user, "/account?success=updated").await
        }
        Err(AuthError::UserAlreadyExists) => {
            Redirect::to("/account?error=email-taken").into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

// =============================================================================
// Password Reset
// =============================================================================

/// Handle the forgot-password form: issue a token and email the link.
pub async fn forgot(
    State(state): State<AppState>,
    Form(form): Form<ForgotForm>,
) -> Response {
    let reset = PasswordResetService::new(
        state.pool(),
        state.mailer(),
        &state.config().base_url,
    );

    match reset.request_reset(&form.email).await {
        Ok(()) => Redirect::to("/login?success=reset-sent").into_response(),
        // Distinct from the generic token notice; inherited behavior.
        Err(ResetError::UserNotFound) => {
            Redirect::to("/login?error=no-such-user").into_response()
        }
        Err(ResetError::InvalidEmail(_)) => {
            Redirect::to("/login?error=invalid-email").into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Check a reset token before the client shows its new-password form.
///
/// Valid tokens answer 204; anything else bounces to the login surface with
/// the one generic token notice.
pub async fn reset_prompt(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Response {
    let reset = PasswordResetService::new(
        state.pool(),
        state.mailer(),
        &state.config().base_url,
    );

    match reset.validate_token(&token).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(ResetError::TokenInvalidOrExpired) => {
            Redirect::to("/login?error=token-expired").into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Handle the new-password form: consume the token, set the password, and
/// log the user in.
pub async fn reset_complete(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
    Form(form): Form<ResetForm>,
) -> Response {
    let reset = PasswordResetService::new(
        state.pool(),
        state.mailer(),
        &state.config().base_url,
    );

    match reset
        .complete_reset(&token, &form.password, &form.password_confirm)
        .await
    {
        Ok(user) => establish_session(&session, &user, "/?success=password-reset").await,
        Err(ResetError::PasswordMismatch) => {
            let to = format!("/account/reset/{token}?error=password-mismatch");
            Redirect::to(&to).into_response()
        }
        Err(ResetError::WeakPassword(_)) => {
            let to = format!("/account/reset/{token}?error=weak-password");
            Redirect::to(&to).into_response()
        }
        Err(ResetError::TokenInvalidOrExpired) => {
            Redirect::to("/login?error=token-expired").into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}
