use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use crate::extract::{ApiJson, ApiMultipart};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{Account, AuthResponse, LoginRequest, SignupForm};
use super::password::{hash_password, verify_password};
use super::repo::{NewUser, User};
use super::token::generate_token;
use crate::error::{is_unique_violation, ApiError};
use crate::state::AppState;
use crate::storage::{object_key, object_url, ImageRef, UploadItem};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/signup", post(signup))
        .route("/user/login", post(login))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

async fn read_signup_form(mut mp: Multipart) -> Result<SignupForm, ApiError> {
    let mut form = SignupForm::default();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.to_string()))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("email") => form.email = Some(field.text().await.map_err(bad_part)?),
            Some("password") => form.password = Some(field.text().await.map_err(bad_part)?),
            Some("username") => form.username = Some(field.text().await.map_err(bad_part)?),
            Some("newsletter") => {
                let raw = field.text().await.map_err(bad_part)?;
                form.newsletter = matches!(raw.as_str(), "true" | "on" | "1");
            }
            Some("avatar") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field.bytes().await.map_err(bad_part)?;
                form.avatar = Some(UploadItem { body, content_type });
            }
            _ => {}
        }
    }
    Ok(form)
}

fn bad_part(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::validation(e.to_string())
}

#[instrument(skip(state, mp))]
pub async fn signup(
    State(state): State<AppState>,
    ApiMultipart(mp): ApiMultipart,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let mut form = read_signup_form(mp).await?;
    if let Some(email) = form.email.as_mut() {
        *email = email.trim().to_lowercase();
    }
    let (username, email, password) = form.validate()?;

    if !is_valid_email(email) {
        warn!(%email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }

    if User::find_by_email(&state.db, email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(ApiError::Conflict("This email is already registered".into()));
    }

    let password_hash = hash_password(password)?;
    let token = generate_token();
    let user_id = Uuid::new_v4();

    // The avatar is namespaced by the user id before the row exists, so a
    // failed upload leaves no user behind.
    let avatar = match &form.avatar {
        Some(item) => {
            let key = object_key(&format!("users/{}", user_id), Uuid::new_v4());
            state
                .storage
                .put_object(&key, item.body.clone(), &item.content_type)
                .await?;
            Some(ImageRef {
                secure_url: object_url(&state.config.storage, &key),
                public_id: key,
            })
        }
        None => None,
    };

    // A concurrent signup can slip past the lookup above; the unique
    // constraint on users.email is the source of truth.
    let user = User::create(
        &state.db,
        NewUser {
            id: user_id,
            email,
            username,
            password_hash: &password_hash,
            token: &token,
            newsletter: form.newsletter,
            avatar: avatar.as_ref(),
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict("This email is already registered".into())
        } else {
            e.into()
        }
    })?;

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            id: user.id,
            token: user.token,
            account: Account {
                username: user.username,
                avatar,
            },
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::unauthorized()
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized());
    }

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        id: user.id,
        token: user.token,
        account: Account {
            username: user.username,
            avatar: None,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("jo@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("missing@tld"));
    }
}
