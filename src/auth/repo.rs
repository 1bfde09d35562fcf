use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::storage::ImageRef;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub newsletter: bool,
    pub avatar_public_id: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: OffsetDateTime,
}

pub struct NewUser<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub token: &'a str,
    pub newsletter: bool,
    pub avatar: Option<&'a ImageRef>,
}

const USER_COLUMNS: &str = "id, email, username, password_hash, token, newsletter, \
                            avatar_public_id, avatar_url, created_at";

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_token(db: &PgPool, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a user with a caller-supplied id; the avatar (if any) was
    /// already uploaded under that id. Returns the raw `sqlx::Error` so the
    /// caller can tell a unique violation from any other failure.
    pub async fn create(db: &PgPool, new: NewUser<'_>) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users \
                 (id, email, username, password_hash, token, newsletter, \
                  avatar_public_id, avatar_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new.id)
        .bind(new.email)
        .bind(new.username)
        .bind(new.password_hash)
        .bind(new.token)
        .bind(new.newsletter)
        .bind(new.avatar.map(|a| a.public_id.as_str()))
        .bind(new.avatar.map(|a| a.secure_url.as_str()))
        .fetch_one(db)
        .await
    }

    pub fn avatar(&self) -> Option<ImageRef> {
        match (&self.avatar_public_id, &self.avatar_url) {
            (Some(public_id), Some(secure_url)) => Some(ImageRef {
                public_id: public_id.clone(),
                secure_url: secure_url.clone(),
            }),
            _ => None,
        }
    }
}
