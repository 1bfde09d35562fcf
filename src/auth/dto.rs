use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::storage::{ImageRef, UploadItem};

/// Fields collected from the multipart signup form.
#[derive(Debug, Default)]
pub struct SignupForm {
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
    pub newsletter: bool,
    pub avatar: Option<UploadItem>,
}

impl SignupForm {
    /// Presence checks at the boundary; each missing field gets its own
    /// message, like the original flow.
    pub fn validate(&self) -> Result<(&str, &str, &str), ApiError> {
        let username = self
            .username
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::validation("Please provide a username"))?;
        let email = self
            .email
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::validation("Please provide an email"))?;
        let password = self
            .password
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::validation("Please provide a password"))?;
        Ok((username, email, password))
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public account summary nested in auth responses.
#[derive(Debug, Serialize)]
pub struct Account {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<ImageRef>,
}

/// Response returned after signup or login. The bearer token appears here
/// and nowhere else; hash and salt are never serialized.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub token: String,
    pub account: Account,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> SignupForm {
        SignupForm {
            email: Some("jo@example.com".into()),
            password: Some("s3cret-enough".into()),
            username: Some("jo".into()),
            newsletter: true,
            avatar: None,
        }
    }

    #[test]
    fn complete_form_passes_validation() {
        let form = filled();
        let (username, email, password) = form.validate().unwrap();
        assert_eq!(username, "jo");
        assert_eq!(email, "jo@example.com");
        assert_eq!(password, "s3cret-enough");
    }

    #[test]
    fn missing_or_empty_username_is_rejected() {
        let mut form = filled();
        form.username = None;
        assert!(form.validate().is_err());
        form.username = Some(String::new());
        assert!(form.validate().is_err());
    }

    #[test]
    fn missing_email_is_rejected() {
        let mut form = filled();
        form.email = None;
        assert!(form.validate().is_err());
    }

    #[test]
    fn missing_password_is_rejected() {
        let mut form = filled();
        form.password = None;
        assert!(form.validate().is_err());
    }

    #[test]
    fn auth_response_uses_the_wire_id_field_and_hides_nothing_else() {
        let response = AuthResponse {
            id: Uuid::new_v4(),
            token: "tok".into(),
            account: Account {
                username: "jo".into(),
                avatar: None,
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("_id").is_some());
        assert_eq!(json["token"], "tok");
        assert_eq!(json["account"]["username"], "jo");
        assert!(json["account"].get("avatar").is_none());
    }
}
