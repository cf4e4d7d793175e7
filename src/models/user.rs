use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::UserRole;

/// A registered account. `credential_hash` never leaves the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub role: UserRole,
    pub credential_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Registration payload
#[derive(Clone, Serialize, Deserialize)]
pub struct UserRequest {
    pub name: String,
    pub email: String,
    #[serde(alias = "credential")]
    pub password: String,
    #[serde(default)]
    pub mobile: Option<String>,
}

impl fmt::Debug for UserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("mobile", &self.mobile)
            .finish()
    }
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Lower-cased, trimmed form used for storage and lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Build a new user from a validated request and an already hashed credential
    pub fn new(request: &UserRequest, credential_hash: String) -> Self {
        let mobile = request
            .mobile
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Self {
            id: Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            email: normalize_email(&request.email),
            mobile,
            role: UserRole::User,
            credential_hash,
            created_at: Utc::now(),
        }
    }

    pub fn to_response(&self) -> UserResponse {
        UserResponse::from(self)
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            mobile: user.mobile.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> UserRequest {
        UserRequest {
            name: "  Asha Rao ".to_string(),
            email: " Asha@Example.COM ".to_string(),
            password: "s3cret-pass".to_string(),
            mobile: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_user_creation_normalizes_fields() {
        let user = User::new(&request(), "hash".to_string());

        assert_eq!(user.name, "Asha Rao");
        assert_eq!(user.email, "asha@example.com");
        assert_eq!(user.mobile, None);
        assert_eq!(user.role, UserRole::User);
        assert!(Uuid::parse_str(&user.id).is_ok());
    }

    #[test]
    fn test_response_excludes_credential() {
        let user = User::new(&request(), "argon-hash".to_string());
        let json = serde_json::to_string(&user.to_response()).unwrap();

        assert!(json.contains("asha@example.com"));
        assert!(!json.contains("argon-hash"));
        assert!(!json.contains("credential"));
    }

    #[test]
    fn test_request_debug_redacts_password() {
        let debug = format!("{:?}", request());
        assert!(!debug.contains("s3cret-pass"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_request_accepts_credential_alias() {
        let request: UserRequest = serde_json::from_str(
            r#"{"name": "A", "email": "a@x.com", "credential": "hunter22"}"#,
        )
        .unwrap();
        assert_eq!(request.password, "hunter22");
        assert_eq!(request.mobile, None);
    }
}
