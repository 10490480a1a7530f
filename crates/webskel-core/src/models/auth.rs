//! Request and response payloads of the `/auth` endpoints.

use serde::{Deserialize, Serialize};

use super::User;

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Result of a credential exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub user: Option<User>,
}

impl TokenResponse {
    /// Split into the `(token, user)` pair the session store takes.
    /// `None` when the server did not include a profile.
    pub fn into_session_parts(self) -> Option<(String, User)> {
        let user = self.user?;
        Some((self.access_token, user))
    }
}

/// Sign-up payload, sent as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl RegisterRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            full_name: None,
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }
}

/// What `/auth/register` answers with. Servers either log the new account in
/// straight away (token + profile) or return just the created profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Registration {
    Session(TokenResponse),
    Profile(User),
}

impl Registration {
    /// The created user's profile, if the response included one.
    pub fn user(&self) -> Option<&User> {
        match self {
            Registration::Session(token) => token.user.as_ref(),
            Registration::Profile(user) => Some(user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_response() {
        let json = r#"{"access_token":"t1","user":{"id":1,"email":"user@example.com"}}"#;
        let resp: TokenResponse = serde_json::from_str(json).expect("Failed to parse token");
        assert_eq!(resp.token_type, "bearer");

        let (token, user) = resp.into_session_parts().expect("Missing session parts");
        assert_eq!(token, "t1");
        assert_eq!(user.email, "user@example.com");
    }

    #[test]
    fn test_token_without_user_has_no_session_parts() {
        let resp: TokenResponse =
            serde_json::from_str(r#"{"access_token":"t1","token_type":"bearer"}"#)
                .expect("Failed to parse token");
        assert!(resp.into_session_parts().is_none());
    }

    #[test]
    fn test_register_request_omits_missing_full_name() {
        let body = serde_json::to_value(RegisterRequest::new("a@b.c", "pw")).unwrap();
        assert_eq!(body, serde_json::json!({"email": "a@b.c", "password": "pw"}));

        let body = serde_json::to_value(RegisterRequest::new("a@b.c", "pw").with_full_name("Ada"))
            .unwrap();
        assert_eq!(body["full_name"], "Ada");
    }

    #[test]
    fn test_registration_variants() {
        let session: Registration = serde_json::from_str(
            r#"{"access_token":"t2","token_type":"bearer","user":{"id":2,"email":"new@example.com"}}"#,
        )
        .unwrap();
        assert!(matches!(session, Registration::Session(_)));
        assert_eq!(session.user().map(|u| u.id), Some(2));

        let profile: Registration =
            serde_json::from_str(r#"{"id":3,"email":"other@example.com","is_active":false}"#)
                .unwrap();
        match profile {
            Registration::Profile(ref user) => assert!(!user.is_active),
            _ => panic!("expected a bare profile"),
        }
    }
}
