//! Sign-in, sign-up and sign-out: the glue between `ApiClient` and
//! `SessionStore`. The store is written only after the server has accepted
//! the credentials.

use anyhow::{Context, Result};
use tracing::debug;

use crate::api::ApiClient;
use crate::models::{RegisterRequest, Registration, TokenResponse, User};

use super::SessionStore;

/// Outcome of `sign_up`
#[derive(Debug, Clone)]
pub struct SignUp {
    pub user: Option<User>,
    /// Whether the server logged the new account straight in
    pub signed_in: bool,
}

/// Resolve the profile for a credential-exchange result. Servers that send
/// only a token get asked for the profile with that token.
async fn session_parts(api: &ApiClient, resp: TokenResponse) -> Result<(String, User)> {
    let token = resp.access_token;
    let user = match resp.user {
        Some(user) => user,
        None => {
            debug!("Token response carried no profile, fetching it");
            api.with_token(token.clone())
                .test_token()
                .await
                .context("Failed to fetch profile for new token")?
        }
    };
    Ok((token, user))
}

/// Exchange credentials and store the resulting session.
pub async fn sign_in(
    api: &ApiClient,
    session: &SessionStore,
    email: &str,
    password: &str,
) -> Result<User> {
    let resp = api.login(email, password).await.context("Login failed")?;
    let (token, user) = session_parts(api, resp).await?;
    session.set_auth(token, user.clone())?;
    Ok(user)
}

/// Create an account. When the server answers with a token and profile the
/// new account is signed in too.
pub async fn sign_up(
    api: &ApiClient,
    session: &SessionStore,
    request: &RegisterRequest,
) -> Result<SignUp> {
    let registration = api.register(request).await.context("Registration failed")?;

    match registration {
        Registration::Session(resp) => match resp.into_session_parts() {
            Some((token, user)) => {
                session.set_auth(token, user.clone())?;
                Ok(SignUp {
                    user: Some(user),
                    signed_in: true,
                })
            }
            None => Ok(SignUp {
                user: None,
                signed_in: false,
            }),
        },
        Registration::Profile(user) => Ok(SignUp {
            user: Some(user),
            signed_in: false,
        }),
    }
}

pub fn sign_out(session: &SessionStore) -> Result<()> {
    session.clear_auth()
}

/// Check the current token against the server. Nothing is changed locally
/// when the server rejects it.
pub async fn verify(api: &ApiClient) -> Result<User> {
    api.test_token().await.context("Token check failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::auth::SessionState;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, session: &SessionStore) -> ApiClient {
        ApiClient::new(format!("{}/api/v1", server.uri()), session.clone()).unwrap()
    }

    fn has_authorization(request: &wiremock::Request) -> bool {
        request.headers.get("authorization").is_some()
    }

    #[tokio::test]
    async fn sign_in_stores_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "t1",
                "user": {"id": 1, "email": "user@example.com"}
            })))
            .mount(&server)
            .await;

        let session = SessionStore::in_memory();
        let api = client(&server, &session);
        let user = sign_in(&api, &session, "user@example.com", "pw").await.unwrap();

        assert_eq!(user.id, 1);
        assert!(session.is_authenticated());
        assert_eq!(session.token().as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn sign_in_accepts_naive_last_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "t1",
                "token_type": "bearer",
                "user": {
                    "email": "user@example.com",
                    "full_name": "Dev User (user@example.com)",
                    "is_active": true,
                    "id": 1,
                    "is_superuser": false,
                    "last_login": "2024-03-01T12:30:00.123456",
                    "login_count": 3
                }
            })))
            .mount(&server)
            .await;

        let session = SessionStore::in_memory();
        let api = client(&server, &session);
        let user = sign_in(&api, &session, "user@example.com", "pw").await.unwrap();

        assert!(user.last_login.is_some());
        assert_eq!(user.login_count, Some(3));
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_session_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let session = SessionStore::in_memory();
        let api = client(&server, &session);

        // Signed out before
        let err = sign_in(&api, &session, "user@example.com", "pw").await.unwrap_err();
        let api_err = err.downcast_ref::<ApiError>().expect("expected an ApiError");
        assert!(api_err.is_unauthorized());
        assert_eq!(session.snapshot(), SessionState::default());

        // Signed in before
        let previous = User {
            id: 9,
            email: "old@example.com".to_string(),
            full_name: None,
            is_active: true,
            is_superuser: false,
            last_login: None,
            login_count: None,
        };
        session.set_auth("old".to_string(), previous).unwrap();
        let before = session.snapshot();
        assert!(sign_in(&api, &session, "user@example.com", "pw").await.is_err());
        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test]
    async fn sign_in_fetches_missing_profile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "t1", "token_type": "bearer"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/test-token"))
            .and(header("authorization", "Bearer t1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": 4, "email": "user@example.com"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let session = SessionStore::in_memory();
        let api = client(&server, &session);
        let user = sign_in(&api, &session, "user@example.com", "pw").await.unwrap();

        assert_eq!(user.id, 4);
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn requests_carry_token_until_sign_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "abc123",
                "user": {"id": 1, "email": "user@example.com"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/test-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": 1, "email": "user@example.com"})),
            )
            .mount(&server)
            .await;

        let session = SessionStore::in_memory();
        let api = client(&server, &session);

        sign_in(&api, &session, "user@example.com", "pw").await.unwrap();
        verify(&api).await.unwrap();
        sign_out(&session).unwrap();
        let _ = verify(&api).await;

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
        assert!(!has_authorization(&requests[0]));
        assert_eq!(requests[1].headers["authorization"], "Bearer abc123");
        assert!(!has_authorization(&requests[2]));
    }

    #[tokio::test]
    async fn verify_rejection_keeps_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/test-token"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Could not validate credentials"})),
            )
            .mount(&server)
            .await;

        let session = SessionStore::in_memory();
        session
            .set_auth(
                "stale".to_string(),
                User {
                    id: 1,
                    email: "user@example.com".to_string(),
                    full_name: None,
                    is_active: true,
                    is_superuser: false,
                    last_login: None,
                    login_count: None,
                },
            )
            .unwrap();
        let api = client(&server, &session);

        assert!(verify(&api).await.is_err());
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn sign_up_with_token_signs_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "t2",
                "token_type": "bearer",
                "user": {"id": 2, "email": "new@example.com", "full_name": "New User"}
            })))
            .mount(&server)
            .await;

        let session = SessionStore::in_memory();
        let api = client(&server, &session);
        let request = RegisterRequest::new("new@example.com", "secret").with_full_name("New User");
        let outcome = sign_up(&api, &session, &request).await.unwrap();

        assert!(outcome.signed_in);
        assert_eq!(outcome.user.map(|u| u.id), Some(2));
        assert_eq!(session.token().as_deref(), Some("t2"));
    }

    #[tokio::test]
    async fn sign_up_with_profile_only_stays_signed_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/register"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": 3, "email": "new@example.com", "is_active": false})),
            )
            .mount(&server)
            .await;

        let session = SessionStore::in_memory();
        let api = client(&server, &session);
        let outcome = sign_up(&api, &session, &RegisterRequest::new("new@example.com", "secret"))
            .await
            .unwrap();

        assert!(!outcome.signed_in);
        assert_eq!(outcome.user.map(|u| u.id), Some(3));
        assert!(!session.is_authenticated());
    }
}
