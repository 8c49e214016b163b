//! Identity provider adapter.
//!
//! Sign-in, sign-up, password recovery and the admin user operations are
//! delegated to a GoTrue-compatible auth service over REST. Every successful
//! session change is published on a broadcast channel.

use async_trait::async_trait;
use casetrack_core::{AppError, AppResult, IdentityConfig};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use utoipa::ToSchema;

/// Domain appended to bare usernames so they can sign in with a password.
pub const LOCAL_EMAIL_DOMAIN: &str = "local.invalid";

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: IdentityUser,
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn { user_id: String },
    SignedUp { email: String },
    SignedOut,
    PasswordRecovery { email: String },
    UserCreated { email: String },
    UserConfirmed { email: String },
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, identifier: &str, password: &str) -> AppResult<AuthSession>;

    /// Returns the session when the provider issues one immediately.
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<Option<AuthSession>>;

    async fn reset_password(&self, email: &str) -> AppResult<()>;

    async fn sign_out(&self, access_token: &str) -> AppResult<()>;

    /// Admin: creates a pre-confirmed user.
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AppResult<IdentityUser>;

    /// Admin: marks an existing user's email as confirmed.
    async fn confirm_user(&self, email: &str) -> AppResult<IdentityUser>;

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}

/// Maps a bare username to a synthetic email address.
pub fn identifier_to_email(identifier: &str) -> String {
    let identifier = identifier.trim();
    if identifier.contains('@') {
        identifier.to_string()
    } else {
        format!("{}@{}", identifier, LOCAL_EMAIL_DOMAIN)
    }
}

#[derive(Debug, Deserialize)]
struct UserList {
    #[serde(default)]
    users: Vec<IdentityUser>,
}

#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<IdentityUser>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl SignUpResponse {
    fn into_session(self) -> Option<AuthSession> {
        let access_token = self.access_token?;
        let user = self.user.or_else(|| {
            self.id.map(|id| IdentityUser {
                id,
                email: self.email,
            })
        })?;
        Some(AuthSession {
            access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
            user,
        })
    }
}

/// GoTrue REST client. `url` is the auth service root (e.g. `https://host/auth/v1`).
pub struct GoTrueIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    service_key: Option<String>,
    events: broadcast::Sender<SessionEvent>,
}

impl GoTrueIdentityProvider {
    pub fn new(client: reqwest::Client, config: &IdentityConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            service_key: config.service_key.clone(),
            events,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn public(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header("apikey", &self.api_key)
    }

    fn admin(&self, request: reqwest::RequestBuilder) -> AppResult<reqwest::RequestBuilder> {
        let key = self.service_key.as_deref().ok_or_else(|| {
            AppError::ServiceUnavailable(
                "Admin identity operations require IDENTITY_SERVICE_KEY".to_string(),
            )
        })?;
        Ok(request.header("apikey", key).bearer_auth(key))
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> AppResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Identity service unreachable: {}", e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(provider_error(status, &body))
    }

    async fn json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
        response.json::<T>().await.map_err(|e| {
            AppError::IdentityProvider(format!("Unexpected identity service response: {}", e))
        })
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<IdentityUser> {
        let request = self.admin(self.client.get(self.endpoint("/admin/users")))?;
        let list: UserList = Self::json(self.send(request).await?).await?;
        list.users
            .into_iter()
            .find(|u| u.email.as_deref() == Some(email))
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", email)))
    }
}

/// Message carried by GoTrue error bodies, falling back to the raw body.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(String::from))
        })
        .unwrap_or_else(|| body.to_string())
}

fn provider_error(status: u16, body: &str) -> AppError {
    let message = provider_message(body);
    match status {
        400 | 401 | 403 if message.to_lowercase().contains("invalid login") => {
            AppError::Unauthorized(message)
        }
        401 | 403 => AppError::Unauthorized(message),
        404 => AppError::NotFound(message),
        400..=499 => AppError::InvalidInput(message),
        _ => AppError::IdentityProvider(format!("Identity service returned {}: {}", status, message)),
    }
}

#[async_trait]
impl IdentityProvider for GoTrueIdentityProvider {
    #[tracing::instrument(skip(self, password), fields(operation = "sign_in"))]
    async fn sign_in(&self, identifier: &str, password: &str) -> AppResult<AuthSession> {
        let email = identifier_to_email(identifier);
        let request = self
            .public(self.client.post(self.endpoint("/token?grant_type=password")))
            .json(&json!({ "email": email, "password": password }));
        let session: AuthSession = Self::json(self.send(request).await?).await?;

        self.publish(SessionEvent::SignedIn {
            user_id: session.user.id.clone(),
        });
        Ok(session)
    }

    #[tracing::instrument(skip(self, password), fields(operation = "sign_up"))]
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<Option<AuthSession>> {
        let request = self
            .public(self.client.post(self.endpoint("/signup")))
            .json(&json!({ "email": email, "password": password }));
        let response: SignUpResponse = Self::json(self.send(request).await?).await?;

        self.publish(SessionEvent::SignedUp {
            email: email.to_string(),
        });
        Ok(response.into_session())
    }

    #[tracing::instrument(skip(self), fields(operation = "reset_password"))]
    async fn reset_password(&self, email: &str) -> AppResult<()> {
        let request = self
            .public(self.client.post(self.endpoint("/recover")))
            .json(&json!({ "email": email }));
        self.send(request).await?;

        self.publish(SessionEvent::PasswordRecovery {
            email: email.to_string(),
        });
        Ok(())
    }

    #[tracing::instrument(skip(self, access_token), fields(operation = "sign_out"))]
    async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        let request = self
            .public(self.client.post(self.endpoint("/logout")))
            .bearer_auth(access_token);
        self.send(request).await?;

        self.publish(SessionEvent::SignedOut);
        Ok(())
    }

    #[tracing::instrument(skip(self, password), fields(operation = "create_user"))]
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AppResult<IdentityUser> {
        let request = self
            .admin(self.client.post(self.endpoint("/admin/users")))?
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
                "user_metadata": { "username": username },
            }));
        let user: IdentityUser = Self::json(self.send(request).await?).await?;

        self.publish(SessionEvent::UserCreated {
            email: email.to_string(),
        });
        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(operation = "confirm_user"))]
    async fn confirm_user(&self, email: &str) -> AppResult<IdentityUser> {
        let user = self.find_user_by_email(email).await?;
        let request = self
            .admin(
                self.client
                    .put(self.endpoint(&format!("/admin/users/{}", user.id))),
            )?
            .json(&json!({ "email_confirm": true }));
        let confirmed: IdentityUser = Self::json(self.send(request).await?).await?;

        self.publish(SessionEvent::UserConfirmed {
            email: email.to_string(),
        });
        Ok(confirmed)
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Logs session events until the provider is dropped.
pub fn spawn_session_logger(mut events: broadcast::Receiver<SessionEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::info!(event = ?event, "Session event"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
