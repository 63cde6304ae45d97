//! OAuth session handling: authorization URLs, code exchange, status checks
//! with a single refresh-and-retry, and logout.

use std::sync::Arc;

use base64::Engine;
use rand::Rng;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::session::{TokenCache, TokenRecord};
use crate::spotify::{SpotifyApi, SpotifyUser};

/// Authorization URL paired with the state that will come back on the callback.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationRequest {
    pub auth_url: String,
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusNote {
    Active,
    Refreshed,
    Anonymous,
    Expired,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip)]
    pub note: StatusNote,
}

impl AuthStatus {
    fn signed_in(user: &SpotifyUser, note: StatusNote) -> Self {
        Self {
            authenticated: true,
            user_id: Some(user.id.clone()),
            display_name: Some(user.name().to_string()),
            note,
        }
    }

    fn signed_out(note: StatusNote) -> Self {
        Self {
            authenticated: false,
            user_id: None,
            display_name: None,
            note,
        }
    }
}

/// 32 random bytes, base64url without padding.
pub fn generate_state() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub struct AuthFlow {
    spotify: Arc<dyn SpotifyApi>,
    tokens: Arc<TokenCache>,
}

impl AuthFlow {
    pub fn new(spotify: Arc<dyn SpotifyApi>, tokens: Arc<TokenCache>) -> Self {
        Self { spotify, tokens }
    }

    /// Builds the consent URL. A state is generated when none is given; the
    /// token cache is not touched.
    pub fn issue_authorization_url(&self, state: Option<String>) -> AuthorizationRequest {
        let state = state
            .filter(|s| !s.is_empty())
            .unwrap_or_else(generate_state);
        let auth_url = self.spotify.authorize_url(&state);
        tracing::debug!("authorization url issued");
        AuthorizationRequest { auth_url, state }
    }

    /// `Unauthenticated` error carrying a new authorization request whose
    /// state never equals `previous`.
    pub fn unauthenticated(&self, previous: &str) -> AppError {
        let mut state = generate_state();
        while state == previous {
            state = generate_state();
        }
        let request = self.issue_authorization_url(Some(state));
        AppError::Unauthenticated {
            auth_url: request.auth_url,
            state: request.state,
        }
    }

    /// Exchanges an authorization code, stores the token under `state` and
    /// reports who signed in.
    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<AuthStatus> {
        if code.is_empty() || state.is_empty() {
            return Err(AppError::BadRequest("code and state are required".into()));
        }

        let record = self.spotify.exchange_code(code).await.map_err(|e| {
            tracing::error!(status = ?e.status(), "code exchange failed: {}", e);
            AppError::AuthExchangeFailed { status: e.status() }
        })?;
        self.tokens.put(state, record.clone()).await;
        let sessions = self.tokens.len().await;
        tracing::info!(sessions, "access token obtained via authorization code");

        let user = self
            .spotify
            .current_user(&record.access_token)
            .await
            .map_err(|e| AppError::upstream("fetching the current user", &e))?;
        tracing::info!(user = %user.name(), "user authenticated");

        Ok(AuthStatus::signed_in(&user, StatusNote::Active))
    }

    /// Reports whether `state` has a working session. A failed identity call
    /// triggers one refresh-and-retry when a refresh token exists; otherwise
    /// the session is dropped.
    pub async fn check_status(&self, state: &str) -> AuthStatus {
        let Some(record) = self.tokens.get(state).await else {
            return AuthStatus::signed_out(StatusNote::Anonymous);
        };

        let err = match self.spotify.current_user(&record.access_token).await {
            Ok(user) => return AuthStatus::signed_in(&user, StatusNote::Active),
            Err(e) => e,
        };
        tracing::warn!(status = ?err.status(), "identity check failed: {}", err);

        if record.refresh_token.is_none() {
            self.tokens.remove(state).await;
            tracing::info!("session without refresh token dropped");
            return AuthStatus::signed_out(StatusNote::Expired);
        }

        match self.refresh_and_identify(state, record).await {
            Ok(user) => AuthStatus::signed_in(&user, StatusNote::Refreshed),
            Err(e) => {
                tracing::warn!("session expired: {}", e);
                self.tokens.remove(state).await;
                AuthStatus::signed_out(StatusNote::Expired)
            }
        }
    }

    async fn refresh_and_identify(&self, state: &str, record: TokenRecord) -> Result<SpotifyUser> {
        let fresh = self.refresh_record(state, record).await?;
        self.spotify
            .current_user(&fresh.access_token)
            .await
            .map_err(|e| AppError::upstream("fetching the current user", &e))
    }

    /// Replaces the stored record with a refreshed one. Spotify may omit the
    /// refresh token on refresh, in which case the previous one is kept.
    async fn refresh_record(&self, state: &str, record: TokenRecord) -> Result<TokenRecord> {
        let refresh_token = record
            .refresh_token
            .ok_or(AppError::RefreshFailed { status: None })?;

        let mut fresh = self
            .spotify
            .refresh(&refresh_token)
            .await
            .map_err(|e| AppError::RefreshFailed { status: e.status() })?;
        if fresh.refresh_token.is_none() {
            fresh.refresh_token = Some(refresh_token);
        }

        self.tokens.put(state, fresh.clone()).await;
        tracing::info!("access token refreshed");
        Ok(fresh)
    }

    pub async fn logout(&self, state: &str) {
        self.tokens.remove(state).await;
        tracing::info!("session logged out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::record;
    use crate::spotify::fake::FakeSpotify;

    fn flow(fake: FakeSpotify) -> (AuthFlow, Arc<FakeSpotify>, Arc<TokenCache>) {
        let fake = Arc::new(fake);
        let tokens = Arc::new(TokenCache::new());
        (AuthFlow::new(fake.clone(), tokens.clone()), fake, tokens)
    }

    #[test]
    fn generated_states_are_url_safe_and_unique() {
        let a = generate_state();
        let b = generate_state();
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(a, b);
    }

    #[test]
    fn flow_futures_are_send() {
        fn assert_send<T: Send>(_: T) {}
        let (auth, _, _) = flow(FakeSpotify::new());
        assert_send(auth.exchange_code("code", "state"));
        assert_send(auth.check_status("state"));
        assert_send(auth.logout("state"));
    }

    #[tokio::test]
    async fn issue_keeps_given_state_and_leaves_cache_alone() {
        let (auth, _, tokens) = flow(FakeSpotify::new());

        let request = auth.issue_authorization_url(Some("given".into()));
        assert_eq!(request.state, "given");
        assert!(request.auth_url.ends_with("state=given"));

        let generated = auth.issue_authorization_url(None);
        assert!(!generated.state.is_empty());
        assert_eq!(tokens.len().await, 0);
    }

    #[tokio::test]
    async fn unauthenticated_error_uses_a_new_state() {
        let (auth, _, _) = flow(FakeSpotify::new());
        match auth.unauthenticated("old-state") {
            AppError::Unauthenticated { auth_url, state } => {
                assert_ne!(state, "old-state");
                assert!(auth_url.contains(&state));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn exchange_stores_token_under_state() {
        let fake = FakeSpotify::new()
            .on_exchange(Ok(record("access", Some("refresh"))))
            .on_user(Ok("user-1"));
        let (auth, _, tokens) = flow(fake);

        let status = auth.exchange_code("code", "state").await.unwrap();

        assert!(status.authenticated);
        assert_eq!(status.user_id.as_deref(), Some("user-1"));
        assert_eq!(tokens.get("state").await.unwrap().access_token, "access");
    }

    #[tokio::test]
    async fn exchange_failure_carries_upstream_status() {
        let (auth, _, tokens) = flow(FakeSpotify::new().on_exchange(Err(400)));

        match auth.exchange_code("bad", "state").await {
            Err(AppError::AuthExchangeFailed { status }) => assert_eq!(status, Some(400)),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(tokens.get("state").await.is_none());
    }

    #[tokio::test]
    async fn status_without_session_is_anonymous() {
        let (auth, fake, _) = flow(FakeSpotify::new());

        let status = auth.check_status("missing").await;

        assert!(!status.authenticated);
        assert_eq!(status.note, StatusNote::Anonymous);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn status_with_valid_token_is_authenticated() {
        let (auth, _, tokens) = flow(FakeSpotify::new().on_user(Ok("user-1")));
        tokens.put("state", record("access", None)).await;

        let status = auth.check_status("state").await;

        assert!(status.authenticated);
        assert_eq!(status.note, StatusNote::Active);
        assert_eq!(status.display_name.as_deref(), Some("user-1 display"));
    }

    #[tokio::test]
    async fn failed_identity_without_refresh_token_drops_session() {
        let (auth, fake, tokens) = flow(FakeSpotify::new().on_user(Err(401)));
        tokens.put("state", record("stale", None)).await;

        let status = auth.check_status("state").await;

        assert!(!status.authenticated);
        assert_eq!(status.note, StatusNote::Expired);
        assert!(tokens.get("state").await.is_none());
        assert_eq!(fake.calls(), vec!["me:stale"]);
    }

    #[tokio::test]
    async fn failed_identity_refreshes_and_retries_once() {
        let fake = FakeSpotify::new()
            .on_user(Err(401))
            .on_refresh(Ok(record("fresh", Some("refresh-2"))))
            .on_user(Ok("user-1"));
        let (auth, fake, tokens) = flow(fake);
        tokens.put("state", record("stale", Some("refresh-1"))).await;

        let status = auth.check_status("state").await;

        assert!(status.authenticated);
        assert_eq!(status.note, StatusNote::Refreshed);
        let stored = tokens.get("state").await.unwrap();
        assert_eq!(stored, record("fresh", Some("refresh-2")));
        assert_eq!(fake.calls(), vec!["me:stale", "refresh:refresh-1", "me:fresh"]);
    }

    #[tokio::test]
    async fn refresh_keeps_previous_refresh_token_when_omitted() {
        let fake = FakeSpotify::new()
            .on_user(Err(401))
            .on_refresh(Ok(record("fresh", None)))
            .on_user(Ok("user-1"));
        let (auth, _, tokens) = flow(fake);
        tokens.put("state", record("stale", Some("refresh-1"))).await;

        auth.check_status("state").await;

        let stored = tokens.get("state").await.unwrap();
        assert_eq!(stored.access_token, "fresh");
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn failed_refresh_drops_session() {
        let fake = FakeSpotify::new().on_user(Err(401)).on_refresh(Err(400));
        let (auth, _, tokens) = flow(fake);
        tokens.put("state", record("stale", Some("refresh-1"))).await;

        let status = auth.check_status("state").await;

        assert!(!status.authenticated);
        assert_eq!(status.note, StatusNote::Expired);
        assert!(tokens.get("state").await.is_none());
    }

    #[tokio::test]
    async fn failed_retry_after_refresh_drops_session() {
        let fake = FakeSpotify::new()
            .on_user(Err(401))
            .on_refresh(Ok(record("fresh", Some("refresh-2"))))
            .on_user(Err(403));
        let (auth, _, tokens) = flow(fake);
        tokens.put("state", record("stale", Some("refresh-1"))).await;

        let status = auth.check_status("state").await;

        assert!(!status.authenticated);
        assert!(tokens.get("state").await.is_none());
    }

    #[tokio::test]
    async fn logout_twice_is_harmless() {
        let (auth, _, tokens) = flow(FakeSpotify::new());
        tokens.put("state", record("access", None)).await;

        auth.logout("state").await;
        auth.logout("state").await;

        assert_eq!(tokens.len().await, 0);
    }
}
