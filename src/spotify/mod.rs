//! Spotify accounts service and Web API client.
//!
//! Uses the Authorization Code flow: tokens belong to a user session and are
//! passed in per call rather than cached here.

mod types;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Response};

use crate::config::SpotifyConfig;
use crate::session::TokenRecord;

pub use types::{NewPlaylist, Playlist, SpotifyUser, Track};
use types::{AddTracksBody, SearchResponse};

/// Failure of a single outbound Spotify call.
#[derive(Debug, thiserror::Error)]
pub enum SpotifyError {
    #[error("Spotify API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl SpotifyError {
    /// Upstream HTTP status, when the call got far enough to have one.
    pub fn status(&self) -> Option<u16> {
        match self {
            SpotifyError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Operations the auth and playlist flows need from Spotify.
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    /// URL of the consent page for a new authorization request.
    fn authorize_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> Result<TokenRecord, SpotifyError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord, SpotifyError>;

    async fn current_user(&self, access_token: &str) -> Result<SpotifyUser, SpotifyError>;

    async fn search_tracks(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Track>, SpotifyError>;

    async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist: &NewPlaylist,
    ) -> Result<Playlist, SpotifyError>;

    async fn add_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), SpotifyError>;
}

/// reqwest-backed Spotify client.
#[derive(Clone)]
pub struct SpotifyClient {
    client: Client,
    config: SpotifyConfig,
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn token_url(&self) -> String {
        format!("{}/api/token", self.config.accounts_url)
    }

    fn basic_auth(&self) -> String {
        let credentials = base64::engine::general_purpose::STANDARD.encode(
            format!("{}:{}", self.config.client_id, self.config.client_secret).as_bytes(),
        );
        format!("Basic {}", credentials)
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenRecord, SpotifyError> {
        let res = self
            .client
            .post(self.token_url())
            .header("Authorization", self.basic_auth())
            .form(params)
            .send()
            .await?;

        let res = ensure_success(res).await?;
        res.json::<TokenRecord>()
            .await
            .map_err(|e| SpotifyError::Decode(format!("token parse failed: {}", e)))
    }
}

/// Turns a non-2xx response into `SpotifyError::Status`, keeping the body for logs.
async fn ensure_success(res: Response) -> Result<Response, SpotifyError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    Err(SpotifyError::Status { status, body })
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
            self.config.accounts_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&self.config.scopes),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenRecord, SpotifyError> {
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord, SpotifyError> {
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn current_user(&self, access_token: &str) -> Result<SpotifyUser, SpotifyError> {
        let res = self
            .client
            .get(format!("{}/me", self.config.api_url))
            .bearer_auth(access_token)
            .send()
            .await?;

        let res = ensure_success(res).await?;
        res.json()
            .await
            .map_err(|e| SpotifyError::Decode(format!("user parse failed: {}", e)))
    }

    async fn search_tracks(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Track>, SpotifyError> {
        let url = format!(
            "{}/search?q={}&type=track&limit={}&market={}",
            self.config.api_url,
            urlencoding::encode(query),
            limit.clamp(1, 50),
            urlencoding::encode(&self.config.market),
        );

        let res = self.client.get(&url).bearer_auth(access_token).send().await?;

        let res = ensure_success(res).await?;
        let body: SearchResponse = res
            .json()
            .await
            .map_err(|e| SpotifyError::Decode(format!("search parse failed: {}", e)))?;
        Ok(body.tracks.items.into_iter().flatten().map(Track::from).collect())
    }

    async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist: &NewPlaylist,
    ) -> Result<Playlist, SpotifyError> {
        let url = format!(
            "{}/users/{}/playlists",
            self.config.api_url,
            urlencoding::encode(user_id)
        );

        let res = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(playlist)
            .send()
            .await?;

        let res = ensure_success(res).await?;
        res.json()
            .await
            .map_err(|e| SpotifyError::Decode(format!("playlist parse failed: {}", e)))
    }

    async fn add_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), SpotifyError> {
        let url = format!(
            "{}/playlists/{}/tracks",
            self.config.api_url,
            urlencoding::encode(playlist_id)
        );

        let res = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&AddTracksBody { uris })
            .send()
            .await?;

        ensure_success(res).await?;
        Ok(())
    }
}
