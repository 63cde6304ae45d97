//! Scripted in-memory `SpotifyApi` for controller and router tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{NewPlaylist, Playlist, SpotifyApi, SpotifyError, SpotifyUser, Track};
use crate::session::TokenRecord;

type Scripted<T> = Mutex<VecDeque<Result<T, u16>>>;

/// Each call pops the next scripted outcome; `Err(code)` becomes an HTTP
/// status error. An empty search script yields no tracks, any other empty
/// script fails with 500.
#[derive(Default)]
pub struct FakeSpotify {
    exchanges: Scripted<TokenRecord>,
    refreshes: Scripted<TokenRecord>,
    users: Scripted<SpotifyUser>,
    searches: Scripted<Vec<Track>>,
    playlists: Scripted<Playlist>,
    additions: Scripted<()>,
    pub calls: Mutex<Vec<String>>,
    pub added_uris: Mutex<Vec<String>>,
}

fn pop<T>(script: &Scripted<T>) -> Option<Result<T, SpotifyError>> {
    script.lock().unwrap().pop_front().map(|r| {
        r.map_err(|status| SpotifyError::Status {
            status,
            body: String::new(),
        })
    })
}

fn missing<T>() -> Result<T, SpotifyError> {
    Err(SpotifyError::Status {
        status: 500,
        body: "unscripted call".into(),
    })
}

impl FakeSpotify {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_exchange(self, outcome: Result<TokenRecord, u16>) -> Self {
        self.exchanges.lock().unwrap().push_back(outcome);
        self
    }

    pub fn on_refresh(self, outcome: Result<TokenRecord, u16>) -> Self {
        self.refreshes.lock().unwrap().push_back(outcome);
        self
    }

    pub fn on_user(self, outcome: Result<&str, u16>) -> Self {
        let outcome = outcome.map(|id| SpotifyUser {
            id: id.to_string(),
            display_name: Some(format!("{id} display")),
        });
        self.users.lock().unwrap().push_back(outcome);
        self
    }

    pub fn on_search(self, outcome: Result<Vec<Track>, u16>) -> Self {
        self.searches.lock().unwrap().push_back(outcome);
        self
    }

    pub fn on_create(self, outcome: Result<&str, u16>) -> Self {
        let outcome = outcome.map(|id| {
            serde_json::from_value::<Playlist>(serde_json::json!({
                "id": id,
                "name": "created",
                "external_urls": { "spotify": format!("https://open.spotify.com/playlist/{id}") },
            }))
            .unwrap()
        });
        self.playlists.lock().unwrap().push_back(outcome);
        self
    }

    pub fn on_add(self, outcome: Result<(), u16>) -> Self {
        self.additions.lock().unwrap().push_back(outcome);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

/// `count` distinct tracks whose ids start with `prefix`.
pub fn tracks(prefix: &str, count: usize) -> Vec<Track> {
    (0..count)
        .map(|i| Track {
            id: format!("{prefix}{i}"),
            name: format!("Track {prefix}{i}"),
            artists: vec!["Artist".into()],
            uri: format!("spotify:track:{prefix}{i}"),
        })
        .collect()
}

#[async_trait]
impl SpotifyApi for FakeSpotify {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://accounts.example/authorize?state={state}")
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenRecord, SpotifyError> {
        self.record(format!("exchange:{code}"));
        pop(&self.exchanges).unwrap_or_else(missing)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord, SpotifyError> {
        self.record(format!("refresh:{refresh_token}"));
        pop(&self.refreshes).unwrap_or_else(missing)
    }

    async fn current_user(&self, access_token: &str) -> Result<SpotifyUser, SpotifyError> {
        self.record(format!("me:{access_token}"));
        pop(&self.users).unwrap_or_else(missing)
    }

    async fn search_tracks(
        &self,
        _access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Track>, SpotifyError> {
        self.record(format!("search:{query}:{limit}"));
        pop(&self.searches).unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn create_playlist(
        &self,
        _access_token: &str,
        user_id: &str,
        playlist: &NewPlaylist,
    ) -> Result<Playlist, SpotifyError> {
        self.record(format!("create:{user_id}:{}", playlist.name));
        pop(&self.playlists).unwrap_or_else(missing)
    }

    async fn add_tracks(
        &self,
        _access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), SpotifyError> {
        self.record(format!("add:{playlist_id}:{}", uris.len()));
        self.added_uris.lock().unwrap().extend_from_slice(uris);
        pop(&self.additions).unwrap_or(Ok(()))
    }
}
