//! Builds a Spotify playlist for a mood: search the catalog with the mood's
//! queries, create the playlist, add the collected tracks.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::mood::Mood;
use crate::services::AuthFlow;
use crate::session::TokenCache;
use crate::spotify::{NewPlaylist, SpotifyApi, Track};

/// Largest page requested per search query.
const SEARCH_PAGE_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistResult {
    pub playlist_id: String,
    pub playlist_url: String,
    pub tracks: Vec<Track>,
}

pub struct PlaylistFlow {
    spotify: Arc<dyn SpotifyApi>,
    tokens: Arc<TokenCache>,
    auth: Arc<AuthFlow>,
    target: usize,
}

impl PlaylistFlow {
    pub fn new(
        spotify: Arc<dyn SpotifyApi>,
        tokens: Arc<TokenCache>,
        auth: Arc<AuthFlow>,
        target: usize,
    ) -> Self {
        Self {
            spotify,
            tokens,
            auth,
            target: target.max(1),
        }
    }

    /// Creates a playlist for `mood` owned by the user of session `state`.
    ///
    /// Nothing is rolled back: if adding tracks fails the empty playlist stays
    /// on the user's account.
    pub async fn create_playlist(&self, mood: Mood, state: &str) -> Result<PlaylistResult> {
        tracing::info!(%mood, "creating playlist");

        let Some(record) = self.tokens.get(state).await else {
            return Err(self.auth.unauthenticated(state));
        };
        let token = record.access_token.as_str();

        let user = self
            .spotify
            .current_user(token)
            .await
            .map_err(|e| AppError::upstream("fetching the current user", &e))?;

        let tracks = self.collect_tracks(token, mood).await?;
        if tracks.is_empty() {
            return Err(AppError::NoTracksFound(mood.to_string()));
        }

        let request = NewPlaylist {
            name: format!("Mood Playlist - {}", mood.title()),
            description: format!("Playlist created automatically based on mood: {}", mood),
            public: true,
        };
        let playlist = self
            .spotify
            .create_playlist(token, &user.id, &request)
            .await
            .map_err(|e| AppError::upstream("creating the playlist", &e))?;

        let uris: Vec<String> = tracks.iter().map(|t| t.uri.clone()).collect();
        self.spotify
            .add_tracks(token, &playlist.id, &uris)
            .await
            .map_err(|e| {
                tracing::error!(playlist = %playlist.id, "playlist left without tracks");
                AppError::upstream("adding tracks to the playlist", &e)
            })?;

        tracing::info!(
            playlist = %playlist.id,
            name = %playlist.name,
            tracks = tracks.len(),
            user = %user.name(),
            "playlist created"
        );

        Ok(PlaylistResult {
            playlist_url: playlist.url(),
            playlist_id: playlist.id,
            tracks,
        })
    }

    /// Runs the mood's queries in order until the target count of unique
    /// tracks is reached or the queries run out.
    async fn collect_tracks(&self, token: &str, mood: Mood) -> Result<Vec<Track>> {
        let mut seen = HashSet::new();
        let mut tracks = Vec::with_capacity(self.target);

        for query in mood.search_queries() {
            if tracks.len() >= self.target {
                break;
            }
            let limit = (self.target - tracks.len()).min(SEARCH_PAGE_LIMIT) as u32;

            let found = self
                .spotify
                .search_tracks(token, query, limit)
                .await
                .map_err(|e| AppError::upstream("searching tracks", &e))?;
            tracing::debug!(query, found = found.len(), "search page");

            for track in found {
                if tracks.len() >= self.target {
                    break;
                }
                if seen.insert(track.id.clone()) {
                    tracks.push(track);
                }
            }
        }

        tracing::info!(%mood, tracks = tracks.len(), "tracks collected");
        Ok(tracks)
    }
}
