//! Spotify Web API payloads and the trimmed-down shapes handed to callers.

use serde::{Deserialize, Serialize};

/// A catalog track as returned to API clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub uri: String,
}

impl From<TrackItem> for Track {
    fn from(t: TrackItem) -> Self {
        Track {
            id: t.id,
            name: t.name,
            artists: t.artists.into_iter().map(|a| a.name).collect(),
            uri: t.uri,
        }
    }
}

/// GET /me
#[derive(Clone, Debug, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl SpotifyUser {
    /// Display name, falling back to the user id when Spotify has none.
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.id)
    }
}

/// Body of POST /users/{id}/playlists.
#[derive(Clone, Debug, Serialize)]
pub struct NewPlaylist {
    pub name: String,
    pub description: String,
    pub public: bool,
}

/// Playlist object returned on creation.
#[derive(Clone, Debug, Deserialize)]
pub struct Playlist {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl Playlist {
    pub fn url(&self) -> String {
        self.external_urls
            .spotify
            .clone()
            .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{}", self.id))
    }
}

#[derive(Serialize)]
pub(super) struct AddTracksBody<'a> {
    pub uris: &'a [String],
}

#[derive(Deserialize)]
pub(super) struct SearchResponse {
    pub tracks: TracksPage,
}

#[derive(Deserialize)]
pub(super) struct TracksPage {
    // Spotify occasionally returns null entries for unavailable tracks.
    #[serde(default)]
    pub items: Vec<Option<TrackItem>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TrackItem {
    pub id: String,
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Artist {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}
