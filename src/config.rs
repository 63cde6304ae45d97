use std::env;

const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:3000/api/auth/callback";
const DEFAULT_SCOPES: &str = "playlist-modify-public playlist-modify-private user-read-private";

/// Application configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// Allowed CORS origins. A single "*" allows any origin.
    pub cors_origins: Vec<String>,
    pub playlist_size: usize,
    pub spotify: SpotifyConfig,
}

/// Credentials and endpoints for the Spotify accounts service and Web API.
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: String,
    pub market: String,
    pub accounts_url: String,
    pub api_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(anyhow::anyhow!(
                "APP_ENV must be one of development, production, test (got {other:?})"
            )),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let environment = match env::var("APP_ENV") {
            Ok(v) => v.parse()?,
            Err(_) => Environment::Development,
        };

        let cors_origins = parse_list(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".into()));

        let playlist_size = match env::var("PLAYLIST_SIZE") {
            Ok(v) => parse_playlist_size(&v)?,
            Err(_) => 20,
        };

        let client_id = required("SPOTIFY_CLIENT_ID")?;
        let client_secret = required("SPOTIFY_CLIENT_SECRET")?;

        let spotify = SpotifyConfig {
            client_id,
            client_secret,
            redirect_uri: env::var("SPOTIFY_REDIRECT_URI")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.into()),
            scopes: env::var("SPOTIFY_SCOPES").unwrap_or_else(|_| DEFAULT_SCOPES.into()),
            market: env::var("SPOTIFY_MARKET").unwrap_or_else(|_| "BR".into()),
            accounts_url: trim_base(
                env::var("SPOTIFY_ACCOUNTS_URL")
                    .unwrap_or_else(|_| "https://accounts.spotify.com".into()),
            ),
            api_url: trim_base(
                env::var("SPOTIFY_API_URL").unwrap_or_else(|_| "https://api.spotify.com/v1".into()),
            ),
        };

        Ok(Self {
            host,
            port,
            environment,
            cors_origins,
            playlist_size,
            spotify,
        })
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(anyhow::anyhow!("{name} is required")),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_playlist_size(raw: &str) -> anyhow::Result<usize> {
    let size: usize = raw
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("PLAYLIST_SIZE must be a number (got {raw:?})"))?;
    if !(1..=100).contains(&size) {
        return Err(anyhow::anyhow!("PLAYLIST_SIZE must be between 1 and 100"));
    }
    Ok(size)
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
impl SpotifyConfig {
    pub fn for_tests() -> Self {
        Self {
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            redirect_uri: DEFAULT_REDIRECT_URI.into(),
            scopes: DEFAULT_SCOPES.into(),
            market: "BR".into(),
            accounts_url: "https://accounts.spotify.com".into(),
            api_url: "https://api.spotify.com/v1".into(),
        }
    }
}
