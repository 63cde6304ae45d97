pub mod auth;
pub mod playlist;

pub use auth::{AuthFlow, StatusNote};
pub use playlist::PlaylistFlow;
