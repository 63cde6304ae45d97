//! Mood labels and the static table that maps each one to audio-feature
//! targets and catalog search queries.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::AppError;

/// One of the seven emotional-state labels a playlist can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Angry,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Angry,
        Mood::Disgust,
        Mood::Fear,
        Mood::Happy,
        Mood::Neutral,
        Mood::Sad,
        Mood::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Angry => "angry",
            Mood::Disgust => "disgust",
            Mood::Fear => "fear",
            Mood::Happy => "happy",
            Mood::Neutral => "neutral",
            Mood::Sad => "sad",
            Mood::Surprise => "surprise",
        }
    }

    /// Label with the first letter upper-cased, used in playlist names.
    pub fn title(&self) -> String {
        let label = self.as_str();
        let mut chars = label.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    fn entry(&self) -> &'static MoodEntry {
        &MOOD_TABLE[*self as usize]
    }

    pub fn profile(&self) -> MoodProfile {
        self.entry().profile
    }

    /// Ordered search queries probed against the catalog for this mood.
    pub fn search_queries(&self) -> &'static [&'static str] {
        self.entry().queries
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_ascii_lowercase();
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str() == label)
            .ok_or_else(|| AppError::InvalidMood(s.to_string()))
    }
}

/// Audio-feature targets associated with a mood.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoodProfile {
    pub mood: Mood,
    pub valence: f32,
    pub energy: f32,
    pub danceability: f32,
    pub tempo: f32,
}

struct MoodEntry {
    profile: MoodProfile,
    queries: &'static [&'static str],
}

const fn entry(
    mood: Mood,
    valence: f32,
    energy: f32,
    danceability: f32,
    tempo: f32,
    queries: &'static [&'static str],
) -> MoodEntry {
    MoodEntry {
        profile: MoodProfile {
            mood,
            valence,
            energy,
            danceability,
            tempo,
        },
        queries,
    }
}

// Indexed by `Mood as usize`; `validate_table` checks the ordering at startup.
static MOOD_TABLE: [MoodEntry; 7] = [
    entry(Mood::Angry, 0.2, 0.9, 0.3, 150.0, &[
        "genre:metal",
        "genre:rock",
        "year:2020-2024 metal",
        "year:2020-2024 rock",
    ]),
    entry(Mood::Disgust, 0.1, 0.4, 0.2, 100.0, &[
        "genre:ambient",
        "genre:classical",
        "year:2020-2024 ambient",
        "year:2020-2024 classical",
    ]),
    entry(Mood::Fear, 0.2, 0.6, 0.3, 130.0, &[
        "genre:ambient",
        "genre:industrial",
        "year:2020-2024 ambient",
        "year:2020-2024 industrial",
    ]),
    entry(Mood::Happy, 0.9, 0.8, 0.8, 120.0, &[
        "genre:pop",
        "genre:dance",
        "year:2020-2024 pop",
        "year:2020-2024 dance",
    ]),
    entry(Mood::Neutral, 0.5, 0.5, 0.5, 110.0, &[
        "genre:indie",
        "genre:alternative",
        "year:2020-2024 indie",
        "year:2020-2024 alternative",
    ]),
    entry(Mood::Sad, 0.2, 0.3, 0.2, 90.0, &[
        "genre:blues",
        "genre:soul",
        "year:2020-2024 blues",
        "year:2020-2024 soul",
    ]),
    entry(Mood::Surprise, 0.7, 0.9, 0.6, 140.0, &[
        "genre:electronic",
        "genre:house",
        "year:2020-2024 electronic",
        "year:2020-2024 house",
    ]),
];

/// Public description of one mood, served to clients building a mood picker.
#[derive(Debug, Clone, Serialize)]
pub struct MoodDescriptor {
    #[serde(flatten)]
    pub profile: MoodProfile,
    pub queries: &'static [&'static str],
}

pub fn catalog() -> Vec<MoodDescriptor> {
    Mood::ALL
        .iter()
        .map(|m| MoodDescriptor {
            profile: m.profile(),
            queries: m.search_queries(),
        })
        .collect()
}

/// Checks that the table covers exactly the enumerated moods, in order, and
/// that every entry has usable targets and queries.
pub fn validate_table() -> anyhow::Result<()> {
    if MOOD_TABLE.len() != Mood::ALL.len() {
        anyhow::bail!(
            "mood table has {} entries, expected {}",
            MOOD_TABLE.len(),
            Mood::ALL.len()
        );
    }
    for (mood, entry) in Mood::ALL.iter().zip(MOOD_TABLE.iter()) {
        let p = &entry.profile;
        if p.mood != *mood {
            anyhow::bail!("mood table entry for {} found in slot of {}", p.mood, mood);
        }
        if entry.queries.is_empty() {
            anyhow::bail!("mood {} has no search queries", mood);
        }
        let unit = 0.0..=1.0;
        if !unit.contains(&p.valence) || !unit.contains(&p.energy) || !unit.contains(&p.danceability) {
            anyhow::bail!("mood {} has an audio feature outside 0..1", mood);
        }
        if p.tempo <= 0.0 {
            anyhow::bail!("mood {} has a non-positive tempo", mood);
        }
    }
    Ok(())
}
