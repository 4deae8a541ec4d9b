//! Audio-related types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Audio encoding used on the realtime wire.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AudioFormat {
    #[default]
    Pcm16,
    G711Ulaw,
    G711Alaw,
}

/// Voices offered by the realtime endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Voice {
    #[default]
    Alloy,
    Echo,
    Shimmer,
    Ash,
    Ballad,
    Coral,
    Sage,
    Verse,
}

impl Voice {
    /// Every voice, in declaration order.
    pub const ALL: [Voice; 8] = [
        Voice::Alloy,
        Voice::Echo,
        Voice::Shimmer,
        Voice::Ash,
        Voice::Ballad,
        Voice::Coral,
        Voice::Sage,
        Voice::Verse,
    ];
}
