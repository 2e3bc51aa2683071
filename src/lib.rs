pub mod config;
pub mod error;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod summarize;
pub mod transcript;
pub mod web;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub use error::{Error, GenerationError, Result};

/// Canonical identifier of a hosted video
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single captioned segment, in playback order
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub text: String,
    pub start: Option<f64>,
    pub duration: Option<f64>,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start: None,
            duration: None,
        }
    }
}

/// Cleaned caption text, or the absence of any usable captions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Captions {
    Present(String),
    Absent,
}

impl Captions {
    pub fn is_absent(&self) -> bool {
        matches!(self, Captions::Absent)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Captions::Present(text) => Some(text),
            Captions::Absent => None,
        }
    }
}

static ANCHORED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[?&]v=|/v/|/embed/|/shorts/|youtu\.be/)([A-Za-z0-9_-]+)").expect("valid video URL regex")
});

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid video ID regex"));

/// Extract the video ID from a YouTube URL (or a bare 11-character ID)
pub fn resolve(input: &str) -> Result<VideoId> {
    let input = input.trim();

    if BARE_ID.is_match(input) {
        return Ok(VideoId(input.to_string()));
    }

    ANCHORED_ID
        .captures(input)
        .map(|caps| VideoId(caps[1].to_string()))
        .ok_or_else(|| Error::NotFound(input.to_string()))
}
