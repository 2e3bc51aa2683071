use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;

use crate::{Captions, Result, TranscriptSegment};

static STAGE_DIRECTIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\[[^\]]*\]\s*)+").expect("valid stage direction regex"));

/// Join transcript segments into one cleaned caption blob
pub fn extract(segments: &[TranscriptSegment]) -> Captions {
    let mut output = String::new();

    for segment in segments {
        let text = clean_segment(&segment.text);
        if text.is_empty() {
            continue;
        }
        output.push_str(&text);
        output.push(' ');
    }

    let output = output.trim();
    if output.is_empty() {
        Captions::Absent
    } else {
        Captions::Present(output.to_string())
    }
}

/// Collapse a transcript lookup result into captions, absorbing lookup failures
pub fn captions_from(lookup: Result<Vec<TranscriptSegment>>) -> Captions {
    match lookup {
        Ok(segments) => {
            debug!("Extracting captions from {} segments", segments.len());
            extract(&segments)
        }
        Err(e) => {
            warn!("Proceeding without captions: {e}");
            Captions::Absent
        }
    }
}

/// Strip leading `[Music]`-style markers and normalize whitespace
fn clean_segment(text: &str) -> String {
    let text = STAGE_DIRECTIONS.replace(text.trim_start(), "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
