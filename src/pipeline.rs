use std::num::NonZeroU32;

use log::info;
use serde::Serialize;

use crate::config::Config;
use crate::metadata::{DisplayRecord, normalize};
use crate::summarize::{SummaryRequest, TextGenerator, build_and_dispatch, generator_for};
use crate::transcript::captions_from;
use crate::youtube::{CaptionClient, DataApiClient, MetadataLookup, TranscriptLookup};
use crate::{Result, VideoId, resolve};

/// Everything the result page shows for one request
#[derive(Debug, Clone, Serialize)]
pub struct SummaryPage {
    pub video_id: VideoId,
    pub video_url: String,
    pub video: DisplayRecord,
    pub summary: String,
    pub summary_length: u32,
}

/// Request-scoped run of URL → metadata + captions → summary
pub struct Pipeline {
    metadata: Box<dyn MetadataLookup>,
    transcripts: Box<dyn TranscriptLookup>,
    generator: Box<dyn TextGenerator>,
}

impl Pipeline {
    pub fn new(
        metadata: Box<dyn MetadataLookup>,
        transcripts: Box<dyn TranscriptLookup>,
        generator: Box<dyn TextGenerator>,
    ) -> Self {
        Self {
            metadata,
            transcripts,
            generator,
        }
    }

    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        Ok(Self::new(
            Box::new(DataApiClient::from_config(config)?),
            Box::new(CaptionClient::from_config(config)?),
            generator_for(config)?,
        ))
    }

    pub async fn run(&self, url: &str, summary_length: NonZeroU32) -> Result<SummaryPage> {
        let video_url = url.trim().to_string();
        let video_id = resolve(&video_url)?;

        let (metadata, transcript) = tokio::join!(
            self.metadata.video_metadata(&video_id),
            self.transcripts.transcript(&video_id),
        );
        let raw = metadata?;
        let video = normalize(&raw)?;
        let captions = captions_from(transcript);
        let with_captions = !captions.is_absent();

        let request = SummaryRequest {
            captions,
            summary_length: summary_length.get(),
            video_url: video_url.clone(),
            video_title: raw.title,
        };
        let summary = build_and_dispatch(&request, self.generator.as_ref()).await?;
        info!(
            "Summarized {video_id} ({} words requested, captions: {with_captions})",
            summary_length
        );

        Ok(SummaryPage {
            video_id,
            video_url,
            video,
            summary,
            summary_length: summary_length.get(),
        })
    }
}
