use std::collections::HashMap;

use async_trait::async_trait;
use eyre::{OptionExt, bail};
use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;

use crate::config::Config;
use crate::metadata::VideoMetadata;
use crate::{Error, Result, TranscriptSegment, VideoId};

const DEFAULT_DATA_API_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3";
const YOUTUBE_SITE: &str = "https://www.youtube.com";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn video_metadata(&self, video_id: &VideoId) -> Result<VideoMetadata>;
}

#[async_trait]
pub trait TranscriptLookup: Send + Sync {
    async fn transcript(&self, video_id: &VideoId) -> Result<Vec<TranscriptSegment>>;
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: Snippet,
    statistics: Option<Statistics>,
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(rename = "channelTitle")]
    channel_title: String,
    #[serde(rename = "publishedAt")]
    published_at: String,
    #[serde(default)]
    thumbnails: HashMap<String, Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Statistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

/// Metadata lookup backed by the YouTube Data API v3
pub struct DataApiClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl DataApiClient {
    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        let api_key = config
            .youtube_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_eyre("YouTube API key is missing (set youtube_api_key in config or YOUTUBE_API_KEY)")?;

        let endpoint = config
            .youtube_base_url
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_DATA_API_ENDPOINT)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http: config.http_client()?,
            api_key,
            endpoint,
        })
    }
}

#[async_trait]
impl MetadataLookup for DataApiClient {
    async fn video_metadata(&self, video_id: &VideoId) -> Result<VideoMetadata> {
        let url = format!("{}/videos", self.endpoint);
        debug!("Fetching metadata for {video_id} from {url}");

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("part", "snippet,statistics,contentDetails"),
                ("id", video_id.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(lookup_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::MetadataLookup(format!("YouTube Data API returned {status}: {body}")));
        }

        let list: VideoListResponse = resp.json().await.map_err(lookup_error)?;
        let item = list
            .items
            .into_iter()
            .next()
            .ok_or_else(|| Error::VideoNotFound(video_id.to_string()))?;

        video_metadata_from(video_id, item)
    }
}

fn video_metadata_from(video_id: &VideoId, item: VideoItem) -> Result<VideoMetadata> {
    let raw_views = item
        .statistics
        .and_then(|s| s.view_count)
        .ok_or_else(|| Error::MalformedMetadata(format!("no view count for {video_id}")))?;
    let view_count = raw_views
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::MalformedMetadata(format!("invalid view count {raw_views:?}")))?;

    let thumbnails = &item.snippet.thumbnails;
    let thumbnail_url = ["medium", "high", "default"]
        .iter()
        .find_map(|size| thumbnails.get(*size))
        .map(|t| t.url.clone())
        .unwrap_or_else(|| format!("https://i.ytimg.com/vi/{video_id}/mqdefault.jpg"));

    Ok(VideoMetadata {
        title: item.snippet.title,
        author: item.snippet.channel_title,
        published_at: item.snippet.published_at,
        view_count,
        thumbnail_url,
        duration: item.content_details.and_then(|c| c.duration),
    })
}

fn lookup_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::MetadataTimeout
    } else if err.is_decode() {
        Error::MalformedMetadata(err.to_string())
    } else {
        Error::MetadataLookup(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
}

/// Transcript lookup using YouTube's built-in caption tracks via the InnerTube API
pub struct CaptionClient {
    http: reqwest::Client,
    site: String,
    lang: String,
}

impl CaptionClient {
    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        Ok(Self {
            http: config.http_client()?,
            site: YOUTUBE_SITE.to_string(),
            lang: config.lang().to_string(),
        })
    }

    async fn fetch_segments(&self, video_id: &VideoId) -> eyre::Result<Vec<TranscriptSegment>> {
        // Step 1: Fetch the watch page to get the InnerTube API key
        let watch_url = format!("{}/watch?v={video_id}", self.site);
        debug!("Fetching watch page: {watch_url}");

        let page_html = self
            .http
            .get(&watch_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let api_key = extract_api_key(&page_html)?;
        debug!("Extracted InnerTube API key: {api_key}");

        // Step 2: Call InnerTube player endpoint
        let player_url = format!("{}/youtubei/v1/player?key={api_key}&prettyPrint=false", self.site);

        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": self.lang,
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id.as_str()
        });

        let resp: InnerTubePlayerResponse = self
            .http
            .post(&player_url)
            .header("User-Agent", USER_AGENT)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let tracks = resp
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .and_then(|r| r.caption_tracks)
            .unwrap_or_default();

        // Find the requested language track, or fall back to the first available
        let Some(track) = tracks
            .iter()
            .find(|t| t.language_code == self.lang)
            .or_else(|| tracks.first())
        else {
            bail!("no captions available for video {video_id}");
        };
        debug!("Using caption track: lang={}", track.language_code);

        // Step 3: Fetch the caption XML
        let caption_xml = self
            .http
            .get(&track.base_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_caption_xml(&caption_xml))
    }
}

#[async_trait]
impl TranscriptLookup for CaptionClient {
    async fn transcript(&self, video_id: &VideoId) -> Result<Vec<TranscriptSegment>> {
        self.fetch_segments(video_id)
            .await
            .map_err(|e| Error::TranscriptUnavailable(format!("{e:#}")))
    }
}

fn extract_api_key(html: &str) -> eyre::Result<String> {
    let re = Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#)?;
    if let Some(caps) = re.captures(html) {
        return Ok(caps[1].to_string());
    }

    // Fallback: try the newer pattern
    let re2 = Regex::new(r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#)?;
    if let Some(caps) = re2.captures(html) {
        return Ok(caps[1].to_string());
    }

    bail!("could not extract InnerTube API key from watch page");
}

/// Parse timedtext XML; entries without timing attributes are skipped and a
/// syntax error ends parsing with the segments read so far
fn parse_caption_xml(xml: &str) -> Vec<TranscriptSegment> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().check_end_names = false;
    let mut segments = Vec::new();
    let mut current_start: Option<f64> = None;
    let mut current_dur: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = None;
                let mut dur = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"start" => {
                            start = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        b"dur" => {
                            dur = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        _ => {}
                    }
                }
                current_start = start;
                current_dur = dur;
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(start), Some(dur)) = (current_start.take(), current_dur.take()) {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    let text = html_escape::decode_html_entities(&raw_text).to_string();
                    if !text.is_empty() {
                        segments.push(TranscriptSegment {
                            text,
                            start: Some(start),
                            duration: Some(dur),
                        });
                    }
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                current_start = None;
                current_dur = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(
                    "Caption XML broken at byte {}, keeping {} segments: {e}",
                    reader.buffer_position(),
                    segments.len()
                );
                break;
            }
            _ => {}
        }
    }

    segments
}
