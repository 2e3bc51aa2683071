use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::pipeline::SummaryPage;

/// Lengths offered by the form, in words
pub const SUMMARY_LENGTHS: [u32; 5] = [100, 250, 500, 750, 1000];
pub const DEFAULT_SUMMARY_LENGTH: u32 = 250;

/// What the page shows below the form
#[derive(Debug, Clone, Copy)]
pub enum PageContent<'a> {
    Empty,
    Summary(&'a SummaryPage),
    Error { message: &'a str, url: &'a str },
}

/// Render the summary as plain text for the terminal
pub fn render_text(page: &SummaryPage) -> String {
    let video = &page.video;
    let mut out = format!(
        "{}\nby {} · {} · {} views",
        video.title, video.author, video.date, video.view_count
    );
    if let Some(ref duration) = video.duration {
        let _ = write!(out, " · {duration}");
    }
    let _ = write!(out, "\n\n{}", page.summary);
    out
}

pub fn render_json(page: &SummaryPage) -> serde_json::Result<String> {
    serde_json::to_string_pretty(page)
}

/// Render the full HTML page
pub fn render_page(content: PageContent<'_>) -> String {
    let (url, length) = match content {
        PageContent::Summary(page) => (page.video_url.as_str(), page.summary_length),
        PageContent::Error { url, .. } => (url, DEFAULT_SUMMARY_LENGTH),
        PageContent::Empty => ("", DEFAULT_SUMMARY_LENGTH),
    };

    let mut body = render_form(url, length);
    match content {
        PageContent::Empty => {}
        PageContent::Summary(page) => body.push_str(&render_summary(page)),
        PageContent::Error { message, .. } => {
            let _ = write!(body, "\n<p class=\"error\">{}</p>", text(message));
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>YouTube Summarizer</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; }}
form {{ display: flex; gap: .5rem; flex-wrap: wrap; }}
input[type=url] {{ flex: 1; min-width: 16rem; }}
.video {{ display: flex; gap: 1rem; margin-top: 1.5rem; }}
.video img {{ width: 320px; height: auto; }}
.error {{ color: #b00020; }}
</style>
</head>
<body>
<h1>YouTube Summarizer</h1>
{body}
</body>
</html>
"#
    )
}

fn render_form(url: &str, selected: u32) -> String {
    let mut options = String::new();
    for length in SUMMARY_LENGTHS {
        let mark = if length == selected { " selected" } else { "" };
        let _ = write!(options, "<option value=\"{length}\"{mark}>{length} words</option>");
    }
    if !SUMMARY_LENGTHS.contains(&selected) {
        let _ = write!(options, "<option value=\"{selected}\" selected>{selected} words</option>");
    }

    format!(
        "<form method=\"post\">\n\
         <input type=\"url\" name=\"url\" placeholder=\"https://www.youtube.com/watch?v=...\" value=\"{}\" required>\n\
         <select name=\"summary_length\">{options}</select>\n\
         <button type=\"submit\">Summarize</button>\n\
         </form>",
        attr(url)
    )
}

fn render_summary(page: &SummaryPage) -> String {
    let video = &page.video;
    let mut details = format!(
        "<p>by {} · {} · {} views",
        text(&video.author),
        text(&video.date),
        text(&video.view_count)
    );
    if let Some(ref duration) = video.duration {
        let _ = write!(details, " · {}", text(duration));
    }
    details.push_str("</p>");

    let paragraphs: String = page
        .summary
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("<p>{}</p>\n", text(line)))
        .collect();

    format!(
        "\n<section class=\"video\">\n\
         <img src=\"{thumb}\" alt=\"{title_attr}\">\n\
         <div><h2>{title}</h2>\n{details}</div>\n\
         </section>\n\
         <section class=\"summary\">\n{paragraphs}</section>\n\
         <iframe width=\"560\" height=\"315\" src=\"https://www.youtube.com/embed/{id}\" allowfullscreen></iframe>",
        thumb = attr(&video.thumbnail),
        title_attr = attr(&video.title),
        title = text(&video.title),
        id = attr(page.video_id.as_str()),
    )
}
