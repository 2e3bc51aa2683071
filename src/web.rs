use std::num::NonZeroU32;
use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use log::{error, info};
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::Error;
use crate::output::{DEFAULT_SUMMARY_LENGTH, PageContent, render_page};
use crate::pipeline::Pipeline;

const INVALID_LINK: &str = "That doesn't look like a YouTube video link. Please check the URL and try again.";
const INVALID_LENGTH: &str = "Summary length must be a positive number of words.";
const INVALID_FORM: &str = "Please submit a video link using the form below.";
const GENERIC_FAILURE: &str = "Sorry, we could not generate a summary for this video. Please try again later.";

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

#[derive(Debug, Deserialize)]
struct SummarizeForm {
    #[serde(default)]
    url: String,
    summary_length: Option<String>,
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/", get(index).post(summarize))
        .route("/{*path}", get(index).post(summarize))
        .with_state(AppState { pipeline })
}

/// Serve the web front end until Ctrl-C
pub async fn serve(bind: &str, pipeline: Arc<Pipeline>) -> eyre::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {e}");
    }
    info!("Shutting down");
}

async fn index() -> Html<String> {
    Html(render_page(PageContent::Empty))
}

async fn summarize(
    State(state): State<AppState>,
    form: Result<Form<SummarizeForm>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            info!("Rejected form submission: {rejection}");
            return error_page(StatusCode::BAD_REQUEST, INVALID_FORM, "");
        }
    };

    let Some(length) = parse_length(form.summary_length.as_deref()) else {
        return error_page(StatusCode::BAD_REQUEST, INVALID_LENGTH, &form.url);
    };

    match state.pipeline.run(&form.url, length).await {
        Ok(page) => (StatusCode::OK, Html(render_page(PageContent::Summary(&page)))),
        Err(Error::NotFound(_)) => error_page(StatusCode::BAD_REQUEST, INVALID_LINK, &form.url),
        Err(e) => {
            error!("Summary failed for {}: {e}", form.url.trim());
            error_page(StatusCode::BAD_GATEWAY, GENERIC_FAILURE, &form.url)
        }
    }
}

fn parse_length(raw: Option<&str>) -> Option<NonZeroU32> {
    match raw.map(str::trim) {
        None | Some("") => NonZeroU32::new(DEFAULT_SUMMARY_LENGTH),
        Some(value) => value.parse().ok(),
    }
}

fn error_page(status: StatusCode, message: &str, url: &str) -> (StatusCode, Html<String>) {
    (status, Html(render_page(PageContent::Error { message, url })))
}
