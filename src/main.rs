use std::path::PathBuf;
use std::sync::Arc;

use eyre::Result;
use log::{debug, info};

mod cli;

use cli::{Cli, Command, OutputFormat};
use ytsum::config::Config;
use ytsum::pipeline::Pipeline;

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytsum.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytsum")
        .join("logs")
}

fn build_after_help() -> String {
    let log_path = log_dir().join("ytsum.log");
    let config_path = ytsum::config::config_path();

    format!(
        "\nENVIRONMENT:\n  YOUTUBE_API_KEY    YouTube Data API key (metadata lookup)\n  OPENAI_API_KEY     OpenAI key (default models)\n  ANTHROPIC_API_KEY  Anthropic key (claude-* models)\n  PORT               serve on 0.0.0.0:$PORT\n\nConfig is read from: {}\nLogs are written to: {}",
        config_path.display(),
        log_path.display()
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // CLI flags take priority over environment, environment over the config file
    let mut config = Config::load()?.with_env();
    if cli.model.is_some() {
        config.model = cli.model.clone();
    }
    if cli.lang.is_some() {
        config.lang = cli.lang.clone();
    }
    if cli.timeout.is_some() {
        config.timeout_secs = cli.timeout;
    }

    if cli.verbose {
        let config_path = ytsum::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
        eprintln!("Model: {}\nLanguage: {}\nTimeout: {:?}", config.model(), config.lang(), config.timeout());
    }
    debug!("Resolved config: model={} lang={}", config.model(), config.lang());

    let pipeline = Pipeline::from_config(&config)?;

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind().to_string());
            if cli.verbose {
                eprintln!("Listening on http://{bind}");
            }
            ytsum::web::serve(&bind, Arc::new(pipeline)).await?;
        }
        Command::Summarize { url, length, format } => {
            let page = pipeline.run(&url, length).await?;

            let rendered = match format {
                OutputFormat::Text => ytsum::output::render_text(&page),
                OutputFormat::Json => ytsum::output::render_json(&page)?,
            };
            println!("{rendered}");
        }
    }

    Ok(())
}
