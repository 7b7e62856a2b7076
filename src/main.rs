//! Lookbook - AI fashion lookbook generation CLI.

mod adapters;
mod aspect;
mod cassette;
mod cli;
mod config;
mod context;
mod error;
mod ingest;
mod model;
mod options;
mod output;
mod payload;
mod ports;
mod prompt;
mod studio;

use std::collections::BTreeSet;
use std::path::Path;
use std::process;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::aspect::AspectRatio;
use crate::cli::Cli;
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::StudioError;
use crate::ingest::RawFile;
use crate::model::{detect_provider, resolve_model};
use crate::options::{validate_aspect, GenerationOptions, Quality, Style};
use crate::studio::{Slot, Studio};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e.user_message());
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "lookbook=debug" } else { "lookbook=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Option choices after merging CLI flags over the config file defaults.
struct Choices {
    styles: BTreeSet<Style>,
    quality: Quality,
    aspect: AspectRatio,
    count: i64,
}

impl Choices {
    fn resolve(cli: &Cli, config: &Config) -> Result<Self, StudioError> {
        let defaults = &config.defaults;
        let style_names = if cli.styles.is_empty() { &defaults.styles } else { &cli.styles };
        let styles = style_names
            .iter()
            .map(|s| s.parse::<Style>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(StudioError::InvalidArgument)?;
        let quality = cli
            .quality
            .as_deref()
            .unwrap_or(&defaults.quality)
            .parse()
            .map_err(StudioError::InvalidArgument)?;
        let aspect = validate_aspect(cli.aspect.as_deref().unwrap_or(&defaults.aspect))
            .map_err(StudioError::InvalidArgument)?;
        Ok(Self { styles, quality, aspect, count: cli.count.unwrap_or(defaults.count) })
    }

    /// Apply the choices the same way the option picker edits a session.
    fn apply(&self, studio: &Studio) {
        for style in Style::ALL {
            studio.toggle_style(style, self.styles.contains(&style));
        }
        studio.set_quality(self.quality);
        studio.set_aspect(self.aspect.clone());
        studio.set_count(self.count);
    }
}

/// Fill a session with the uploads, options, and prompt from the command line.
///
/// Slots without a file are cleared.
fn prepare(studio: &Studio, cli: &Cli, choices: &Choices, prompt: String) -> Result<(), StudioError> {
    let inputs = [
        (Slot::Model, &cli.subject),
        (Slot::Product, &cli.product),
        (Slot::Clothing, &cli.clothing),
        (Slot::Logo, &cli.logo),
    ];
    for (slot, path) in inputs {
        match path {
            Some(path) => studio.set_upload(slot, RawFile::read(Path::new(path))?)?,
            None => studio.clear_upload(slot),
        }
    }
    choices.apply(studio);
    studio.set_prompt(prompt);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), StudioError> {
    // Load config
    let config_path = config::discover_config_path(cli.config.as_deref());
    let config = Config::load(&config_path)?;

    let prompt = cli.resolve_prompt()?;
    let choices = Choices::resolve(&cli, &config)?;

    if cli.suggest_prompt {
        let ServiceContext { generator, .. } = ServiceContext::offline(&config)?;
        let studio = Studio::new(generator, GenerationOptions::default());
        prepare(&studio, &cli, &choices, prompt)?;
        println!("{}", studio.suggest_prompt());
        return Ok(());
    }

    // Resolve model and provider
    let model_name = cli.model.as_deref().unwrap_or(&config.defaults.model);
    let resolved_model = resolve_model(model_name);
    let provider = detect_provider(&resolved_model).map_err(StudioError::InvalidArgument)?;
    tracing::info!(model = %resolved_model, alias = %model_name, ?provider, "model resolved");

    // Create context based on mode (live / recording / replaying)
    let replay_path = std::env::var("LOOKBOOK_REPLAY").ok();
    let is_recording = std::env::var("LOOKBOOK_REC").is_ok_and(|v| v == "true" || v == "1");

    let (ctx, recording_session) = if let Some(ref cassette_path) = replay_path {
        tracing::info!(cassette = %cassette_path, "replaying");
        (ServiceContext::replaying(Path::new(cassette_path), &config)?, None)
    } else if is_recording {
        tracing::info!("recording mode enabled");
        let (ctx, session) = ServiceContext::recording(provider, &resolved_model, &config)?;
        (ctx, Some(session))
    } else {
        (ServiceContext::live(provider, &resolved_model, &config)?, None)
    };
    let ServiceContext { generator, client } = ctx;

    let outcome = async {
        let studio = Studio::new(generator, GenerationOptions::default());
        prepare(&studio, &cli, &choices, prompt)?;
        let result = studio.generate().await?;
        let used_prompt = studio.snapshot().prompt;
        output::save_results(&client, &result.urls, cli.output.as_deref(), &used_prompt).await
    }
    .await;

    // Finish recording if active
    if let Some(session) = recording_session {
        match session.finish() {
            Ok(path) => eprintln!("Cassette saved: {}", path.display()),
            Err(e) => eprintln!("Warning: failed to save cassette: {e}"),
        }
    }

    for path in outcome? {
        eprintln!("Saved: {}", path.display());
    }

    Ok(())
}
