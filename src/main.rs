//! echotype binary entry point

use anyhow::Context;
use clap::Parser;
use echotype::cli::{Cli, Commands};
use echotype::config::Config;
use echotype::daemon::Daemon;
use echotype::transcribe;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let mut config =
        Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    apply_overrides(&mut config, &cli)?;

    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => {
            Daemon::new(config).run().await?;
            Ok(())
        }
        Commands::Config => {
            let toml = toml::to_string_pretty(&config)
                .context("Failed to serialize configuration")?;
            println!("{}", toml);
            Ok(())
        }
        Commands::Transcribe { file } => transcribe_file(&config, &file),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("echotype={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// CLI flags win over the config file
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(model) = &cli.model {
        config.transcribe.model = model.clone();
    }
    if let Some(key) = &cli.hotkey {
        config.hotkey.key = key.clone();
    }
    if let Some(prompt) = &cli.initial_prompt {
        config.prompt.initial_prompt = prompt.clone();
    }
    if cli.retrieve_context {
        config.harvest.enabled = true;
    }

    config.validate().context("Invalid configuration")?;
    Ok(())
}

/// One-shot transcription of a WAV file, for testing a setup without the
/// daemon.
fn transcribe_file(config: &Config, path: &std::path::Path) -> anyhow::Result<()> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels != 1 || spec.bits_per_sample != 16 {
        anyhow::bail!(
            "Expected mono 16-bit WAV, got {} channels at {} bits",
            spec.channels,
            spec.bits_per_sample
        );
    }
    drop(reader);

    let wav = std::fs::read(path)?;
    let transcriber = transcribe::create_transcriber(&config.transcribe)?;

    let prompt = config.prompt.initial_prompt.trim();
    let text = transcriber.transcribe(&wav, (!prompt.is_empty()).then_some(prompt))?;

    println!("{}", text);
    Ok(())
}
