//! quran-clips - Recited Verse Video Rendering
//!
//! Entry point: parses the command line, sets up logging and configuration,
//! and drives the workflow.

use anyhow::Result;
use clap::Parser;
use std::io::{BufRead, Write};
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quran_clips::cli::{Args, Commands};
use quran_clips::config::Config;
use quran_clips::verse::{reciters, VerseKey};
use quran_clips::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Reciters => {
            println!("\n{:<5} {:<32} {:<10}", "Id", "Name", "Silence dB");
            println!("{}", "-".repeat(50));
            for reciter in reciters::list() {
                println!("{:<5} {:<32} {:<10}", reciter.id, reciter.name, reciter.silence_threshold);
            }
        }
        Commands::InitConfig { path } => {
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        Commands::Segment { verse_key, reciter } => {
            let key: VerseKey = verse_key.parse()?;
            if let Some(reciter) = reciter {
                config.recitation.reciter = reciter;
            }

            let workflow = Workflow::from_config(config)?;
            let clips = workflow.segment_verse(key).await?;

            println!("\nVerse {}: {} clips", key, clips.len());
            println!("{:<6} {:<18} {:<10} {}", "Index", "Window (ms)", "Duration", "Words");
            println!("{}", "-".repeat(80));
            for clip in clips {
                println!(
                    "{:<6} {:<18} {:<10} {}",
                    clip.index,
                    format!("{}-{}", clip.begin, clip.end),
                    clip.end - clip.begin,
                    clip.translations.join(" | ")
                );
            }
        }
        Commands::Render { verse_key, dist, fps, resolution, reciter, output, yes } => {
            let keys = VerseKey::parse_list(&verse_key)?;
            if let Some(fps) = fps {
                config.render.fps = fps;
            }
            if let Some(resolution) = resolution {
                config.render.width = resolution.width;
                config.render.height = resolution.height;
            }
            if let Some(reciter) = reciter {
                config.recitation.reciter = reciter;
            }

            let line = "-".repeat(10);
            println!();
            println!("{line}Summary{line}");
            println!(
                "key: {}\tdist: {}",
                keys.iter().map(ToString::to_string).collect::<Vec<_>>().join("|"),
                dist.display()
            );
            println!(
                "resolution: {}x{}\tfps: {}",
                config.render.width, config.render.height, config.render.fps
            );
            println!("reciter: {}\toutput: {}", config.recitation.reciter, output.display());
            println!();

            if !yes && !confirm("Do you want to proceed?")? {
                return Ok(());
            }

            let workflow = Workflow::from_config(config)?;
            info!("Using {}", workflow.media_version().await?);
            let release = workflow.run(&keys, &dist, &output).await?;
            println!("Release video written to {}", release.display());
        }
    }

    info!("quran-clips completed successfully");
    Ok(())
}

/// Ask a yes/no question on the terminal; an empty answer means yes
fn confirm(question: &str) -> Result<bool> {
    print!("{} [Y/n] ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "" | "y" | "yes"))
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".quran-clips").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "quran-clips.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("quran-clips.log").display()
    );

    Ok(())
}
