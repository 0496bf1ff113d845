use ai_selfie_generator::app::App;
use ai_selfie_generator::models::GeneratedImage;
use ai_selfie_generator::prompts::EXAMPLE_SCENARIOS;
use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "ai-selfie")]
#[command(about = "Place people from your photos into any scene")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Composite one or more portraits into a described scene.
    Generate {
        /// Photos of the people to include (jpg, png, webp, gif).
        #[arg(required = true, value_name = "PHOTO")]
        photos: Vec<PathBuf>,

        /// Background and situation for the picture.
        #[arg(short, long, conflicts_with = "example")]
        scenario: Option<String>,

        /// Use a built-in example scenario (see `examples`).
        #[arg(short, long)]
        example: Option<usize>,

        /// Directory to write the generated image into.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Chat with the bilingual (Korean/English) assistant.
    Chat,
    /// List built-in example scenarios.
    Examples,
}

fn default_output_dir() -> PathBuf {
    let date = Local::now().format("%Y-%m-%d").to_string();
    PathBuf::from("output").join(format!("{}_{}", date, Uuid::new_v4()))
}

fn save_image(image: &GeneratedImage, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(format!("selfie.{}", image.extension()));
    std::fs::write(&path, image.decode()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

async fn run_generate(
    app: &App,
    photos: Vec<PathBuf>,
    scenario: Option<String>,
    example: Option<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    let scenario = match (scenario, example) {
        (Some(text), _) => text,
        (None, Some(index)) => EXAMPLE_SCENARIOS
            .get(index)
            .map(|s| s.to_string())
            .with_context(|| format!("No example scenario #{}", index))?,
        (None, None) => bail!("Provide --scenario or --example"),
    };

    info!("Generating from {} photo(s): {}", photos.len(), scenario);

    let image = match app
        .generator()
        .submit_generation_from_paths(&photos, &scenario)
        .await
    {
        Ok(image) => image,
        Err(e) => {
            error!("{}", e);
            bail!(e.user_message());
        }
    };

    let path = save_image(&image, &output.unwrap_or_else(default_output_dir))?;
    info!("Saved generated image to {}", path.display());
    println!("{}", path.display());
    Ok(())
}

async fn run_chat(app: &App) -> Result<()> {
    let mut session = app
        .begin_chat_session()
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match session.send_message(&line).await {
            Ok(reply) => println!("{}", reply),
            Err(e) => eprintln!("{}", e.user_message()),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ai_selfie_generator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    if let Command::Examples = args.command {
        for (i, example) in EXAMPLE_SCENARIOS.iter().enumerate() {
            println!("{}: {}", i, example);
        }
        return Ok(());
    }

    let app = match App::new() {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = match args.command {
        Command::Generate {
            photos,
            scenario,
            example,
            output,
        } => run_generate(&app, photos, scenario, example, output).await,
        Command::Chat => run_chat(&app).await,
        Command::Examples => Ok(()),
    };

    if let Err(e) = outcome {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
