use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "thumbforge", version)]
struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one thumbnail per topic.
    Generate(GenerateArgs),
    /// Write the solid fallback image without calling any service.
    Fallback(FallbackArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Topics to process, one run each, in order.
    #[arg(required = true)]
    topics: Vec<String>,

    /// Pipeline config JSON; `THUMBFORGE_*` variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory (overrides the config's `output_dir`).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FallbackArgs {
    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args).await,
        Command::Fallback(args) => cmd_fallback(args),
    }
}

async fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let mut cfg = thumbforge::PipelineConfig::load(args.config.as_deref())?;
    if let Some(out) = args.out {
        cfg.output_dir = out;
    }
    cfg.validate()?;

    let rasterizer = cfg.rasterizer().context("load title font")?;
    let compositor = Arc::new(thumbforge::Compositor::new(
        cfg.compositor_settings(),
        Arc::new(rasterizer),
    ));
    let services = cfg.http_services()?;
    let multiple = args.topics.len() > 1;

    let mut dirs = thumbforge::BatchDirs::new(&cfg.output_dir);
    let mut failed = 0usize;
    for topic in &args.topics {
        let request = match thumbforge::GenerationRequest::new(topic.as_str()) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(topic = %topic, error = %e, "topic skipped");
                failed += 1;
                let line = serde_json::json!({
                    "status": "invalid",
                    "topic": topic,
                    "message": e.to_string(),
                });
                println!("{line}");
                continue;
            }
        };
        let dir = if multiple {
            dirs.allocate(request.topic())
        } else {
            cfg.output_dir.clone()
        };
        let orchestrator = thumbforge::Orchestrator::new(
            cfg.orchestrator_settings(),
            services.clone(),
            compositor.clone(),
            cfg.build_suite(&services)?,
            Arc::new(thumbforge::FsArtifactStore::new(&dir)),
        )?;

        let result = orchestrator.run(&request).await;
        if !result.is_success() {
            failed += 1;
        }
        println!(
            "{}",
            serde_json::to_string(&result).context("serialize pipeline result")?
        );
    }

    tracing::info!(
        topics = args.topics.len(),
        failed,
        "batch finished"
    );
    Ok(())
}

fn cmd_fallback(args: FallbackArgs) -> anyhow::Result<()> {
    ensure_parent_dir(&args.out)?;
    let img = thumbforge::fallback_image(thumbforge::Canvas::THUMBNAIL);
    img.save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write '{}'", args.out.display()))?;
    tracing::info!(path = %args.out.display(), "fallback written");
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create '{}'", parent.display()))?;
    }
    Ok(())
}
