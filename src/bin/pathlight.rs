use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use pathlight::{
    AnimationDriver, EffectKind, OutputProfile, Project, RunEvent, RunStatus, Session,
    encode::{ensure_parent_dir, is_ffmpeg_on_path},
    render_overlay,
};

#[derive(Parser, Debug)]
#[command(name = "pathlight", version)]
struct Cli {
    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered effects and the settings each one reads.
    Effects,
    /// Print path statistics for a project.
    Info(InfoArgs),
    /// Render the frame at one tick as a PNG.
    Frame(FrameArgs),
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Project JSON.
    #[arg(long)]
    project: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Project JSON.
    #[arg(long)]
    project: PathBuf,

    /// Source image.
    #[arg(long)]
    image: PathBuf,

    /// Tick index (0-based).
    #[arg(long, default_value_t = 0)]
    at: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Draw the path and focus outlines on top.
    #[arg(long, default_value_t = false)]
    overlay: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Project JSON.
    #[arg(long)]
    project: PathBuf,

    /// Source image.
    #[arg(long)]
    image: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Output resolution: original, sd480, hd720, hd1080, vertical_hd, uhd4k.
    #[arg(long, default_value = "original")]
    profile: OutputProfile,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Effects => cmd_effects(),
        Command::Info(args) => cmd_info(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn load_session(project: &Path, image: Option<&Path>) -> anyhow::Result<Session> {
    let mut session = Session::default();
    session
        .load_project(project)
        .with_context(|| format!("load project '{}'", project.display()))?;
    if let Some(image) = image {
        session
            .load_image(image)
            .with_context(|| format!("load image '{}'", image.display()))?;
    }
    Ok(session)
}

fn cmd_effects() -> anyhow::Result<()> {
    for kind in EffectKind::ALL {
        println!("{:<16} {}", kind.name(), kind.description());
        println!("{:<16} reads: {}", "", kind.params().join(", "));
    }
    Ok(())
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let project = Project::from_path(&args.project)
        .with_context(|| format!("load project '{}'", args.project.display()))?;
    let model = project.to_model()?;
    let s = &project.settings;
    let estimate = pathlight::RunEstimate::new(model.points(), s.speed, s.fps);

    println!("effect:   {}", s.effect);
    println!("points:   {}", model.len());
    for (i, p) in model.points().iter().enumerate() {
        println!("  #{i:<3} x={:<9.2} y={:<9.2} size={:.1}", p.x, p.y, p.size);
    }
    println!("distance: {:.1} px", estimate.distance);
    println!("duration: {}", estimate.timecode());
    println!("frames:   {}", estimate.frames);
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let session = load_session(&args.project, Some(args.image.as_path()))?;
    let driver = AnimationDriver::new(session.request(None)?);
    let mut frame = driver.render_frame_at(args.at)?;
    if args.overlay {
        frame = render_overlay(&frame, session.model(), session.settings());
    }

    ensure_parent_dir(&args.out)?;
    frame
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        is_ffmpeg_on_path(),
        "ffmpeg is required for MP4 encoding, but was not found on PATH"
    );
    let mut session = load_session(&args.project, Some(args.image.as_path()))?;
    let events = session.start_export(&args.out, args.profile)?;

    let mut last_logged = None;
    for event in events.iter() {
        match event {
            RunEvent::Started {
                estimate,
                width,
                height,
            } => tracing::info!(
                width,
                height,
                frames = estimate.frames,
                duration = %estimate.timecode(),
                "export started"
            ),
            RunEvent::Progress { frame, percent } => {
                let bucket = percent / 10;
                if last_logged != Some(bucket) {
                    last_logged = Some(bucket);
                    tracing::info!(frame, percent, "encoding");
                }
            }
            RunEvent::Finished(_) => break,
        }
    }

    let summary = session
        .wait()?
        .context("export run did not start")?;
    match summary.status {
        RunStatus::Completed => {
            eprintln!("wrote {} ({} frames)", args.out.display(), summary.frames);
            Ok(())
        }
        status => anyhow::bail!(
            "export {status:?}: {}",
            summary.error.unwrap_or_else(|| "no details".to_owned())
        ),
    }
}
