//! Command-line tools for magnet-frame designs.
//!
//! Usage:
//!   misgarot derive-portrait --input landscape.json [--frame portrait-frame.json] [--output portrait.json]
//!   misgarot inspect --slot-dir ./slots --design design-1
//!   misgarot publish-frame --input frame.json --name "Wedding" [--category weddings] [--dry-run]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use misgarot::{
    calculate_portrait_from_landscape, AutoSaveManager, CanvasSize, CanvasSnapshot, Collaborators,
    DesignSessionManager, EditPolicy, EditorConfig, EditorController, EditorMode, FileSlot,
    MemoryBackend, MemorySlot, PublishFrameRequest, SupabaseClient, SupabaseConfig,
};

#[derive(Parser, Debug)]
#[command(name = "misgarot", about = "Magnet-frame design tools", version)]
struct Args {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive a portrait design from a landscape snapshot
    DerivePortrait {
        /// Landscape snapshot JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Portrait frame snapshot whose locked elements are placed first
        #[arg(short, long)]
        frame: Option<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the auto-save record and design session kept in a slot directory
    Inspect {
        /// Directory holding the local slot files
        #[arg(long)]
        slot_dir: PathBuf,

        /// Design key the auto-save record was written for
        #[arg(long, default_value = "new")]
        design: String,
    },

    /// Publish a snapshot as a frame template (landscape input also creates the portrait pair)
    PublishFrame {
        /// Frame snapshot JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Display name
        #[arg(long)]
        name: String,

        /// English display name
        #[arg(long)]
        name_en: Option<String>,

        /// Category id
        #[arg(long)]
        category: Option<String>,

        /// Mark as premium
        #[arg(long)]
        premium: bool,

        /// Existing frame to pair with (portrait and custom sizes)
        #[arg(long)]
        paired_with: Option<String>,

        /// Backend project URL
        #[arg(long, env = "MISGAROT_SUPABASE_URL")]
        supabase_url: Option<String>,

        /// Backend API key
        #[arg(long, env = "MISGAROT_SUPABASE_KEY", hide_env_values = true)]
        supabase_key: Option<String>,

        /// Publish into an in-memory backend and print the records instead
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "misgarot=debug" } else { "misgarot=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Command::DerivePortrait {
            input,
            frame,
            output,
        } => derive_portrait(&input, frame.as_deref(), output.as_deref()),
        Command::Inspect { slot_dir, design } => inspect(&slot_dir, &design),
        Command::PublishFrame {
            input,
            name,
            name_en,
            category,
            premium,
            paired_with,
            supabase_url,
            supabase_key,
            dry_run,
        } => {
            let mut request = PublishFrameRequest::new(name);
            request.name_en = name_en;
            request.category_id = category;
            request.is_premium = premium;
            request.paired_frame_id = paired_with;

            let backend = if dry_run {
                None
            } else {
                let url = supabase_url
                    .context("--supabase-url or MISGAROT_SUPABASE_URL is required")?;
                let key = supabase_key
                    .context("--supabase-key or MISGAROT_SUPABASE_KEY is required")?;
                Some(SupabaseConfig::new(url, key))
            };
            publish_frame(&input, request, backend).await
        }
    }
}

fn read_snapshot(path: &Path) -> Result<CanvasSnapshot> {
    if !path.exists() {
        anyhow::bail!("Input file does not exist: {}", path.display());
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

fn derive_portrait(input: &Path, frame: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let config = EditorConfig::default();
    let landscape = read_snapshot(input)?;
    let (_, user) = misgarot::canvas::partition_locked(&landscape.elements);

    let mut elements = match frame {
        Some(path) => {
            let frame = read_snapshot(path)?;
            misgarot::canvas::partition_locked(&frame.elements).0
        }
        None => Vec::new(),
    };
    let locked = elements.len();
    elements.extend(
        calculate_portrait_from_landscape(&user, landscape.size(), config.portrait_size)
            .context("Failed to derive portrait")?,
    );

    let portrait = CanvasSnapshot::new(elements, config.portrait_size, &landscape.background());
    let json = serde_json::to_string_pretty(&portrait)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).context("Failed to write output file")?;
            println!(
                "✓ {} locked + {} derived elements written to {}",
                locked,
                portrait.elements.len() - locked,
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn inspect(slot_dir: &Path, design: &str) -> Result<()> {
    let config = EditorConfig::default();
    let slot = Arc::new(FileSlot::open(slot_dir).context("Failed to open slot directory")?);

    let autosave = AutoSaveManager::from_config(slot.clone(), &config, design);
    println!("Auto-save ({})", autosave.key());
    match autosave.get_saved_info() {
        Some(info) => println!("  {}", info),
        None => println!("  none"),
    }

    println!();
    println!("Design session ({})", config.session_key);
    let Some(mut session) = DesignSessionManager::load(slot.as_ref(), &config.session_key)
        .context("Failed to load design session")?
    else {
        println!("  none");
        return Ok(());
    };
    let state = session.get_state()?;
    if state.is_empty() {
        println!("  empty");
        return Ok(());
    }
    for (label, design) in [("landscape", &state.landscape), ("portrait", &state.portrait)] {
        match design {
            Some(d) => println!(
                "  {:<10} {:>4} elements ({} locked) at {}",
                label,
                d.elements.len(),
                d.locked_count(),
                d.size
            ),
            None => println!("  {:<10} none", label),
        }
    }
    if let Some(style) = state.style {
        println!("  frame: {}", style.frame_id.as_deref().unwrap_or("-"));
        println!("  background: {:?} {}", style.background_type, style.background_color);
    }
    Ok(())
}

async fn publish_frame(
    input: &Path,
    request: PublishFrameRequest,
    backend: Option<SupabaseConfig>,
) -> Result<()> {
    let config = EditorConfig::default();
    let snapshot = read_snapshot(input)?;
    let mode = match snapshot.size() {
        size if size == config.landscape_size => EditorMode::Landscape,
        size if size == config.portrait_size => EditorMode::Portrait,
        CanvasSize { .. } => EditorMode::Custom,
    };

    let memory = Arc::new(MemoryBackend::new());
    let remote = match backend {
        Some(ref supabase) => Collaborators::from_backend(Arc::new(
            SupabaseClient::new(supabase).context("Failed to create backend client")?,
        )),
        None => Collaborators::from_backend(memory.clone()),
    };

    let mut editor =
        EditorController::new(config.clone(), Arc::new(MemorySlot::new()), remote, "publish")?;
    editor.enter(mode, None).await?;
    let store = editor.store_mut()?;
    store.set_policy(EditPolicy::Admin);
    store.load_snapshot(&snapshot)?;

    info!(mode = mode.as_str(), elements = snapshot.elements.len(), "publishing frame");
    let outcome = editor.publish_frame(request).await?;

    println!("✓ Frame published: {}", outcome.frame_id);
    if let Some(ref paired) = outcome.paired_id {
        println!("  paired with: {}", paired);
    }

    if backend.is_none() {
        let records = memory.records(&config.frames_collection);
        println!("{}", serde_json::to_string_pretty(&records)?);
    }
    Ok(())
}
