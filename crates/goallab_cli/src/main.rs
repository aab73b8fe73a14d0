use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use goallab_core::{registry, Atom, AtomKey, PipelineConfig, Scene};
use goallab_stages::assemble_frame;

const DEFAULT_CONFIG: &str = "goallab.toml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Emit logs as JSON lines (stderr)
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute one frame for a scene and print it as JSON
    Frame {
        /// Scene JSON file
        #[arg(short, long)]
        scene: PathBuf,

        /// Pipeline config (TOML). Defaults to ./goallab.toml if present
        #[arg(short, long, env = "GOALLAB_CONFIG")]
        config: Option<PathBuf>,

        /// JSON array of ToM / physiology atoms merged before the threat stage
        #[arg(long)]
        tom: Option<PathBuf>,

        /// Pretty-print the frame
        #[arg(long)]
        pretty: bool,

        /// Skip the appraisal/emotion stage
        #[arg(long)]
        no_appraisal: bool,
    },

    /// Print the catalog entry for each atom id
    Describe {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Print only the summary panels for a scene
    Panels {
        #[arg(short, long)]
        scene: PathBuf,

        #[arg(short, long, env = "GOALLAB_CONFIG")]
        config: Option<PathBuf>,

        /// Same ToM / physiology atom file as `frame --tom`
        #[arg(long)]
        tom: Option<PathBuf>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::load(p),
        None => Ok(PipelineConfig::load_or_default(DEFAULT_CONFIG)),
    }
}

fn load_external_atoms(path: &Path) -> Result<Vec<Atom>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read atom file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse atom list: {}", path.display()))
}

fn load_external_or_empty(path: Option<&Path>) -> Result<Vec<Atom>> {
    match path {
        Some(p) => load_external_atoms(p),
        None => Ok(Vec::new()),
    }
}

fn load_scene(path: &Path) -> Result<Scene> {
    Scene::load(path).with_context(|| format!("Failed to load scene: {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    match args.command {
        Command::Frame {
            scene,
            config,
            tom,
            pretty,
            no_appraisal,
        } => {
            let mut config = load_config(config.as_deref())?;
            if no_appraisal {
                config.appraisal = false;
            }
            let scene = load_scene(&scene)?;
            let external = load_external_or_empty(tom.as_deref())?;

            let frame = assemble_frame(&scene, &external, &config);
            for v in frame.range_violations() {
                warn!("{} = {} outside {:?} scale", v.id, v.magnitude, v.scale);
            }
            info!(
                agent = %frame.agent_id,
                tick = frame.tick,
                atoms = frame.atoms.len(),
                "Frame computed"
            );
            println!("{}", frame.to_json(pretty)?);
        }
        Command::Describe { ids } => {
            let catalog = registry();
            for id in &ids {
                let spec = catalog.describe_or_unknown(id);
                println!("{}", id);
                match AtomKey::parse(id) {
                    Ok(key) => {
                        println!("  namespace: {}", key.namespace);
                        if !key.axis.is_empty() {
                            println!("  axis:     {}", key.axis.join(":"));
                        }
                        println!("  subject:  {}", key.subject);
                        if let Some(target) = &key.target {
                            println!("  target:   {}", target);
                        }
                        if let Some(facet) = &key.facet {
                            println!("  facet:    {}", facet);
                        }
                    }
                    Err(e) => println!("  key:      {}", e),
                }
                println!("  title:    {}", spec.title);
                println!("  meaning:  {}", spec.meaning);
                let (lo, hi) = spec.scale.bounds();
                println!("  scale:    {}..{}", lo, hi);
                if !spec.formula.is_empty() {
                    println!("  formula:  {}", spec.formula);
                }
                if !spec.produced_by.is_empty() {
                    println!("  produced: {}", spec.produced_by);
                }
                if !spec.consumed_by.is_empty() {
                    println!("  consumed: {}", spec.consumed_by);
                }
            }
        }
        Command::Panels { scene, config, tom } => {
            let config = load_config(config.as_deref())?;
            let scene = load_scene(&scene)?;
            let external = load_external_or_empty(tom.as_deref())?;
            let frame = assemble_frame(&scene, &external, &config);
            println!("{}", serde_json::to_string_pretty(&frame.panels)?);
        }
    }

    Ok(())
}
