use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facegate::models::{ProblemKind, Role};
use facegate::store::FileStore;
use facegate::verify::{Verifier, VerifyRequest};
use facegate::{config, enroll, Pipeline};
use log::info;

#[derive(Parser)]
#[command(name = "facegate")]
#[command(
    version,
    about = "Face-verified access control for industrial machines"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the verification and enrollment endpoints
    #[cfg(feature = "server")]
    Serve {
        /// Listen address (overrides the configured one)
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Enroll an agent's face reference from a photo file
    Enroll {
        /// Agent id
        #[arg(short, long)]
        agent: u32,
        /// Photo file to encode
        #[arg(short, long)]
        photo: PathBuf,
    },
    /// Run a verification from a photo file
    Verify {
        /// Agent id
        #[arg(short, long)]
        agent: u32,
        /// Machine id
        #[arg(short, long)]
        machine: u32,
        /// Problem type: matière, technique or câblage
        #[arg(long)]
        problem: ProblemKind,
        /// Photo file with the live capture
        #[arg(short, long)]
        photo: PathBuf,
    },
    /// Create test agents and machines
    Seed,
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(None)?;

    match cli.command {
        #[cfg(feature = "server")]
        Commands::Serve { listen } => {
            let mut cfg = cfg;
            if let Some(listen) = listen {
                cfg.listen = listen;
            }
            let mut pipeline = open_pipeline(&cfg)?;
            facegate::server::serve(&cfg, &mut pipeline)
        }
        Commands::Enroll { agent, photo } => run_enroll(&cfg, agent, &photo),
        Commands::Verify {
            agent,
            machine,
            problem,
            photo,
        } => run_verify(&cfg, agent, machine, problem, &photo),
        Commands::Seed => seed(&cfg),
        Commands::Config => open_config(),
    }
}

fn open_pipeline(cfg: &config::Config) -> Result<Pipeline> {
    Pipeline::open(
        &cfg.detector_model,
        &cfg.recognizer_model,
        cfg.score_threshold,
    )
    .context("initializing face recognition pipeline")
}

fn run_enroll(cfg: &config::Config, agent: u32, photo: &PathBuf) -> Result<()> {
    let bytes = std::fs::read(photo)
        .with_context(|| format!("reading photo {}", photo.display()))?;
    let mut store = FileStore::open(&cfg.data_dir)?;
    let mut pipeline = open_pipeline(cfg)?;
    let budget = Duration::from_millis(cfg.request_timeout_ms);

    enroll::enroll(&mut store, &mut pipeline, agent, &bytes, budget)
        .context("enrollment failed")?;
    info!("✓ Face reference enrolled for agent {}", agent);
    Ok(())
}

fn run_verify(
    cfg: &config::Config,
    agent: u32,
    machine: u32,
    problem: ProblemKind,
    photo: &PathBuf,
) -> Result<()> {
    let bytes = std::fs::read(photo)
        .with_context(|| format!("reading photo {}", photo.display()))?;
    let mut store = FileStore::open(&cfg.data_dir)?;
    let mut pipeline = open_pipeline(cfg)?;

    let verifier = Verifier::from_config(cfg);
    let decision = verifier.verify(
        &mut store,
        &mut pipeline,
        &VerifyRequest {
            agent_id: agent,
            machine_id: machine,
            problem,
            photo: bytes,
        },
    );

    if decision.is_authorized() {
        info!("✓ {}", decision.message());
        Ok(())
    } else {
        anyhow::bail!(decision.message())
    }
}

fn seed(cfg: &config::Config) -> Result<()> {
    let mut store = FileStore::open(&cfg.data_dir)?;

    let agents = [
        ("Admin User", Role::Admin),
        ("Marie Curie", Role::Quality),
        ("Nikola Tesla", Role::Maintenance),
        ("Louis Pasteur", Role::Quality),
        ("Isaac Newton", Role::Maintenance),
    ];
    for (name, role) in agents {
        if store.agent_by_name(name)?.is_some() {
            info!("Agent already exists: {}", name);
            continue;
        }
        let id = store.create_agent(name, role)?;
        info!("Agent created: {} ({}, id {})", name, role, id);
    }

    let machines = [
        ("Presse Hydraulique A-100", "Atelier 1"),
        ("Robot de Soudure B-200", "Atelier 2"),
        ("Tour CNC C-300", "Atelier 1"),
        ("Ligne d'assemblage D-400", "Atelier 3"),
    ];
    for (name, location) in machines {
        if store.machine_by_name(name)?.is_some() {
            info!("Machine already exists: {}", name);
            continue;
        }
        let id = store.create_machine(name, location)?;
        info!("Machine created: {} ({}, id {})", name, location, id);
    }

    Ok(())
}

fn open_config() -> Result<()> {
    let config_path = config::CONFIG_PATH.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
