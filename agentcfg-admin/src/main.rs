use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use agentcfg_core::commands::{ensure_initialized, resolve_root};
use agentcfg_core::{Commands, ConfigPatch, UpsellRule};

#[derive(Parser)]
#[command(
    name = "agentcfg-admin",
    about = "Operator helpers for agent configurations and their version history"
)]
struct Cli {
    /// Workspace root (defaults to $AGENTCFG_ROOT or .agentcfg)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Create the workspace layout and default config
    Init,
    /// Create the default configuration for an owner
    Provision {
        #[arg(long)]
        owner: String,
    },
    /// Print the current configuration
    Get {
        #[arg(long)]
        owner: String,
    },
    /// Apply a partial update as a new version
    Update {
        #[arg(long)]
        owner: String,
        #[arg(long, conflicts_with = "prompt_file")]
        prompt: Option<String>,
        #[arg(long)]
        prompt_file: Option<PathBuf>,
        #[arg(long)]
        tone: Option<String>,
        #[arg(long)]
        style: Option<String>,
        /// Forbidden phrase; repeat to replace the whole list
        #[arg(long = "phrase")]
        phrases: Vec<String>,
        /// JSON array of {trigger, action, message}
        #[arg(long)]
        rules_file: Option<PathBuf>,
        /// JSON patch object; flags above override its fields
        #[arg(long)]
        patch_file: Option<PathBuf>,
    },
    /// List snapshots, newest first
    History {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print one snapshot
    Show {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        version: u64,
    },
    /// Restore a snapshot's content as a new version
    Rollback {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        version: u64,
    },
    /// Preview a reply under the current configuration
    Simulate {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        message: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = cli.root.unwrap_or_else(resolve_root);

    if let Cmd::Init = cli.cmd {
        let report = ensure_initialized(&root)?;
        println!("initialized workspace at {}", report.root.display());
        for c in &report.created {
            println!("  created {c}");
        }
        return Ok(());
    }

    let cmds = Commands::open(&root)?;
    match cli.cmd {
        Cmd::Init => Ok(()),
        Cmd::Provision { owner } => print_json(&cmds.provision(&owner)?),
        Cmd::Get { owner } => print_json(&cmds.get(&owner)?),
        Cmd::Update {
            owner,
            prompt,
            prompt_file,
            tone,
            style,
            phrases,
            rules_file,
            patch_file,
        } => {
            let mut patch = match patch_file {
                Some(p) => read_json::<ConfigPatch>(&p)?,
                None => ConfigPatch::default(),
            };
            if let Some(p) = prompt {
                patch.system_prompt = Some(p);
            }
            if let Some(p) = prompt_file {
                let text = fs::read_to_string(&p).with_context(|| format!("reading prompt file {}", p.display()))?;
                patch.system_prompt = Some(text);
            }
            if tone.is_some() {
                patch.tone = tone;
            }
            if style.is_some() {
                patch.language_style = style;
            }
            if !phrases.is_empty() {
                patch.do_not_say = Some(phrases);
            }
            if let Some(p) = rules_file {
                patch.upsell_rules = Some(read_json::<Vec<UpsellRule>>(&p)?);
            }
            print_json(&cmds.update(&owner, patch)?)
        }
        Cmd::History { owner, limit } => {
            let rows: Vec<_> = cmds.list(&owner, limit)?.iter().map(|s| s.summary()).collect();
            print_json(&rows)
        }
        Cmd::Show { owner, version } => print_json(&cmds.version(&owner, version)?),
        Cmd::Rollback { owner, version } => print_json(&cmds.rollback(&owner, version)?),
        Cmd::Simulate { owner, message } => {
            println!("{}", cmds.simulate(&owner, &message)?);
            Ok(())
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
