// agentcfg-core/src/commands/init.rs

use anyhow::{Context, Result};
use chrono::Utc;
use once_cell::sync::OnceCell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::CoreConfig;

#[derive(Debug, Clone)]
pub struct InitReport {
    pub root: PathBuf,
    pub created: Vec<String>,
    pub existed: Vec<String>,
    pub config: CoreConfig,
}

// ---------- single global init gate ----------

static INIT: OnceCell<InitReport> = OnceCell::new();

/// Idempotent process-wide initializer for the root named by `AGENTCFG_ROOT`.
/// Returns a &'static InitReport once initialization has completed.
pub fn ensure_initialized_once() -> Result<&'static InitReport> {
    INIT.get_or_try_init(|| ensure_initialized(&resolve_root()))
}

/// Workspace root. `AGENTCFG_ROOT` overrides the default `.agentcfg`.
pub fn resolve_root() -> PathBuf {
    std::env::var_os("AGENTCFG_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".agentcfg"))
}

/// Ensure the workspace layout under `root` exists, then load its config.
/// Directories and the logbook come from the loaded config, so a custom
/// `[storage] db_path` or `[logbook]` location is created where it is read.
/// Safe to call repeatedly; existing files are never overwritten.
pub fn ensure_initialized(root: &Path) -> Result<InitReport> {
    let root = root.to_path_buf();
    let mut created = Vec::new();
    let mut existed = Vec::new();

    ensure_dir(&root, &root, &mut created, &mut existed)?;
    ensure_file(
        &root,
        &root.join("config.toml"),
        DEFAULT_CONFIG_TOML,
        &mut created,
        &mut existed,
    )?;

    let config = CoreConfig::load(&root)?;
    if let Some(db_dir) = config.storage.db_path.parent() {
        ensure_dir(&root, db_dir, &mut created, &mut existed)?;
    }
    ensure_dir(&root, &config.logbook.path, &mut created, &mut existed)?;
    initialize_logbook_files(&root, &config, &mut created, &mut existed)?;

    tracing::debug!(system = %config.system.name, root = %root.display(), "workspace initialized");
    Ok(InitReport {
        root,
        created,
        existed,
        config,
    })
}

/// Report label: the path relative to the root when it lies inside it.
fn label(root: &Path, p: &Path) -> String {
    match p.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => p.display().to_string(),
    }
}

fn ensure_dir(
    root: &Path,
    p: &Path,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    let name = label(root, p);
    if p.exists() {
        if !existed.contains(&name) {
            existed.push(name);
        }
        return Ok(());
    }
    fs::create_dir_all(p).with_context(|| format!("create_dir_all({:?})", p))?;
    created.push(name);
    Ok(())
}

fn ensure_file(
    root: &Path,
    p: &Path,
    content_if_absent: &str,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    if p.exists() {
        existed.push(label(root, p));
        return Ok(());
    }
    write_atomic(p, content_if_absent.as_bytes())?;
    created.push(label(root, p));
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create_dir_all({:?})", parent))?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)
            .with_context(|| format!("open temp file {:?}", tmp))?;
        f.write_all(bytes)?;
        f.flush()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("rename {:?} -> {:?}", tmp, path))?;
    Ok(())
}

fn initialize_logbook_files(
    root: &Path,
    config: &CoreConfig,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    let actions = &config.logbook.actions;
    if actions.exists() {
        existed.push(label(root, actions));
        return Ok(());
    }
    let init_event = serde_json::json!({
        "timestamp": Utc::now().to_rfc3339(),
        "event": "system_init",
        "agent": "system",
        "details": {
            "system": config.system.name,
            "version": env!("CARGO_PKG_VERSION"),
        },
    });
    ensure_file(root, actions, &format!("{init_event}\n"), created, existed)
}

// ---------- defaults ----------

const DEFAULT_CONFIG_TOML: &str = r#"[system]
name = "agentcfg"

[storage]
backend = "sqlite"
db_path = "db/settings.db"

[limits]
system_prompt_max_chars = 5000
max_upsell_rules = 50
max_forbidden_phrases = 200
max_phrase_chars = 256

[history]
default_limit = 10

[logbook]
path = "logbook"
actions = "logbook/actions.jsonl"

[services]
audit_enabled = true

[policies]
log_preview_len = 160
"#;
