// tests/versioning_tests.rs
// Version numbering and rollback fidelity under randomized edit sequences.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use agentcfg_core::config::CoreConfig;
use agentcfg_core::storage::{MemoryBackend, SettingsBackend, SqliteBackend};
use agentcfg_core::{AgentContent, Commands, ConfigPatch, UpsellRule};

const TONES: [&str; 5] = ["friendly", "professional", "enthusiastic", "casual", "formal"];
const STYLES: [&str; 3] = ["conversational", "formal", "casual"];
const PHRASES: [&str; 6] = ["cheap", "fake", "knockoff", "guarantee", "free", "last chance"];

fn commands(backend: Arc<dyn SettingsBackend>) -> Commands {
    let mut cfg = CoreConfig::default();
    cfg.services.audit_enabled = false;
    Commands::with_backend(backend, &cfg)
}

fn random_patch(rng: &mut StdRng) -> ConfigPatch {
    let mut patch = ConfigPatch::default();
    while patch.is_empty() {
        if rng.gen_bool(0.4) {
            patch = patch.with_system_prompt(format!("You sell shoes. Mood #{}", rng.gen_range(0..1000)));
        }
        if rng.gen_bool(0.4) {
            patch = patch.with_tone(TONES[rng.gen_range(0..TONES.len())]);
        }
        if rng.gen_bool(0.3) {
            patch = patch.with_language_style(STYLES[rng.gen_range(0..STYLES.len())]);
        }
        if rng.gen_bool(0.3) {
            let n = rng.gen_range(0..3);
            let rules = (0..n)
                .map(|i| UpsellRule::new(format!("trigger {i}"), "suggest", format!("offer {}", rng.gen_range(0..50))))
                .collect();
            patch = patch.with_upsell_rules(rules);
        }
        if rng.gen_bool(0.3) {
            let n = rng.gen_range(0..PHRASES.len());
            patch = patch.with_do_not_say(PHRASES.iter().take(n).copied());
        }
    }
    patch
}

fn exercise(backend: Arc<dyn SettingsBackend>, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let cmds = commands(backend);
    let start = cmds.provision("owner").unwrap();

    // Expected content for every version that has ever been current.
    let mut seen: HashMap<u64, AgentContent> = HashMap::new();
    seen.insert(start.version, start.content.clone());
    let mut version = start.version;

    for _ in 0..60 {
        let prior = cmds.get("owner").unwrap();
        let roll = version > 1 && rng.gen_bool(0.25);
        let next = if roll {
            let target = rng.gen_range(1..version);
            let restored = cmds.rollback("owner", target).unwrap();
            assert_eq!(restored.content, seen[&target], "rollback to {target} lost content");
            restored
        } else {
            cmds.update("owner", random_patch(&mut rng)).unwrap()
        };

        assert_eq!(next.version, version + 1);
        let snap = cmds.version("owner", version).unwrap();
        assert_eq!(snap.content, prior.content, "snapshot {version} must hold pre-change content");
        assert_eq!(next.id, prior.id);
        assert!(next.updated_at >= prior.updated_at);

        version = next.version;
        seen.insert(version, next.content);
    }

    let history = cmds.list("owner", Some(usize::MAX)).unwrap();
    let versions: Vec<u64> = history.iter().map(|s| s.version).collect();
    let expected: Vec<u64> = (1..version).rev().collect();
    assert_eq!(versions, expected, "history must be gap-free, unique and newest first");
    for snap in &history {
        assert_eq!(snap.content, seen[&snap.version]);
    }
}

#[test]
fn randomized_sequences_keep_versions_contiguous_memory() {
    for seed in [1_u64, 7, 42] {
        exercise(Arc::new(MemoryBackend::new()), seed);
    }
}

#[test]
fn randomized_sequences_keep_versions_contiguous_sqlite() {
    for seed in [3_u64, 11] {
        exercise(Arc::new(SqliteBackend::open_in_memory().unwrap()), seed);
    }
}

#[test]
fn rollback_to_latest_snapshot_restores_previous_state() {
    let cmds = commands(Arc::new(MemoryBackend::new()));
    cmds.provision("owner").unwrap();
    let v2 = cmds
        .update(
            "owner",
            ConfigPatch::default()
                .with_system_prompt("Sell sneakers.")
                .with_do_not_say(["cheap"]),
        )
        .unwrap();
    cmds.update("owner", ConfigPatch::default().with_tone("formal"))
        .unwrap();

    let restored = cmds.rollback("owner", 2).unwrap();
    assert_eq!(restored.version, 4);
    assert_eq!(restored.content, v2.content);

    // Rolling back twice to the same snapshot still moves forward.
    let again = cmds.rollback("owner", 2).unwrap();
    assert_eq!(again.version, 5);
    assert_eq!(again.content, v2.content);
    assert_eq!(cmds.version("owner", 4).unwrap().content, v2.content);
}

#[test]
fn rollback_to_current_version_is_not_found() {
    let cmds = commands(Arc::new(MemoryBackend::new()));
    cmds.provision("owner").unwrap();
    cmds.update("owner", ConfigPatch::default().with_tone("casual"))
        .unwrap();
    // Version 2 is current; only version 1 has a snapshot.
    let err = cmds.rollback("owner", 2).unwrap_err();
    assert_eq!(err.kind(), "not_found");
    assert_eq!(cmds.get("owner").unwrap().version, 2);
}
