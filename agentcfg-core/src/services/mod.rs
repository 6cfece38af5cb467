// src/services/mod.rs

pub mod audit;
pub mod ledger;      // history browse + rollback, delegates writes to settings
pub mod prompt;      // live-conversation prompt assembly
pub mod settings;    // the ONLY path that mutates a configuration
pub mod simulator;   // preview replies, never the live path

// Public API
pub use audit::Logbook;
pub use ledger::VersionLedger;
pub use prompt::{CatalogItem, ChatTurn, PromptContext, build_prompt};
pub use settings::SettingsStore;
pub use simulator::simulate;
