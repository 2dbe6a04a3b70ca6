//! Per-call state for one load or one save.
//!
//! RULE: a context lives exactly as long as one `load`/`save` call.
//! Its order tables and scratch arrays are dropped with it on every exit
//! path, success or failure.

use crate::config::SaveConfig;
use crate::error::LoadStatus;
use crate::order_table::OrderTables;
use crate::rng::GameRng;
use crate::ruleset::Ruleset;
use crate::sanity::RepairReport;
use crate::secfile::SectionFile;
use crate::types::CityId;
use crate::world::ServerState;

pub struct LoadContext<'a> {
    pub file:               &'a mut SectionFile,
    pub ruleset:            &'a Ruleset,
    pub status:             LoadStatus,
    /// `savefile.version` as read, before any transform ran.
    pub file_version:       i64,
    pub applied_transforms: Vec<i64>,
    capabilities:           Vec<String>,
    pub tables:             OrderTables,
    pub server_state:       ServerState,
    /// Generator state to restore once loading is complete.
    pub rstate:             GameRng,
    pub rstate_from_file:   bool,
    /// `map.worked*` rows, consumed when cities are loaded.
    pub worked_tiles:       Vec<Option<CityId>>,
    pub repairs:            RepairReport,
    /// Seed used when the file carries no generator state.
    pub seed:               u64,
}

impl<'a> LoadContext<'a> {
    pub fn new(file: &'a mut SectionFile, ruleset: &'a Ruleset) -> Self {
        Self {
            file,
            ruleset,
            status: LoadStatus::new(),
            file_version: 0,
            applied_transforms: Vec::new(),
            capabilities: Vec::new(),
            tables: OrderTables::default(),
            server_state: ServerState::Initial,
            rstate: GameRng::uninitialized(),
            rstate_from_file: false,
            worked_tiles: Vec::new(),
            repairs: RepairReport::default(),
            seed: 0,
        }
    }

    pub fn set_capabilities(&mut self, options: &str) {
        self.capabilities = options.split_whitespace().map(str::to_string).collect();
    }

    pub fn has_capability(&self, cap: &str) -> bool {
        self.capabilities.iter().any(|c| c == cap)
    }
}

pub struct SaveContext<'a> {
    pub file:         SectionFile,
    pub ruleset:      &'a Ruleset,
    pub config:       &'a SaveConfig,
    /// Capability string accumulated while saving.
    pub options:      String,
    pub reason:       String,
    pub scenario:     bool,
    pub save_players: bool,
    pub tables:       OrderTables,
}

impl<'a> SaveContext<'a> {
    pub fn new(ruleset: &'a Ruleset, config: &'a SaveConfig, reason: &str) -> Self {
        Self {
            file: SectionFile::new(),
            ruleset,
            config,
            options: String::new(),
            reason: reason.to_string(),
            scenario: config.scenario,
            save_players: !config.scenario || config.scenario_save_players,
            tables: OrderTables::current(ruleset),
        }
    }

    /// Append a capability token to `savefile.options`.
    pub fn add_option(&mut self, option: &str) {
        if !self.options.is_empty() {
            self.options.push(' ');
        }
        self.options.push_str(option);
        self.file.set_str("savefile.options", &self.options);
    }
}
