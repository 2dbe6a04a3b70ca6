use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Section file syntax error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Savegame corrupt in [{section}]: {message}")]
    Corrupt { section: String, message: String },

    #[error("Ruleset mismatch: unknown {what} '{value}'")]
    RulesetMismatch { what: String, value: String },

    #[error("Trying to write invalid map data at '{path}': character code {code}")]
    UnprintableChar { path: String, code: u32 },

    #[error("Savegame version {found} is newer than the supported version {current}")]
    VersionUnsupported { found: i64, current: i64 },

    #[error("Savegame has no usable format version")]
    MissingVersion,

    #[error("Invalid digit '{ch}' for the {alphabet} alphabet")]
    InvalidDigit { ch: char, alphabet: &'static str },

    #[error("Load failed: {message}")]
    LoadFailed { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SaveResult<T> = Result<T, SaveError>;

impl SaveError {
    /// Shorthand for a load-aborting structural failure.
    pub fn corrupt(section: &str, message: impl Into<String>) -> Self {
        Self::Corrupt { section: section.to_string(), message: message.into() }
    }

    /// True for errors the orchestrator records in the sticky status
    /// instead of propagating straight to the caller.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Corrupt { .. } | Self::MissingVersion | Self::VersionUnsupported { .. }
        )
    }
}

// ── Load status ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message:  String,
}

/// Outcome of one load, threaded through every sub-loader.
///
/// RULE: `ok` is sticky. Once a failure is recorded no later step runs.
#[derive(Debug, Clone)]
pub struct LoadStatus {
    ok:          bool,
    diagnostics: Vec<Diagnostic>,
}

impl Default for LoadStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadStatus {
    pub fn new() -> Self {
        Self { ok: true, diagnostics: Vec::new() }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Record a recoverable per-field problem. The load continues.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.diagnostics.push(Diagnostic { severity: Severity::Warning, message });
    }

    /// Record a load-aborting problem and clear the sticky flag.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{message}");
        self.ok = false;
        self.diagnostics.push(Diagnostic { severity: Severity::Failure, message });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| d.message.as_str())
    }

    /// One message carrying every collected diagnostic, failures last.
    pub fn aggregate(&self) -> String {
        let mut lines: Vec<String> = self
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| format!("warning: {}", d.message))
            .collect();
        lines.extend(
            self.diagnostics
                .iter()
                .filter(|d| d.severity == Severity::Failure)
                .map(|d| format!("failure: {}", d.message)),
        );
        lines.join("\n")
    }

    pub fn into_error(self) -> SaveError {
        SaveError::LoadFailed { message: self.aggregate() }
    }
}
