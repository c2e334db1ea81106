//! Rhai scripting for user-defined sample filters
//!
//! A filter script maps one frequency sample to another. It is either a
//! bare expression over `value`, or defines an entry function:
//!
//! ```rhai
//! fn filter(value) {
//!     // Ignore glitches above 10 MHz
//!     if value > 10000000.0 { prev() } else { value }
//! }
//! ```
//!
//! See [`engine`] for the helper functions available to scripts.

mod engine;

pub use engine::{ExecutionContext, ScriptEngine, SharedContext};

use crate::error::{FreqMeterError, Result};
use rhai::{Engine, AST};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Name of the optional entry function in filter scripts
pub const ENTRY_FN: &str = "filter";

/// A compiled filter script
#[derive(Clone)]
pub struct CompiledFilter {
    ast: AST,
    source: String,
    name: String,
    /// Whether the script defines `fn filter(value)`
    has_entry_fn: bool,
}

impl CompiledFilter {
    /// Get the source code of this filter
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the name of this filter
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the script is called through its entry function
    pub fn has_entry_fn(&self) -> bool {
        self.has_entry_fn
    }
}

impl std::fmt::Debug for CompiledFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledFilter")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("has_entry_fn", &self.has_entry_fn)
            .finish()
    }
}

/// Cache for compiled scripts, keyed by filter name and source text
#[derive(Default)]
pub struct ScriptCache {
    cache: HashMap<(String, String), CompiledFilter>,
}

impl ScriptCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached filter or compile and cache it
    pub fn get_or_compile(
        &mut self,
        engine: &Engine,
        name: &str,
        source: &str,
    ) -> Result<CompiledFilter> {
        let key = (name.to_string(), source.to_string());
        if let Some(filter) = self.cache.get(&key) {
            return Ok(filter.clone());
        }

        let ast = engine
            .compile(source)
            .map_err(|e| FreqMeterError::Script(format!("Compilation error: {}", e)))?;
        let has_entry_fn = ast
            .iter_functions()
            .any(|f| f.name == ENTRY_FN && f.params.len() == 1);

        let filter = CompiledFilter {
            ast,
            source: source.to_string(),
            name: name.to_string(),
            has_entry_fn,
        };

        self.cache.insert(key, filter.clone());
        Ok(filter)
    }

    /// Number of cached scripts
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Thread-safe script cache wrapper
pub type SharedScriptCache = Arc<RwLock<ScriptCache>>;

/// Filter presets offered in the filter editor
pub mod presets {
    /// Pass-through, same as having the filter disabled
    pub const IDENTITY: &str = r#"
fn filter(value) {
    value
}
"#;

    /// Exponential smoothing for jittery low-frequency readings
    pub const SMOOTH: &str = r#"
// Exponential smoothing, alpha=0.8 (higher = smoother, more lag)
smooth(value, 0.8)
"#;

    /// Lowpass at 0.2 Hz, settles over a few slow-mode readings
    pub const LOWPASS: &str = r#"
// First-order lowpass on the reading sequence
lowpass(value, 0.2)
"#;

    /// Hold the previous output when the change is below 1 Hz
    pub const DEADBAND: &str = r#"
fn filter(value) {
    if has_prev() { deadband(value, prev(), 2.0) } else { value }
}
"#;

    /// Quantize to whole hertz
    pub const ROUND_HZ: &str = r#"
round_to(value, 1.0)
"#;

    /// Reject single-sample spikes more than 10x the previous output
    pub const SPIKE_REJECT: &str = r#"
fn filter(value) {
    if has_prev() && prev() > 0.0 && value > prev() * 10.0 {
        prev()
    } else {
        value
    }
}
"#;

    /// All presets with display names
    pub fn all() -> Vec<(&'static str, &'static str)> {
        vec![
            ("Identity", IDENTITY),
            ("Smooth (80%)", SMOOTH),
            ("Lowpass 0.2 Hz", LOWPASS),
            ("Deadband (±1 Hz)", DEADBAND),
            ("Round to Hz", ROUND_HZ),
            ("Spike reject", SPIKE_REJECT),
        ]
    }
}
