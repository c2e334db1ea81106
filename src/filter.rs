//! Sample filters
//!
//! A filter is anything that maps one sample to another ([`SampleFilter`]).
//! Closures qualify directly. [`ScriptFilter`] runs a user-editable Rhai
//! script and keeps the history the script helpers need. The display
//! controller only ever sees the [`FilterSlot`], so the active filter can be
//! swapped at runtime without touching it.

use crate::error::Result;
use crate::scripting::{
    CompiledFilter, ExecutionContext, ScriptCache, ScriptEngine, SharedScriptCache,
};
use crate::types::Sample;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Capability to transform one sample into another
pub trait SampleFilter: Send {
    /// Filter one sample
    fn apply(&mut self, sample: Sample) -> Sample;

    /// Forget any history (called when a new acquisition starts)
    fn reset(&mut self) {}

    /// Short name for the status bar
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> SampleFilter for F
where
    F: FnMut(Sample) -> Sample + Send,
{
    fn apply(&mut self, sample: Sample) -> Sample {
        self(sample)
    }
}

/// Pass-through filter
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFilter;

impl SampleFilter for IdentityFilter {
    fn apply(&mut self, sample: Sample) -> Sample {
        sample
    }

    fn name(&self) -> &str {
        "identity"
    }
}

#[derive(Debug, Clone, Copy)]
struct History {
    prev_raw: f64,
    prev_output: f64,
    prev_time: Duration,
}

/// Filter backed by a Rhai script
pub struct ScriptFilter {
    engine: ScriptEngine,
    compiled: CompiledFilter,
    history: Option<History>,
    started: Option<Instant>,
}

impl ScriptFilter {
    /// Compile `source` into a filter
    pub fn new(name: &str, source: &str) -> Result<Self> {
        Self::with_engine(ScriptEngine::new(), name, source)
    }

    /// Compile `source` with an existing engine
    pub fn with_engine(engine: ScriptEngine, name: &str, source: &str) -> Result<Self> {
        let compiled = engine.compile(name, source)?;
        Ok(Self {
            engine,
            compiled,
            history: None,
            started: None,
        })
    }

    /// Script source
    pub fn source(&self) -> &str {
        self.compiled.source()
    }

    /// Filter a sample taken `timestamp` after the first one
    ///
    /// Runtime script errors fall back to the unfiltered sample.
    pub fn apply_at(&mut self, sample: Sample, timestamp: Duration) -> Sample {
        let ctx = match self.history {
            Some(h) => ExecutionContext::new(
                timestamp.as_secs_f64(),
                timestamp.saturating_sub(h.prev_time).as_secs_f64(),
                h.prev_raw,
                h.prev_output,
            ),
            None => ExecutionContext::first_sample(timestamp.as_secs_f64()),
        };

        let output = match self.engine.execute(&self.compiled, sample, ctx) {
            Ok(v) => v,
            Err(e) => {
                tracing::trace!("{}", e);
                sample
            }
        };

        self.history = Some(History {
            prev_raw: sample,
            prev_output: output,
            prev_time: timestamp,
        });
        output
    }
}

impl SampleFilter for ScriptFilter {
    fn apply(&mut self, sample: Sample) -> Sample {
        let timestamp = self.started.get_or_insert_with(Instant::now).elapsed();
        self.apply_at(sample, timestamp)
    }

    fn reset(&mut self) {
        self.history = None;
        self.started = None;
    }

    fn name(&self) -> &str {
        self.compiled.name()
    }
}

impl std::fmt::Debug for ScriptFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptFilter")
            .field("compiled", &self.compiled)
            .field("history", &self.history)
            .finish()
    }
}

/// Holds the active filter
///
/// Scripts checked or installed through the slot share one compile cache,
/// so installing a script that was just checked does not compile it again.
pub struct FilterSlot {
    active: Box<dyn SampleFilter>,
    is_default: bool,
    scripts: SharedScriptCache,
}

impl FilterSlot {
    /// Slot holding the identity filter
    pub fn new() -> Self {
        Self {
            active: Box::new(IdentityFilter),
            is_default: true,
            scripts: Arc::new(RwLock::new(ScriptCache::new())),
        }
    }

    /// Filter one sample with the active filter
    pub fn apply(&mut self, sample: Sample) -> Sample {
        self.active.apply(sample)
    }

    /// Replace the active filter
    pub fn install(&mut self, filter: impl SampleFilter + 'static) {
        tracing::info!("Installing filter '{}'", filter.name());
        self.active = Box::new(filter);
        self.is_default = false;
    }

    /// Compile and install a script filter
    ///
    /// On compile errors the current filter stays active.
    pub fn install_script(&mut self, name: &str, source: &str) -> Result<()> {
        let engine = ScriptEngine::with_cache(self.scripts.clone());
        match ScriptFilter::with_engine(engine, name, source) {
            Ok(filter) => {
                self.install(filter);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to compile filter '{}': {}", name, e);
                Err(e)
            }
        }
    }

    /// Compile a script without installing it
    pub fn check_script(&self, name: &str, source: &str) -> Result<()> {
        ScriptEngine::with_cache(self.scripts.clone())
            .compile(name, source)
            .map(|_| ())
    }

    /// Number of distinct scripts compiled through this slot
    pub fn compiled_scripts(&self) -> usize {
        self.scripts.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Go back to the identity filter
    pub fn clear(&mut self) {
        self.active = Box::new(IdentityFilter);
        self.is_default = true;
    }

    /// Forget filter history
    pub fn reset(&mut self) {
        self.active.reset();
    }

    /// Whether the identity filter is active
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Name of the active filter
    pub fn name(&self) -> &str {
        self.active.name()
    }
}

impl SampleFilter for FilterSlot {
    fn apply(&mut self, sample: Sample) -> Sample {
        self.active.apply(sample)
    }

    fn reset(&mut self) {
        self.active.reset();
    }

    fn name(&self) -> &str {
        self.active.name()
    }
}

impl Default for FilterSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FilterSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterSlot")
            .field("active", &self.active.name())
            .field("is_default", &self.is_default)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_default() {
        let mut slot = FilterSlot::new();
        assert!(slot.is_default());
        assert_eq!(slot.name(), "identity");
        assert_eq!(slot.apply(123.456), 123.456);
    }

    #[test]
    fn test_closure_is_a_filter() {
        let mut slot = FilterSlot::new();
        slot.install(|s: Sample| s / 2.0);
        assert!(!slot.is_default());
        assert_eq!(slot.apply(10.0), 5.0);

        slot.clear();
        assert_eq!(slot.apply(10.0), 10.0);
    }

    #[test]
    fn test_stateful_closure() {
        let mut last = None::<f64>;
        let mut slot = FilterSlot::new();
        slot.install(move |s: Sample| {
            let out = match last {
                Some(p) => (p + s) / 2.0,
                None => s,
            };
            last = Some(s);
            out
        });
        assert_eq!(slot.apply(10.0), 10.0);
        assert_eq!(slot.apply(20.0), 15.0);
    }

    #[test]
    fn test_script_filter_smooths() {
        let mut filter = ScriptFilter::new("smooth", "smooth(value, 0.5)").unwrap();
        assert_eq!(filter.apply_at(10.0, Duration::from_millis(0)), 10.0);
        assert!((filter.apply_at(20.0, Duration::from_millis(100)) - 15.0).abs() < 1e-9);
        assert!((filter.apply_at(20.0, Duration::from_millis(200)) - 17.5).abs() < 1e-9);

        filter.reset();
        assert_eq!(filter.apply_at(40.0, Duration::from_millis(0)), 40.0);
    }

    #[test]
    fn test_script_runtime_error_falls_back() {
        let mut filter = ScriptFilter::new("broken", "undefined_fn(value)").unwrap();
        assert_eq!(filter.apply(1000.0), 1000.0);
    }

    #[test]
    fn test_install_script_keeps_previous_on_error() {
        let mut slot = FilterSlot::new();
        slot.install_script("double", "value * 2.0").unwrap();
        assert_eq!(slot.name(), "double");

        assert!(slot.install_script("bad", "value * (").is_err());
        assert_eq!(slot.name(), "double");
        assert_eq!(slot.apply(4.0), 8.0);
    }

    #[test]
    fn test_checked_script_is_reused_on_install() {
        let mut slot = FilterSlot::new();
        slot.check_script("halve", "value / 2.0").unwrap();
        assert_eq!(slot.compiled_scripts(), 1);
        assert!(slot.check_script("halve", "value / ").is_err());

        slot.install_script("halve", "value / 2.0").unwrap();
        assert_eq!(slot.compiled_scripts(), 1);
        assert_eq!(slot.apply(10.0), 5.0);
    }

    #[test]
    fn test_same_source_under_two_names() {
        let mut slot = FilterSlot::new();
        slot.install_script("first", "value + 1.0").unwrap();
        slot.install_script("second", "value + 1.0").unwrap();
        assert_eq!(slot.name(), "second");
        assert_eq!(slot.compiled_scripts(), 2);
    }
}
