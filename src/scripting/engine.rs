//! Rhai Script Engine Implementation
//!
//! This module provides the engine that runs user filter scripts.
//!
//! ## Dynamic Variables
//!
//! - `value` / `raw` - The sample being filtered, in Hz (after the multiplier)
//! - `time()` - Seconds since the filter saw its first sample
//! - `dt()` - Seconds since the previous sample
//! - `prev()` - Previous filter output (NaN if not available)
//! - `prev_raw()` - Previous filter input (NaN if not available)
//!
//! ## Filter Helpers
//!
//! - `smooth(value, alpha)` / `smooth(current, previous, alpha)` - EWMA
//! - `lowpass(value, cutoff_hz)` / `lowpass(current, previous, cutoff_hz, dt)`
//! - `deadband(value, center, width)`
//! - `rate_limit(value, max_rate)` / `rate_limit(current, previous, max_rate, dt)`
//! - `round_to(value, step)` - Quantize to a step size

use crate::error::{FreqMeterError, Result, ResultExt};
use crate::scripting::{CompiledFilter, SharedScriptCache, ScriptCache, ENTRY_FN};
use rhai::{Dynamic, Engine, Scope};
use std::sync::{Arc, RwLock};

/// Execution context passed to scripts, containing timing and history
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Seconds since the first filtered sample
    pub time_secs: f64,
    /// Seconds since the previous sample
    pub dt_secs: f64,
    /// Previous input (NaN if not available)
    pub prev_raw: f64,
    /// Previous output (NaN if not available)
    pub prev_output: f64,
}

impl ExecutionContext {
    /// Create a new execution context
    pub fn new(time_secs: f64, dt_secs: f64, prev_raw: f64, prev_output: f64) -> Self {
        Self {
            time_secs,
            dt_secs,
            prev_raw,
            prev_output,
        }
    }

    /// Create context with no previous values
    pub fn first_sample(time_secs: f64) -> Self {
        Self {
            time_secs,
            dt_secs: 0.0,
            prev_raw: f64::NAN,
            prev_output: f64::NAN,
        }
    }
}

/// Thread-safe shared execution context read by the registered functions
pub type SharedContext = Arc<RwLock<ExecutionContext>>;

fn ewma(current: f64, previous: f64, alpha: f64) -> f64 {
    let alpha = alpha.clamp(0.0, 1.0);
    if previous.is_nan() {
        current
    } else {
        alpha * previous + (1.0 - alpha) * current
    }
}

fn first_order_lowpass(current: f64, previous: f64, cutoff_hz: f64, dt: f64) -> f64 {
    if !previous.is_nan() && dt > 0.0 && cutoff_hz > 0.0 {
        let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff_hz);
        let alpha = dt / (rc + dt);
        previous + alpha * (current - previous)
    } else {
        current
    }
}

fn limit_rate(current: f64, previous: f64, max_rate: f64, dt: f64) -> f64 {
    if !previous.is_nan() && dt > 0.0 {
        let max_change = max_rate * dt;
        let change = current - previous;
        if change.abs() > max_change {
            previous + change.signum() * max_change
        } else {
            current
        }
    } else {
        current
    }
}

/// The script engine for sample filters
pub struct ScriptEngine {
    engine: Engine,
    cache: SharedScriptCache,
    context: SharedContext,
}

impl ScriptEngine {
    /// Create a new script engine with its own cache
    pub fn new() -> Self {
        Self::with_cache(Arc::new(RwLock::new(ScriptCache::new())))
    }

    /// Create a new script engine with a shared cache
    pub fn with_cache(cache: SharedScriptCache) -> Self {
        let context = Arc::new(RwLock::new(ExecutionContext::default()));
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine, context.clone());

        Self {
            engine,
            cache,
            context,
        }
    }

    /// Configure the Rhai engine with helper functions and safety limits
    fn configure_engine(engine: &mut Engine, context: SharedContext) {
        // Filters run once per sample on the UI thread
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(32);
        engine.set_max_operations(10_000);
        engine.set_max_string_size(10_000);
        engine.set_max_array_size(1_000);
        engine.set_max_map_size(1_000);

        {
            let ctx = context.clone();
            engine.register_fn("time", move || -> f64 {
                ctx.read().map(|c| c.time_secs).unwrap_or(0.0)
            });
        }
        {
            let ctx = context.clone();
            engine.register_fn("dt", move || -> f64 {
                ctx.read().map(|c| c.dt_secs).unwrap_or(0.0)
            });
        }
        {
            let ctx = context.clone();
            engine.register_fn("prev", move || -> f64 {
                ctx.read().map(|c| c.prev_output).unwrap_or(f64::NAN)
            });
        }
        {
            let ctx = context.clone();
            engine.register_fn("prev_raw", move || -> f64 {
                ctx.read().map(|c| c.prev_raw).unwrap_or(f64::NAN)
            });
        }
        {
            let ctx = context.clone();
            engine.register_fn("has_prev", move || -> bool {
                ctx.read().map(|c| !c.prev_output.is_nan()).unwrap_or(false)
            });
        }

        engine.register_fn("smooth", ewma);
        {
            let ctx = context.clone();
            engine.register_fn("smooth", move |current: f64, alpha: f64| -> f64 {
                let prev = ctx.read().map(|c| c.prev_output).unwrap_or(f64::NAN);
                ewma(current, prev, alpha)
            });
        }

        engine.register_fn("lowpass", first_order_lowpass);
        {
            let ctx = context.clone();
            engine.register_fn("lowpass", move |current: f64, cutoff_hz: f64| -> f64 {
                let (prev, dt) = ctx
                    .read()
                    .map(|c| (c.prev_output, c.dt_secs))
                    .unwrap_or((f64::NAN, 0.0));
                first_order_lowpass(current, prev, cutoff_hz, dt)
            });
        }

        engine.register_fn("rate_limit", limit_rate);
        {
            let ctx = context;
            engine.register_fn("rate_limit", move |current: f64, max_rate: f64| -> f64 {
                let (prev, dt) = ctx
                    .read()
                    .map(|c| (c.prev_output, c.dt_secs))
                    .unwrap_or((f64::NAN, 0.0));
                limit_rate(current, prev, max_rate, dt)
            });
        }

        engine.register_fn("deadband", |value: f64, center: f64, width: f64| -> f64 {
            if (value - center).abs() < width / 2.0 {
                center
            } else {
                value
            }
        });

        engine.register_fn("round_to", |value: f64, step: f64| -> f64 {
            if step > 0.0 {
                (value / step).round() * step
            } else {
                value
            }
        });

        // Math
        engine.register_fn("abs", |x: f64| x.abs());
        engine.register_fn("sqrt", |x: f64| x.sqrt());
        engine.register_fn("pow", |x: f64, y: f64| x.powf(y));
        engine.register_fn("exp", |x: f64| x.exp());
        engine.register_fn("ln", |x: f64| x.ln());
        engine.register_fn("log10", |x: f64| x.log10());
        engine.register_fn("sin", |x: f64| x.sin());
        engine.register_fn("cos", |x: f64| x.cos());
        engine.register_fn("floor", |x: f64| x.floor());
        engine.register_fn("ceil", |x: f64| x.ceil());
        engine.register_fn("round", |x: f64| x.round());
        engine.register_fn("clamp", |x: f64, min: f64, max: f64| x.clamp(min, max));
        engine.register_fn("min", |a: f64, b: f64| a.min(b));
        engine.register_fn("max", |a: f64, b: f64| a.max(b));
        engine.register_fn("is_nan", |x: f64| x.is_nan());
        engine.register_fn("is_finite", |x: f64| x.is_finite());
        engine.register_fn("pi", || std::f64::consts::PI);
    }

    /// Compile a script and cache it
    pub fn compile(&self, name: &str, source: &str) -> Result<CompiledFilter> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| FreqMeterError::Script(format!("Failed to acquire cache lock: {}", e)))?;

        cache.get_or_compile(&self.engine, name, source)
    }

    /// Run a compiled filter on one sample
    ///
    /// Scripts defining `fn filter(value)` have it called; other scripts are
    /// evaluated as an expression with `value` in scope.
    pub fn execute(
        &self,
        filter: &CompiledFilter,
        sample: f64,
        ctx: ExecutionContext,
    ) -> Result<f64> {
        {
            let mut context = self.context.write().map_err(|e| {
                FreqMeterError::Script(format!("Failed to acquire context lock: {}", e))
            })?;
            *context = ctx;
        }

        let mut scope = Scope::new();
        scope.push("value", sample);
        scope.push("raw", sample);

        let result = if filter.has_entry_fn {
            self.engine
                .call_fn::<Dynamic>(&mut scope, &filter.ast, ENTRY_FN, (sample,))
        } else {
            self.engine.eval_ast_with_scope::<Dynamic>(&mut scope, &filter.ast)
        };

        let value = result.with_context(|| format!("Filter '{}' failed", filter.name))?;
        if let Ok(f) = value.as_float() {
            Ok(f)
        } else if let Ok(i) = value.as_int() {
            Ok(i as f64)
        } else {
            Err(FreqMeterError::Script(format!(
                "Script must return a number, got {}",
                value.type_name()
            )))
        }
    }

    /// Compile and run a script once, without history
    #[cfg(test)]
    pub fn eval(&self, source: &str, sample: f64) -> Result<f64> {
        let filter = self.compile("inline", source)?;
        self.execute(&filter, sample, ExecutionContext::default())
    }

    /// Compile and run a script once with the given context
    #[cfg(test)]
    pub fn eval_with_context(
        &self,
        source: &str,
        sample: f64,
        ctx: ExecutionContext,
    ) -> Result<f64> {
        let filter = self.compile("inline", source)?;
        self.execute(&filter, sample, ctx)
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("cache_size", &self.cache.read().map(|c| c.len()).ok())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_filter() {
        let engine = ScriptEngine::new();
        assert_eq!(engine.eval("value * 2.0", 5.0).unwrap(), 10.0);
        assert_eq!(engine.eval("raw + 1.0", 5.0).unwrap(), 6.0);
    }

    #[test]
    fn test_entry_function_filter() {
        let engine = ScriptEngine::new();
        let script = r#"
fn filter(value) {
    if value > 1000.0 { 1000.0 } else { value }
}
"#;
        assert_eq!(engine.eval(script, 2500.0).unwrap(), 1000.0);
        assert_eq!(engine.eval(script, 20.0).unwrap(), 20.0);
    }

    #[test]
    fn test_integer_result_is_accepted() {
        let engine = ScriptEngine::new();
        assert_eq!(engine.eval("42", 0.0).unwrap(), 42.0);
    }

    #[test]
    fn test_non_numeric_result_is_error() {
        let engine = ScriptEngine::new();
        let err = engine.eval("\"text\"", 1.0).unwrap_err();
        assert!(err.to_string().contains("must return a number"));
    }

    #[test]
    fn test_runtime_error_names_the_filter() {
        let engine = ScriptEngine::new();
        let filter = engine.compile("glitchy", "undefined_fn(value)").unwrap();
        let err = engine
            .execute(&filter, 1.0, ExecutionContext::default())
            .unwrap_err();
        assert!(matches!(err, FreqMeterError::WithContext { .. }));
        assert!(err.to_string().starts_with("Filter 'glitchy' failed: Script error:"));
    }

    #[test]
    fn test_compile_rejects_syntax_errors() {
        let engine = ScriptEngine::new();
        assert!(engine.compile("ok", "value * 2.0").is_ok());
        assert!(engine.compile("bad", "value * ").is_err());
    }

    #[test]
    fn test_caching() {
        let engine = ScriptEngine::new();
        engine.compile("a", "value").unwrap();
        engine.compile("a", "value").unwrap();
        assert_eq!(engine.cache.read().unwrap().len(), 1);
        engine.compile("b", "value").unwrap();
        assert_eq!(engine.cache.read().unwrap().len(), 2);
    }

    #[test]
    fn test_shared_cache_between_engines() {
        let cache = Arc::new(RwLock::new(ScriptCache::new()));
        let first = ScriptEngine::with_cache(cache.clone());
        let second = ScriptEngine::with_cache(cache.clone());
        first.compile("smooth", "smooth(value, 0.5)").unwrap();
        let compiled = second.compile("smooth", "smooth(value, 0.5)").unwrap();
        assert_eq!(compiled.name(), "smooth");
        assert_eq!(cache.read().unwrap().len(), 1);
    }

    #[test]
    fn test_smooth_uses_previous_output() {
        let engine = ScriptEngine::new();
        let ctx = ExecutionContext::new(1.0, 0.1, 20.0, 10.0);
        let result = engine
            .eval_with_context("smooth(value, 0.5)", 20.0, ctx)
            .unwrap();
        assert!((result - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_smooth_first_sample_passes_through() {
        let engine = ScriptEngine::new();
        let ctx = ExecutionContext::first_sample(0.0);
        let result = engine
            .eval_with_context("smooth(value, 0.9)", 440.0, ctx)
            .unwrap();
        assert_eq!(result, 440.0);
    }

    #[test]
    fn test_lowpass_between_prev_and_current() {
        let engine = ScriptEngine::new();
        let ctx = ExecutionContext::new(1.0, 0.01, 10.0, 10.0);
        let result = engine
            .eval_with_context("lowpass(value, 10.0)", 20.0, ctx)
            .unwrap();
        assert!(result > 10.0 && result < 20.0);
    }

    #[test]
    fn test_rate_limit() {
        let engine = ScriptEngine::new();
        let ctx = ExecutionContext::new(1.0, 0.1, 10.0, 10.0);
        let result = engine
            .eval_with_context("rate_limit(value, 50.0)", 20.0, ctx)
            .unwrap();
        assert!((result - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_deadband_and_round_to() {
        let engine = ScriptEngine::new();
        assert_eq!(engine.eval("deadband(value, 50.0, 2.0)", 50.5).unwrap(), 50.0);
        assert_eq!(engine.eval("deadband(value, 50.0, 2.0)", 55.0).unwrap(), 55.0);
        assert_eq!(engine.eval("round_to(value, 10.0)", 1234.0).unwrap(), 1230.0);
    }

    #[test]
    fn test_context_accessors() {
        let engine = ScriptEngine::new();
        let ctx = ExecutionContext::new(2.5, 0.25, 5.0, 7.0);
        assert_eq!(engine.eval_with_context("time()", 0.0, ctx.clone()).unwrap(), 2.5);
        assert_eq!(engine.eval_with_context("dt()", 0.0, ctx.clone()).unwrap(), 0.25);
        assert_eq!(engine.eval_with_context("prev()", 0.0, ctx.clone()).unwrap(), 7.0);
        assert_eq!(engine.eval_with_context("prev_raw()", 0.0, ctx).unwrap(), 5.0);
    }
}
