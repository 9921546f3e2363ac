//! The option set accepted by the driver, with a chainable builder.
//!
//! Defaults: well-formedness checking and whitespace tracking on, call-stack
//! recording and tracing off. The builder keeps `trace` and `metrics`
//! consistent: enabling tracing without a sink installs a fresh one, and
//! installing a sink enables tracing. When builder calls conflict, the last
//! call wins.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::metrics::ParseMetrics;
use crate::value::Value;

/// A shared sink receiving per-parser metrics; reuse one across parses to
/// aggregate measurements.
pub type MetricsSink = Arc<Mutex<ParseMetrics>>;

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Maintain the live stack of parser invocations and snapshot it whenever
    /// the furthest error position advances.
    pub record_call_stack: bool,
    /// Run the static well-formedness analysis before parsing and refuse to
    /// parse an ill-formed grammar. Disable in production to avoid the
    /// traversal overhead.
    pub well_formedness_check: bool,
    /// Collect per-parser timing and invocation counts into `metrics`.
    /// Slows the parse down considerably.
    pub trace: bool,
    /// Record the spans of whitespace consumed by `word`/`token` wrappers so
    /// outer layers can produce tighter AST spans.
    pub track_whitespace: bool,
    /// Receives trace measurements; non-None exactly when `trace` is set.
    pub metrics: Option<MetricsSink>,
    custom: HashMap<String, Value>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self {
            record_call_stack: false,
            well_formedness_check: true,
            trace: false,
            track_whitespace: true,
            metrics: None,
            custom: HashMap::new(),
        }
    }

    pub fn builder() -> ParseOptionsBuilder {
        ParseOptionsBuilder {
            options: Self::new(),
        }
    }

    /// A user-defined option by key.
    pub fn custom(&self, key: &str) -> Option<&Value> {
        self.custom.get(key)
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// See [`ParseOptions`].
#[derive(Debug)]
pub struct ParseOptionsBuilder {
    options: ParseOptions,
}

impl ParseOptionsBuilder {
    pub fn record_call_stack(mut self, enabled: bool) -> Self {
        self.options.record_call_stack = enabled;
        self
    }

    pub fn well_formedness_check(mut self, enabled: bool) -> Self {
        self.options.well_formedness_check = enabled;
        self
    }

    pub fn track_whitespace(mut self, enabled: bool) -> Self {
        self.options.track_whitespace = enabled;
        self
    }

    /// Enables or disables tracing; may affect the metrics sink, see
    /// [`ParseOptions`].
    pub fn trace(mut self, enabled: bool) -> Self {
        self.options.trace = enabled;
        if !enabled {
            self.options.metrics = None;
        } else if self.options.metrics.is_none() {
            self.options.metrics = Some(Arc::new(Mutex::new(ParseMetrics::new())));
        }
        self
    }

    /// Installs a metrics sink and sets `trace` accordingly.
    pub fn metrics(mut self, sink: Option<MetricsSink>) -> Self {
        self.options.trace = sink.is_some();
        self.options.metrics = sink;
        self
    }

    /// Defines a user option under the given key.
    pub fn custom(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.custom.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> ParseOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_configuration() {
        let options = ParseOptions::new();
        assert!(!options.trace);
        assert!(!options.record_call_stack);
        assert!(options.well_formedness_check);
        assert!(options.track_whitespace);
        assert!(options.metrics.is_none());
    }

    #[test]
    fn trace_and_metrics_stay_consistent() {
        let options = ParseOptions::builder().trace(true).build();
        assert!(options.metrics.is_some());

        let options = ParseOptions::builder().trace(true).trace(false).build();
        assert!(options.metrics.is_none());

        let sink: MetricsSink = Arc::new(Mutex::new(ParseMetrics::new()));
        let options = ParseOptions::builder().metrics(Some(sink)).build();
        assert!(options.trace);
    }

    #[test]
    fn custom_options_round_trip() {
        let options = ParseOptions::builder().custom("max_depth", 40.0).build();
        assert_eq!(options.custom("max_depth"), Some(&Value::Number(40.0)));
        assert_eq!(options.custom("missing"), None);
    }
}
