//! Reduction tracing infrastructure.
//!
//! Provides a trait-based tracing system for the reducer with zero-cost
//! abstraction: with [`NoopTracer`] every hook compiles away through
//! monomorphization.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Zero-cost no-op (production default) |
//! | [`StderrTracer`] | Human-readable reduction log to stderr |
//! | [`RecordingTracer`] | Full event recording for inspection in tests and post-mortems |

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::expressions::SourceSpan;

/// Which walker rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum RuleKind {
    /// A trivial one-element grouping was unwrapped.
    Flatten,
    /// An unresolved node was moved to the processed side for later passes.
    Lift,
    /// A `let` binding was reduced and its scope spliced in.
    Binding,
    /// A single-node rewrite.
    Single,
    /// A two-node rewrite.
    Pairwise,
    /// A precedence-aware three-node rewrite.
    Triple,
    /// No rule matched; one node was shifted to the processed side.
    Shift,
}

/// One recorded reduction event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TraceEvent {
    PassStart { final_reduction: bool, nodes: usize },
    Rule { rule: RuleKind, offset: u32, length: u32 },
    HostCall { description: String, offset: u32, length: u32 },
    /// A logical connective decided its result without evaluating the right
    /// operand.
    ShortCircuit { connective: String, offset: u32, length: u32 },
    PassEnd { residual: usize },
}

/// Hook points invoked by the reducer.
///
/// All methods have empty defaults, so implementations override only what
/// they care about.
pub trait ReduceTracer {
    fn on_pass_start(&mut self, final_reduction: bool, nodes: usize) {
        let _ = (final_reduction, nodes);
    }

    fn on_rule(&mut self, rule: RuleKind, span: SourceSpan) {
        let _ = (rule, span);
    }

    fn on_host_call(&mut self, description: &str, span: SourceSpan) {
        let _ = (description, span);
    }

    fn on_short_circuit(&mut self, connective: &str, span: SourceSpan) {
        let _ = (connective, span);
    }

    fn on_pass_end(&mut self, residual: usize) {
        let _ = residual;
    }
}

/// Zero-cost tracer used when no tracing is requested.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl ReduceTracer for NoopTracer {}

/// Logs every event to stderr in a human-readable form.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrTracer;

impl ReduceTracer for StderrTracer {
    fn on_pass_start(&mut self, final_reduction: bool, nodes: usize) {
        let mode = if final_reduction { "final" } else { "non-final" };
        eprintln!("pass start ({mode}), {nodes} node(s)");
    }

    fn on_rule(&mut self, rule: RuleKind, span: SourceSpan) {
        eprintln!("  {rule} at {span:?}");
    }

    fn on_host_call(&mut self, description: &str, span: SourceSpan) {
        eprintln!("  host call {description} at {span:?}");
    }

    fn on_short_circuit(&mut self, connective: &str, span: SourceSpan) {
        eprintln!("  short-circuit {connective} at {span:?}");
    }

    fn on_pass_end(&mut self, residual: usize) {
        eprintln!("pass end, {residual} residual node(s)");
    }
}

/// Records every event for later inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Number of host calls recorded. Useful for asserting that a branch was
    /// never evaluated.
    #[must_use]
    pub fn host_call_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, TraceEvent::HostCall { .. }))
            .count()
    }

    /// Connectives that decided their result without evaluating the right
    /// operand, in order.
    #[must_use]
    pub fn short_circuits(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::ShortCircuit { connective, .. } => Some(connective.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl ReduceTracer for RecordingTracer {
    fn on_pass_start(&mut self, final_reduction: bool, nodes: usize) {
        self.events.push(TraceEvent::PassStart { final_reduction, nodes });
    }

    fn on_rule(&mut self, rule: RuleKind, span: SourceSpan) {
        self.events.push(TraceEvent::Rule {
            rule,
            offset: span.offset,
            length: span.length,
        });
    }

    fn on_host_call(&mut self, description: &str, span: SourceSpan) {
        self.events.push(TraceEvent::HostCall {
            description: description.to_owned(),
            offset: span.offset,
            length: span.length,
        });
    }

    fn on_short_circuit(&mut self, connective: &str, span: SourceSpan) {
        self.events.push(TraceEvent::ShortCircuit {
            connective: connective.to_owned(),
            offset: span.offset,
            length: span.length,
        });
    }

    fn on_pass_end(&mut self, residual: usize) {
        self.events.push(TraceEvent::PassEnd { residual });
    }
}
