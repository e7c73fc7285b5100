use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::expressions::SourceSpan;

/// Result type alias for operations that can fail with a reduction error.
pub type ReduceResult<T> = Result<T, BarbExecutionError>;

/// Classification of reduction failures.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>`
/// implementations. The string representation is kebab-case (e.g.
/// `UnboundName` -> "unbound-name"), which is the form quoted in error messages
/// and serialized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// A name was promised via a pending binding but never supplied before a
    /// final reduction.
    UnboundName,
    /// A name has no binding at all in a final reduction.
    UnknownName,
    /// A generator bound did not resolve to a value in a final reduction.
    GeneratorArgUnresolved,
    /// An operand of `and` resolved to something other than a boolean or null.
    AndLhsNotBool,
    /// An operand of `or` resolved to something other than a boolean or null.
    OrLhsNotBool,
    /// A nested-collection invocation (`..name`) was applied to a static root.
    StaticDepthUnsupported,
    /// A nested-collection invocation resolved to a mix of properties and
    /// methods across elements.
    MixedPropertyMethodNestedInvoke,
    /// A static member lookup matched more than one candidate across the
    /// configured namespaces.
    AmbiguousStaticResolution,
    /// A host call (method, property, constructor, indexer, or operator
    /// function) reported a failure.
    HostInvocationFailed,
    /// An index expression was malformed or out of range for the target.
    BadTupleIndex,
    /// Generator bounds were non-numeric, of mixed numeric kinds, or had a
    /// zero step.
    BadGeneratorTypes,
    /// Reduction finished but the residual is not a single extractable value.
    UnexpectedResult,
    /// The walker hit a node combination it has no rule for in a final
    /// reduction with `fail_on_catch_all` enabled.
    UnexpectedCase,
}

/// Error raised by the reducer.
///
/// `offset`/`length` locate the offending node(s) in the original source text.
/// `trace` is a diagnostic dump of the local reduction context (the rendered
/// node neighborhood at the point of failure); it is empty when no context was
/// available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarbExecutionError {
    pub kind: ErrorKind,
    pub message: String,
    pub trace: String,
    pub offset: u32,
    pub length: u32,
}

impl BarbExecutionError {
    /// Creates an error located at `span`, with no context trace.
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            kind,
            message: message.into(),
            trace: String::new(),
            offset: span.offset,
            length: span.length,
        }
    }

    /// Wraps a host-reported failure, locating it at the given span.
    pub(crate) fn host_failure(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(ErrorKind::HostInvocationFailed, message, span)
    }

    /// Attaches a context trace if one is not already present.
    ///
    /// Errors keep the narrowest trace available, so an inner failure that
    /// already captured its neighborhood is not overwritten by outer walkers.
    #[must_use]
    pub(crate) fn with_trace(mut self, trace: impl Into<String>) -> Self {
        if self.trace.is_empty() {
            self.trace = trace.into();
        }
        self
    }

    /// The source span the error points at.
    #[must_use]
    pub fn span(&self) -> SourceSpan {
        SourceSpan::new(self.offset, self.length)
    }
}

impl fmt::Display for BarbExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at {}..{}",
            self.kind,
            self.message,
            self.offset,
            self.offset + self.length
        )?;
        if !self.trace.is_empty() {
            write!(f, "\n  context: {}", self.trace)?;
        }
        Ok(())
    }
}

impl std::error::Error for BarbExecutionError {}
