use serde::{Deserialize, Serialize};

use crate::source::{DebugInfo, SourceMap};

/// Category of a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompileErrorKind {
    /// Malformed YAML, malformed expression, or an invalid step shape.
    SyntaxError,
    /// An expression or target names something the script never declares.
    UnknownReferenceError,
    /// An operator or condition is used with an incompatible type.
    TypeMismatchError,
}

impl std::fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CompileErrorKind::SyntaxError => "syntax error",
            CompileErrorKind::UnknownReferenceError => "unknown reference",
            CompileErrorKind::TypeMismatchError => "type mismatch",
        };
        f.write_str(name)
    }
}

/// A compile error. No partial model is produced when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} at line {}, column {}: {message}", .debug_info.start.line, .debug_info.start.column)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    pub debug_info: DebugInfo,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, message: impl Into<String>, debug_info: DebugInfo) -> Self {
        CompileError {
            kind,
            message: message.into(),
            debug_info,
        }
    }

    pub fn syntax(message: impl Into<String>, debug_info: DebugInfo) -> Self {
        CompileError::new(CompileErrorKind::SyntaxError, message, debug_info)
    }

    pub fn unknown_reference(message: impl Into<String>, debug_info: DebugInfo) -> Self {
        CompileError::new(CompileErrorKind::UnknownReferenceError, message, debug_info)
    }

    pub fn type_mismatch(message: impl Into<String>, debug_info: DebugInfo) -> Self {
        CompileError::new(CompileErrorKind::TypeMismatchError, message, debug_info)
    }

    /// Serialize to the parse-result JSON shape consumed by editors.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "isError": true,
            "kind": self.kind,
            "message": self.message,
            "debugInfo": self.debug_info,
        })
    }
}

/// Byte range inside a single expression's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn join(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// An error found while lexing, parsing or type-checking one expression.
/// Positions are relative to the expression text until [`ExprError::locate`]
/// places them in the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprError {
    pub kind: CompileErrorKind,
    pub message: String,
    pub span: Span,
}

impl ExprError {
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        ExprError {
            kind: CompileErrorKind::SyntaxError,
            message: message.into(),
            span,
        }
    }

    pub fn unknown_reference(message: impl Into<String>, span: Span) -> Self {
        ExprError {
            kind: CompileErrorKind::UnknownReferenceError,
            message: message.into(),
            span,
        }
    }

    pub fn type_mismatch(message: impl Into<String>, span: Span) -> Self {
        ExprError {
            kind: CompileErrorKind::TypeMismatchError,
            message: message.into(),
            span,
        }
    }

    /// Convert to a [`CompileError`], given the script offset where the
    /// expression text starts. `context` names the step and field.
    pub fn locate(self, map: &SourceMap<'_>, expr_offset: usize, context: &str) -> CompileError {
        let len = self.span.end.saturating_sub(self.span.start);
        CompileError::new(
            self.kind,
            format!("{}: {}", context, self.message),
            map.span(expr_offset + self.span.start, len),
        )
    }
}
