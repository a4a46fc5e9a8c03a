//! Diagnostic channel for recoverable registration problems.
//!
//! Authoring mistakes, such as registering an object that was never meant to be
//! spawned over the network, are reported here instead of failing the caller.
//! Messages are free text and carry no structured error codes.

use crate::object::{ObjectHandle, ObjectId};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

/// A single diagnostic message about an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub object_id: Option<ObjectId>,
    pub object_name: String,
    pub reason: String,
}

impl Diagnostic {
    pub fn error(object: &ObjectHandle, reason: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            object_id: Some(object.id()),
            object_name: object.name(),
            reason: reason.into(),
        }
    }

    pub fn warning(object: &ObjectHandle, reason: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            object_id: Some(object.id()),
            object_name: object.name(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.object_id {
            Some(id) => write!(f, "{} ({}): {}", self.object_name, id, self.reason),
            None => write!(f, "{}: {}", self.object_name, self.reason),
        }
    }
}

/// Receiver for diagnostics emitted by the registry.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => error!(target: "prefab_registry", "❌ {}", diagnostic),
            Severity::Warning => warn!(target: "prefab_registry", "⚠️ {}", diagnostic),
        }
    }
}

/// Logs like [`TracingSink`] and keeps every diagnostic for later inspection.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns everything collected so far.
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        TracingSink.report(diagnostic.clone());
        self.diagnostics.lock().push(diagnostic);
    }
}
