//! # Counting Compiler
//!
//! Wraps any [`CompilerAdapter`] and records every invocation. Used to
//! observe that the artifact cache compiles each unit at most once.

use crate::ports::outbound::{CompileDiagnostic, CompilerAdapter, CompilerOutput};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Call-counting compiler decorator.
#[derive(Debug, Default)]
pub struct CountingCompiler<C> {
    inner: C,
    calls: AtomicUsize,
    sources: Mutex<Vec<String>>,
}

impl<C: CompilerAdapter> CountingCompiler<C> {
    /// Wraps `inner`.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            sources: Mutex::new(Vec::new()),
        }
    }

    /// Total compile calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls whose source contained `needle`.
    pub fn calls_for(&self, needle: &str) -> usize {
        self.sources
            .lock()
            .iter()
            .filter(|source| source.contains(needle))
            .count()
    }

    /// Sources compiled so far, in call order.
    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().clone()
    }

    /// Forgets recorded calls.
    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
        self.sources.lock().clear();
    }

    /// The wrapped compiler.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: CompilerAdapter> CompilerAdapter for CountingCompiler<C> {
    fn compile(&self, source: &str) -> Result<CompilerOutput, CompileDiagnostic> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sources.lock().push(source.to_string());
        self.inner.compile(source)
    }
}
