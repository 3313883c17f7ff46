use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

use crate::core::domain::{Diagnostic, DiagnosticCollector};
use crate::core::file::{FileKind, VirtualFile};
use crate::core::file_manager::FileManager;
use crate::core::traits::toolchain::{Toolchain, ToolchainError};

/// Toolchain that "compiles" by emitting preconfigured classes.
#[derive(Debug, Clone)]
pub struct ToolchainStub {
    success: bool,
    delay: Duration,
    classes: Vec<(String, Vec<u8>)>,
    diagnostics: Vec<Diagnostic>,
    rendezvous: Option<Arc<Barrier>>,
    calls: Arc<AtomicUsize>,
    sources: Arc<Mutex<Vec<String>>>,
}

impl ToolchainStub {
    pub fn new(success: bool, delay: Duration) -> Self {
        Self {
            success,
            delay,
            classes: Vec::new(),
            diagnostics: Vec::new(),
            rendezvous: None,
            calls: Arc::new(AtomicUsize::new(0)),
            sources: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_class(mut self, name: &str, bytes: &[u8]) -> Self {
        self.classes.push((name.to_string(), bytes.to_vec()));
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    /// Waits on `barrier` after the outputs are registered and before returning.
    pub fn with_rendezvous(mut self, barrier: Arc<Barrier>) -> Self {
        self.rendezvous = Some(barrier);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Source texts received so far, in call order.
    pub fn sources(&self) -> Vec<String> {
        self.sources
            .lock()
            .map(|sources| sources.clone())
            .unwrap_or_default()
    }
}

impl Toolchain for ToolchainStub {
    #[tracing::instrument(skip_all)]
    fn compile(
        &self,
        units: &[Arc<VirtualFile>],
        file_manager: &(dyn FileManager + 'static),
        diagnostics: &mut DiagnosticCollector,
    ) -> Result<bool, ToolchainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for unit in units {
            let text = unit.char_content()?;
            tracing::debug!("Start compilation: unit={}", unit.name());
            if let Ok(mut sources) = self.sources.lock() {
                sources.push(text.to_string());
            }
        }

        for (name, bytes) in &self.classes {
            let file = file_manager.output_file(name, FileKind::Class)?;
            file.open_output_stream()?.write_all(bytes)?;
        }
        if let Some(barrier) = &self.rendezvous {
            barrier.wait();
        }
        std::thread::sleep(self.delay);

        for diagnostic in &self.diagnostics {
            diagnostics.report(diagnostic.clone());
        }
        tracing::debug!("Compilation result: {}", self.success);

        Ok(self.success)
    }
}
