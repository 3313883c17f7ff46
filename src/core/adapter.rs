use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::core::domain::{Artifact, CompileOutcome, DiagnosticCollector, SourceUnit};
use crate::core::file::VirtualFile;
use crate::core::file_manager::{MemoryFileManager, StandardFileManager};
use crate::core::store::FileStore;
use crate::core::traits::compiler::{CompileError, Compiler};
use crate::core::traits::toolchain::{Toolchain, ToolchainError};
use crate::native::javac::JavacToolchain;

/// Compiles the source of a single class into class-file bytes held in memory.
///
/// By default every call gets its own [`FileStore`] which is dropped once the
/// bytes are extracted. [`SourceCompiler::with_shared_store`] keeps outputs
/// in a store that outlives calls, so later compilations can reference
/// classes compiled earlier; [`SourceCompiler::with_global_store`] uses the
/// process-wide [`FileStore::global`].
#[derive(Clone, Debug)]
pub struct SourceCompiler {
    toolchain: Arc<dyn Toolchain>,
    delegate: StandardFileManager,
    store: Option<Arc<FileStore>>,
}

impl SourceCompiler {
    pub fn new(toolchain: Arc<dyn Toolchain>) -> Self {
        SourceCompiler {
            toolchain,
            delegate: StandardFileManager::default(),
            store: None,
        }
    }

    pub fn with_shared_store(toolchain: Arc<dyn Toolchain>, store: Arc<FileStore>) -> Self {
        SourceCompiler {
            toolchain,
            delegate: StandardFileManager::default(),
            store: Some(store),
        }
    }

    /// Outputs land in [`FileStore::global`] and stay visible to every
    /// compiler built this way for the life of the process.
    pub fn with_global_store(toolchain: Arc<dyn Toolchain>) -> Self {
        Self::with_shared_store(toolchain, FileStore::global())
    }

    /// javac from the environment, per-call store.
    pub fn from_env() -> Self {
        Self::new(Arc::new(JavacToolchain::from_env()))
    }

    /// Directories and jars searched when an input is neither a source unit
    /// nor in the store.
    pub fn with_class_path<I, P>(mut self, class_path: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.delegate = StandardFileManager::new(class_path);
        self
    }

    pub fn shared_store(&self) -> Option<&Arc<FileStore>> {
        self.store.as_ref()
    }

    /// Compiles `source`, reporting compiler diagnostics into `diagnostics`.
    ///
    /// Fails with [`CompileError::NoClassName`] before the toolchain runs when
    /// no class declaration is found. Compiler errors never surface as `Err`;
    /// they are reflected in the returned outcome and the diagnostics.
    #[tracing::instrument(skip_all)]
    pub fn compile(
        &self,
        source: &str,
        diagnostics: &mut DiagnosticCollector,
    ) -> Result<CompileOutcome, CompileError> {
        let unit = SourceUnit::parse(source)?;
        let store = match &self.store {
            Some(store) => store.clone(),
            None => Arc::new(FileStore::new()),
        };
        let file_manager = MemoryFileManager::new(self.delegate.clone(), store.clone());
        let source_file = Arc::new(VirtualFile::source(&unit.class_name, &unit.text));

        tracing::debug!(
            "Start compiling {} (session {})",
            unit.class_name,
            file_manager.session()
        );
        let succeeded = self
            .toolchain
            .compile(&[source_file], &file_manager, diagnostics)
            .inspect_err(|e| tracing::error!("Toolchain failed for {}: {}", unit.class_name, e))?;
        tracing::debug!(
            "Toolchain finished: success={}, diagnostics={}",
            succeeded,
            diagnostics.len()
        );

        if !succeeded {
            return Ok(CompileOutcome::CompileFailed {
                errors: diagnostics.error_count(),
            });
        }

        let registered = file_manager.registered();
        if !registered.contains(&unit.class_name) {
            tracing::warn!(
                "No output named {}, produced {:?}",
                unit.class_name,
                registered
            );
            return Ok(CompileOutcome::NameMismatch {
                expected: unit.class_name,
                registered,
            });
        }

        match store.get(&unit.class_name) {
            Some(file) if file.session() == Some(file_manager.session()) => {
                let bytecode = file.compiled_bytes().map_err(ToolchainError::from)?;
                Ok(CompileOutcome::Success {
                    class_name: unit.class_name,
                    bytecode,
                })
            }
            _ => {
                tracing::warn!(
                    "Output for {} was replaced by another compilation",
                    unit.class_name
                );
                Ok(CompileOutcome::Overwritten {
                    class_name: unit.class_name,
                })
            }
        }
    }
}

/// Compiles `source` with javac from the environment and a store private to this call.
pub fn compile(
    source: &str,
    diagnostics: &mut DiagnosticCollector,
) -> Result<CompileOutcome, CompileError> {
    SourceCompiler::from_env().compile(source, diagnostics)
}

#[async_trait::async_trait]
impl Compiler for SourceCompiler {
    #[tracing::instrument(skip_all)]
    async fn compile(&self, source: &str) -> Result<Artifact, CompileError> {
        let compiler = self.clone();
        let source = source.to_string();

        let (outcome, diagnostics) = tokio::task::spawn_blocking(move || {
            let mut diagnostics = DiagnosticCollector::new();
            SourceCompiler::compile(&compiler, &source, &mut diagnostics)
                .map(|outcome| (outcome, diagnostics))
        })
        .await
        .map_err(|e| CompileError::Internal { msg: e.to_string() })??;
        tracing::debug!("Compilation result: {}", outcome);

        match outcome {
            CompileOutcome::Success {
                class_name,
                bytecode,
            } => Ok(Artifact {
                id: Uuid::new_v4(),
                class_name,
                bytecode,
                compiled_at: chrono::Utc::now(),
            }),
            CompileOutcome::CompileFailed { .. } => Err(CompileError::CompilationFailed {
                msg: diagnostics.render(),
            }),
            other => Err(CompileError::MissingOutput {
                msg: other.to_string(),
            }),
        }
    }
}
