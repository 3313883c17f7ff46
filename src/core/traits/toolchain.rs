use std::io;
use std::sync::Arc;

use crate::core::domain::DiagnosticCollector;
use crate::core::file::{FileError, VirtualFile};
use crate::core::file_manager::FileManager;

#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("toolchain I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    File(#[from] FileError),
}

/// External compiler backend.
///
/// Reads its inputs through `file_manager`, streams every produced class
/// into `file_manager.output_file(..)` and reports problems into
/// `diagnostics`. Returns whether the compilation succeeded; compiler
/// errors are not an `Err`, only failures to run the compiler at all are.
#[mockall::automock]
pub trait Toolchain: std::fmt::Debug + Send + Sync {
    fn compile(
        &self,
        units: &[Arc<VirtualFile>],
        file_manager: &(dyn FileManager + 'static),
        diagnostics: &mut DiagnosticCollector,
    ) -> Result<bool, ToolchainError>;
}
