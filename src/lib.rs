pub mod constants;
pub mod core;
pub mod native;
pub mod stubs;


pub use crate::core::adapter::{SourceCompiler, compile};
pub use crate::core::domain::{
    Artifact, CompileOutcome, Diagnostic, DiagnosticCollector, Position, Severity, SourceUnit,
};
pub use crate::core::file::{FileError, FileKind, VirtualFile};
pub use crate::core::file_manager::{FileManager, MemoryFileManager, StandardFileManager};
pub use crate::core::store::FileStore;
pub use crate::core::traits::compiler::{CompileError, Compiler};
pub use crate::core::traits::toolchain::{Toolchain, ToolchainError};
pub use crate::native::javac::JavacToolchain;
