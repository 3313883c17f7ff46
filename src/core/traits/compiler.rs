use crate::core::domain::Artifact;
use crate::core::traits::toolchain::ToolchainError;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("no class declaration found in source")]
    NoClassName,
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),
    #[error("compilation failed:\n{msg}")]
    CompilationFailed { msg: String },
    #[error("{msg}")]
    MissingOutput { msg: String },
    #[error("internal error: {msg}")]
    Internal { msg: String },
}

/// Async entry point used by the code-runner service.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Compiler: std::fmt::Debug + Send + Sync {
    async fn compile(&self, source: &str) -> Result<Artifact, CompileError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn test_compiler_behind_trait_object() {
        let mut compiler = MockCompiler::new();
        compiler
            .expect_compile()
            .withf(|source| source.contains("class Foo"))
            .times(1)
            .returning(|_| {
                Ok(Artifact {
                    id: Uuid::new_v4(),
                    class_name: "Foo".to_string(),
                    bytecode: vec![0xCA, 0xFE, 0xBA, 0xBE],
                    compiled_at: chrono::Utc::now(),
                })
            });
        compiler
            .expect_compile()
            .withf(|source| !source.contains("class"))
            .times(1)
            .returning(|_| Err(CompileError::NoClassName));
        let compiler: Arc<dyn Compiler> = Arc::new(compiler);

        let artifact = compiler.compile("class Foo {}").await.unwrap();
        let error = compiler.compile("int x;").await.unwrap_err();

        assert_eq!(artifact.class_name, "Foo");
        assert_eq!(error.to_string(), "no class declaration found in source");
    }

    #[test]
    fn test_compilation_failed_message() {
        let error = CompileError::CompilationFailed {
            msg: "Foo.java:1:40: error: ';' expected".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "compilation failed:\nFoo.java:1:40: error: ';' expected"
        );
    }
}
