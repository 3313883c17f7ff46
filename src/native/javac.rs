use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::constants::{CLASS_EXTENSION, DEFAULT_JAVAC_PATH, JAVAC_PATH_ENV};
use crate::core::domain::DiagnosticCollector;
use crate::core::file::{FileKind, VirtualFile};
use crate::core::file_manager::FileManager;
use crate::core::traits::toolchain::{Toolchain, ToolchainError};
use crate::native::diagnostics::collect_javac_output;

/// JVM options that pin javac's messages to English and UTF-8, so the
/// diagnostic parser sees the same text on every host.
const JVM_LOCALE_FLAGS: [&str; 4] = [
    "-J-Duser.language=en",
    "-J-Duser.country=US",
    "-J-Dstdout.encoding=UTF-8",
    "-J-Dstderr.encoding=UTF-8",
];

/// Toolchain backed by a JDK `javac` binary.
///
/// javac only reads and writes real files, so every call works in a
/// private temporary directory that is removed before returning. Callers
/// only ever see virtual files.
#[derive(Clone, Debug)]
pub struct JavacToolchain {
    javac_path: PathBuf,
}

impl JavacToolchain {
    pub fn new<T>(javac_path: T) -> Self
    where
        T: AsRef<Path>,
    {
        JavacToolchain {
            javac_path: javac_path.as_ref().into(),
        }
    }

    /// Uses `JAVAC_PATH` when set, otherwise `javac` from `PATH`.
    pub fn from_env() -> Self {
        let path = std::env::var(JAVAC_PATH_ENV).unwrap_or_else(|_| DEFAULT_JAVAC_PATH.to_string());
        Self::new(path)
    }

    pub fn javac_path(&self) -> &Path {
        &self.javac_path
    }

    fn command(&self, out_dir: &Path, class_path: OsString, sources: &[PathBuf]) -> Command {
        let mut cmd = Command::new(&self.javac_path);
        cmd.args(JVM_LOCALE_FLAGS)
            .arg("-encoding")
            .arg("UTF-8")
            .arg("-d")
            .arg(out_dir)
            .arg("-classpath")
            .arg(class_path)
            .args(sources)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

/// `deps_dir` first, so in-memory classes shadow the configured entries.
fn class_path_arg(deps_dir: &Path, entries: &[PathBuf]) -> io::Result<OsString> {
    std::env::join_paths(std::iter::once(deps_dir).chain(entries.iter().map(PathBuf::as_path)))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

fn relative_path(binary_name: &str, kind: FileKind) -> PathBuf {
    PathBuf::from(format!(
        "{}{}",
        binary_name.replace('.', "/"),
        kind.extension()
    ))
}

fn write_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

impl Toolchain for JavacToolchain {
    #[tracing::instrument(skip_all, fields(javac = %self.javac_path.display()))]
    fn compile(
        &self,
        units: &[Arc<VirtualFile>],
        file_manager: &(dyn FileManager + 'static),
        diagnostics: &mut DiagnosticCollector,
    ) -> Result<bool, ToolchainError> {
        let workdir = tempfile::Builder::new()
            .prefix("coderunner-javac")
            .tempdir()?;
        let src_dir = workdir.path().join("src");
        let out_dir = workdir.path().join("out");
        let deps_dir = workdir.path().join("deps");
        fs::create_dir_all(&src_dir)?;
        fs::create_dir_all(&out_dir)?;
        fs::create_dir_all(&deps_dir)?;

        let mut source_paths = Vec::with_capacity(units.len());
        for unit in units {
            let path = src_dir.join(relative_path(unit.name(), FileKind::Source));
            write_file(&path, unit.char_content()?.as_bytes())?;
            source_paths.push(path);
        }

        // In-memory classes are materialised; class-path entries are passed through.
        for (name, file) in file_manager.list(FileKind::Class)? {
            write_file(
                &deps_dir.join(relative_path(&name, FileKind::Class)),
                &file.compiled_bytes()?,
            )?;
        }
        let class_path = class_path_arg(&deps_dir, &file_manager.class_path())?;
        let mut cmd = self.command(&out_dir, class_path, &source_paths);

        tracing::debug!("Start javac: {:?}", cmd);
        let out = cmd.output().map_err(|source| ToolchainError::Spawn {
            program: self.javac_path.display().to_string(),
            source,
        })?;
        tracing::debug!("javac exited with {}", out.status);

        let mut stderr = String::from_utf8_lossy(&out.stderr).to_string();
        stderr.push_str(&String::from_utf8_lossy(&out.stdout));
        for diagnostic in collect_javac_output(&stderr, &src_dir, out.status.success()) {
            diagnostics.report(diagnostic);
        }

        if !out.status.success() {
            return Ok(false);
        }

        for entry in WalkDir::new(&out_dir) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(binary_name) = entry
                .path()
                .strip_prefix(&out_dir)
                .ok()
                .and_then(Path::to_str)
                .and_then(|relative| relative.strip_suffix(CLASS_EXTENSION))
                .map(|stem| stem.replace(['/', '\\'], "."))
            else {
                continue;
            };

            let bytes = fs::read(entry.path())?;
            let file = file_manager.output_file(&binary_name, FileKind::Class)?;
            file.open_output_stream()?.write_all(&bytes)?;
            tracing::debug!("Emitted {} ({} bytes)", binary_name, bytes.len());
        }

        Ok(true)
    }
}
