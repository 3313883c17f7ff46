use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashSet;
use itertools::Itertools;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::core::file::{FileError, FileKind, VirtualFile};
use crate::core::store::FileStore;

/// File resolution used by a toolchain during one compilation.
#[mockall::automock]
pub trait FileManager: std::fmt::Debug + Send + Sync {
    /// Looks up an existing file for `class_name`; `None` when nothing is known.
    ///
    /// In-process toolchains call this per class. Toolchains that drive a
    /// compiler binary, like `JavacToolchain`, cannot ask per class and
    /// resolve through [`FileManager::list`] and [`FileManager::class_path`]
    /// instead.
    fn input_file(
        &self,
        class_name: &str,
        kind: FileKind,
    ) -> Result<Option<Arc<VirtualFile>>, FileError>;

    /// Location the toolchain streams compiled output for `class_name` into.
    fn output_file(&self, class_name: &str, kind: FileKind) -> Result<Arc<VirtualFile>, FileError>;

    /// Every in-memory file of `kind` this manager holds, keyed by binary name.
    fn list(&self, kind: FileKind) -> Result<Vec<(String, Arc<VirtualFile>)>, FileError>;

    /// Class-path entries (directories or jars) for standard resolution.
    fn class_path(&self) -> Vec<PathBuf>;
}

/// Standard resolution against class-path entries on disk.
///
/// `input_file` and `list` only see loose files under directory entries;
/// jar entries are left to the toolchain through `class_path`. Outputs are
/// handed out detached and never touch the disk.
#[derive(Clone, Debug, Default)]
pub struct StandardFileManager {
    class_path: Vec<PathBuf>,
}

impl StandardFileManager {
    pub fn new<I, P>(class_path: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        StandardFileManager {
            class_path: class_path.into_iter().map(|p| p.as_ref().into()).collect(),
        }
    }

    fn load(class_name: &str, kind: FileKind, path: &Path) -> Result<VirtualFile, FileError> {
        let io_err = |source| FileError::Io {
            name: class_name.to_string(),
            source,
        };
        match kind {
            FileKind::Source => {
                let text = fs::read_to_string(path).map_err(io_err)?;
                Ok(VirtualFile::source(class_name, &text))
            }
            FileKind::Class | FileKind::Other => {
                let bytes = fs::read(path).map_err(io_err)?;
                Ok(VirtualFile::with_bytes(class_name, kind, bytes))
            }
        }
    }
}

impl FileManager for StandardFileManager {
    fn input_file(
        &self,
        class_name: &str,
        kind: FileKind,
    ) -> Result<Option<Arc<VirtualFile>>, FileError> {
        let relative = format!("{}{}", class_name.replace('.', "/"), kind.extension());
        for dir in &self.class_path {
            let path = dir.join(&relative);
            if path.is_file() {
                return Self::load(class_name, kind, &path).map(|file| Some(Arc::new(file)));
            }
        }
        Ok(None)
    }

    fn output_file(&self, class_name: &str, kind: FileKind) -> Result<Arc<VirtualFile>, FileError> {
        Ok(Arc::new(VirtualFile::output(class_name, kind, None)))
    }

    fn list(&self, kind: FileKind) -> Result<Vec<(String, Arc<VirtualFile>)>, FileError> {
        let extension = kind.extension();
        if extension.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let mut found: Vec<(String, Arc<VirtualFile>)> = Vec::new();
        for dir in self.class_path.iter().filter(|entry| entry.is_dir()) {
            for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
                let path = entry.path();
                let Some(relative) = path.strip_prefix(dir).ok().and_then(Path::to_str) else {
                    continue;
                };
                let Some(stem) = relative.strip_suffix(extension) else {
                    continue;
                };
                if !entry.file_type().is_file() {
                    continue;
                }

                let class_name = stem.replace(['/', '\\'], ".");
                if !seen.insert(class_name.clone()) {
                    continue;
                }
                let file = Self::load(&class_name, kind, path)?;
                found.push((class_name, Arc::new(file)));
            }
        }
        Ok(found)
    }

    fn class_path(&self) -> Vec<PathBuf> {
        self.class_path.clone()
    }
}

/// File manager that keeps compiled classes in a [`FileStore`].
///
/// Output requests register a fresh file stamped with this manager's
/// session id; input requests prefer the store and fall back to the
/// delegate. Listing covers the store only, the delegate's entries reach
/// the toolchain through `class_path`.
#[derive(Debug)]
pub struct MemoryFileManager<M: FileManager = StandardFileManager> {
    delegate: M,
    store: Arc<FileStore>,
    session: Uuid,
    registered: DashSet<String>,
}

impl<M: FileManager> MemoryFileManager<M> {
    pub fn new(delegate: M, store: Arc<FileStore>) -> Self {
        MemoryFileManager {
            delegate,
            store,
            session: Uuid::new_v4(),
            registered: DashSet::new(),
        }
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn store(&self) -> &Arc<FileStore> {
        &self.store
    }

    /// Names this manager registered outputs under, sorted.
    pub fn registered(&self) -> Vec<String> {
        self.registered.iter().map(|name| name.key().clone()).sorted().collect()
    }
}

impl<M: FileManager> FileManager for MemoryFileManager<M> {
    fn input_file(
        &self,
        class_name: &str,
        kind: FileKind,
    ) -> Result<Option<Arc<VirtualFile>>, FileError> {
        match self.store.get(class_name) {
            Some(file) => Ok(Some(file)),
            None => self.delegate.input_file(class_name, kind),
        }
    }

    fn output_file(&self, class_name: &str, kind: FileKind) -> Result<Arc<VirtualFile>, FileError> {
        tracing::debug!("Register output {} ({:?})", class_name, kind);
        let file = Arc::new(VirtualFile::output(class_name, kind, Some(self.session)));
        self.store.insert(class_name, file.clone());
        self.registered.insert(class_name.to_string());
        Ok(file)
    }

    fn list(&self, kind: FileKind) -> Result<Vec<(String, Arc<VirtualFile>)>, FileError> {
        Ok(self.store.files_of_kind(kind))
    }

    fn class_path(&self) -> Vec<PathBuf> {
        self.delegate.class_path()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn class_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/Helper.class"), [0xCA_u8, 0xFE, 0xBA, 0xBE]).unwrap();
        fs::write(dir.path().join("Shadowed.class"), [1_u8]).unwrap();
        fs::write(dir.path().join("Readme.txt"), "not a class").unwrap();
        dir
    }

    #[test]
    fn test_standard_resolves_from_class_path() {
        let dir = class_dir();
        let manager = StandardFileManager::new([dir.path()]);

        let helper = manager
            .input_file("lib.Helper", FileKind::Class)
            .unwrap()
            .unwrap();
        assert_eq!(helper.compiled_bytes().unwrap(), vec![0xCA, 0xFE, 0xBA, 0xBE]);
        assert!(manager.input_file("Missing", FileKind::Class).unwrap().is_none());
    }

    #[test]
    fn test_standard_lists_class_files() {
        let dir = class_dir();
        let manager = StandardFileManager::new([dir.path()]);

        let names: Vec<String> = manager
            .list(FileKind::Class)
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .sorted()
            .collect();
        assert_eq!(names, vec!["Shadowed", "lib.Helper"]);
        assert!(manager.list(FileKind::Other).unwrap().is_empty());
    }

    #[test]
    fn test_standard_output_is_detached() {
        let manager = StandardFileManager::default();
        let file = manager.output_file("Foo", FileKind::Class).unwrap();

        assert_eq!(file.session(), None);
        assert!(manager.input_file("Foo", FileKind::Class).unwrap().is_none());
    }

    #[test]
    fn test_memory_output_registers_in_store() {
        let store = Arc::new(FileStore::new());
        let manager = MemoryFileManager::new(StandardFileManager::default(), store.clone());

        let file = manager.output_file("Foo", FileKind::Class).unwrap();
        file.open_output_stream().unwrap().write_all(b"bytes").unwrap();

        let stored = store.get("Foo").unwrap();
        assert!(Arc::ptr_eq(&stored, &file));
        assert_eq!(stored.session(), Some(manager.session()));
        assert_eq!(manager.registered(), vec!["Foo"]);
    }

    #[test]
    fn test_memory_output_overwrites_previous_registration() {
        let store = Arc::new(FileStore::new());
        let first = MemoryFileManager::new(StandardFileManager::default(), store.clone());
        let second = MemoryFileManager::new(StandardFileManager::default(), store.clone());

        first.output_file("Foo", FileKind::Class).unwrap();
        second.output_file("Foo", FileKind::Class).unwrap();

        assert_eq!(store.get("Foo").unwrap().session(), Some(second.session()));
        assert_ne!(first.session(), second.session());
    }

    #[test]
    fn test_memory_input_prefers_store_then_delegate() {
        let dir = class_dir();
        let store = Arc::new(FileStore::new());
        let manager = MemoryFileManager::new(StandardFileManager::new([dir.path()]), store.clone());

        let registered = manager.output_file("Shadowed", FileKind::Class).unwrap();

        let shadowed = manager
            .input_file("Shadowed", FileKind::Class)
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&shadowed, &registered));

        let helper = manager
            .input_file("lib.Helper", FileKind::Class)
            .unwrap()
            .unwrap();
        assert_eq!(helper.session(), None);
    }

    #[test]
    fn test_memory_list_covers_store_only() {
        let dir = class_dir();
        let jar = dir.path().join("helper.jar");
        fs::write(&jar, b"PK").unwrap();
        let store = Arc::new(FileStore::new());
        let manager = MemoryFileManager::new(
            StandardFileManager::new([dir.path().to_path_buf(), jar.clone()]),
            store,
        );

        let registered = manager.output_file("Shadowed", FileKind::Class).unwrap();

        let files = manager.list(FileKind::Class).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "Shadowed");
        assert!(Arc::ptr_eq(&files[0].1, &registered));
        assert_eq!(manager.class_path(), vec![dir.path().to_path_buf(), jar]);
    }

    #[test]
    fn test_standard_list_skips_jar_entries() {
        let dir = class_dir();
        let jar = dir.path().join("helper.jar");
        fs::write(&jar, b"PK").unwrap();
        let manager = StandardFileManager::new([jar.clone(), dir.path().to_path_buf()]);

        let names: Vec<String> = manager
            .list(FileKind::Class)
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .sorted()
            .collect();

        assert_eq!(names, vec!["Shadowed", "lib.Helper"]);
        assert_eq!(manager.class_path()[0], jar);
    }

    #[test]
    fn test_memory_delegates_only_on_store_miss() {
        let mut delegate = MockFileManager::new();
        delegate.expect_input_file().times(1).returning(|name, kind| {
            assert_eq!(name, "java.lang.String");
            assert_eq!(kind, FileKind::Class);
            Ok(None)
        });
        delegate.expect_output_file().never();
        let manager = MemoryFileManager::new(delegate, Arc::new(FileStore::new()));

        manager.output_file("Foo", FileKind::Class).unwrap();

        assert!(manager.input_file("Foo", FileKind::Class).unwrap().is_some());
        assert!(
            manager
                .input_file("java.lang.String", FileKind::Class)
                .unwrap()
                .is_none()
        );
    }
}
