use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use itertools::Itertools;

use crate::core::file::{FileKind, VirtualFile};

static GLOBAL_STORE: LazyLock<Arc<FileStore>> = LazyLock::new(|| Arc::new(FileStore::new()));

/// Class name to virtual file table.
///
/// Holds at most one file per name; registering a name again replaces
/// the previous entry. Nothing is ever evicted.
#[derive(Debug, Default)]
pub struct FileStore {
    files: DashMap<String, Arc<VirtualFile>>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store shared by every caller in the process.
    pub fn global() -> Arc<FileStore> {
        GLOBAL_STORE.clone()
    }

    pub fn get(&self, class_name: &str) -> Option<Arc<VirtualFile>> {
        self.files.get(class_name).map(|entry| entry.value().clone())
    }

    /// Returns the entry that was replaced, if any.
    pub fn insert(&self, class_name: &str, file: Arc<VirtualFile>) -> Option<Arc<VirtualFile>> {
        let previous = self.files.insert(class_name.to_string(), file);
        if previous.is_some() {
            tracing::debug!("Replaced virtual file for {}", class_name);
        }
        previous
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.files.contains_key(class_name)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sorted names of all registered files.
    pub fn names(&self) -> Vec<String> {
        self.files.iter().map(|entry| entry.key().clone()).sorted().collect()
    }

    /// Entries of the given kind, sorted by name.
    pub fn files_of_kind(&self, kind: FileKind) -> Vec<(String, Arc<VirtualFile>)> {
        self.files
            .iter()
            .filter(|entry| entry.value().kind() == kind)
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .sorted_by(|a, b| a.0.cmp(&b.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_file(name: &str) -> Arc<VirtualFile> {
        Arc::new(VirtualFile::output(name, FileKind::Class, None))
    }

    #[test]
    fn test_insert_and_get() {
        let store = FileStore::new();
        assert!(store.is_empty());

        let file = class_file("Foo");
        assert!(store.insert("Foo", file.clone()).is_none());

        assert!(store.contains("Foo"));
        assert!(Arc::ptr_eq(&store.get("Foo").unwrap(), &file));
        assert!(store.get("Bar").is_none());
    }

    #[test]
    fn test_insert_replaces_previous_entry() {
        let store = FileStore::new();
        let first = class_file("Foo");
        let second = class_file("Foo");

        store.insert("Foo", first.clone());
        let replaced = store.insert("Foo", second.clone()).unwrap();

        assert!(Arc::ptr_eq(&replaced, &first));
        assert!(Arc::ptr_eq(&store.get("Foo").unwrap(), &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_names_and_kind_filter() {
        let store = FileStore::new();
        store.insert("b.Second", class_file("b.Second"));
        store.insert("a.First", class_file("a.First"));
        store.insert(
            "Source",
            Arc::new(VirtualFile::source("Source", "class Source {}")),
        );

        assert_eq!(store.names(), vec!["Source", "a.First", "b.Second"]);

        let classes: Vec<String> = store
            .files_of_kind(FileKind::Class)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(classes, vec!["a.First", "b.Second"]);
    }

    #[test]
    fn test_global_store_is_shared() {
        let a = FileStore::global();
        let b = FileStore::global();

        assert!(Arc::ptr_eq(&a, &b));
    }
}
