use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::constants::{CLASS_EXTENSION, SOURCE_EXTENSION, URI_SCHEME};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileKind {
    Source,
    Class,
    Other,
}

impl FileKind {
    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Source => SOURCE_EXTENSION,
            FileKind::Class => CLASS_EXTENSION,
            FileKind::Other => "",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("{name} is not a source file and has no text content")]
    NotASource { name: String },
    #[error("{name} is a source file and cannot be opened for writing")]
    NotAnOutput { name: String },
    #[error("I/O error on {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// In-memory stand-in for a source file or a compiled class file.
///
/// Source files are immutable. Output files hand out writers that
/// accumulate into a shared buffer; every `open_output_stream` call
/// starts a fresh buffer and detaches writers opened earlier.
#[derive(Debug)]
pub struct VirtualFile {
    name: String,
    kind: FileKind,
    payload: Payload,
}

#[derive(Debug)]
enum Payload {
    Source(String),
    Output {
        session: Option<Uuid>,
        buffer: Mutex<Arc<Mutex<Vec<u8>>>>,
    },
}

impl VirtualFile {
    pub fn source(name: &str, text: &str) -> Self {
        VirtualFile {
            name: name.to_string(),
            kind: FileKind::Source,
            payload: Payload::Source(text.to_string()),
        }
    }

    /// Empty output file created on behalf of a compile session.
    pub fn output(name: &str, kind: FileKind, session: Option<Uuid>) -> Self {
        VirtualFile {
            name: name.to_string(),
            kind,
            payload: Payload::Output {
                session,
                buffer: Mutex::new(Arc::new(Mutex::new(Vec::new()))),
            },
        }
    }

    /// Output-mode file that already holds bytes, e.g. a class read from a class path.
    pub fn with_bytes(name: &str, kind: FileKind, bytes: Vec<u8>) -> Self {
        VirtualFile {
            name: name.to_string(),
            kind,
            payload: Payload::Output {
                session: None,
                buffer: Mutex::new(Arc::new(Mutex::new(bytes))),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn uri(&self) -> String {
        format!(
            "{}:///{}{}",
            URI_SCHEME,
            self.name.replace('.', "/"),
            self.kind.extension()
        )
    }

    /// Session that registered this output file, if any.
    pub fn session(&self) -> Option<Uuid> {
        match &self.payload {
            Payload::Source(_) => None,
            Payload::Output { session, .. } => *session,
        }
    }

    pub fn char_content(&self) -> Result<&str, FileError> {
        match &self.payload {
            Payload::Source(text) => Ok(text),
            Payload::Output { .. } => Err(FileError::NotASource {
                name: self.name.clone(),
            }),
        }
    }

    pub fn open_output_stream(&self) -> Result<OutputStream, FileError> {
        match &self.payload {
            Payload::Source(_) => Err(FileError::NotAnOutput {
                name: self.name.clone(),
            }),
            Payload::Output { buffer, .. } => {
                let fresh = Arc::new(Mutex::new(Vec::new()));
                *lock(buffer) = fresh.clone();
                Ok(OutputStream { buffer: fresh })
            }
        }
    }

    /// Bytes accumulated by the last opened writer. Empty when nothing was written.
    pub fn compiled_bytes(&self) -> Result<Vec<u8>, FileError> {
        match &self.payload {
            Payload::Source(_) => Err(FileError::NotAnOutput {
                name: self.name.clone(),
            }),
            Payload::Output { buffer, .. } => {
                let current = lock(buffer).clone();
                let bytes = lock(&current).clone();
                Ok(bytes)
            }
        }
    }
}

#[derive(Debug)]
pub struct OutputStream {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.buffer).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_file_exposes_text() {
        let file = VirtualFile::source("Hello", "public class Hello {}");

        assert_eq!(file.kind(), FileKind::Source);
        assert_eq!(file.char_content().unwrap(), "public class Hello {}");
        assert_eq!(file.uri(), "mem:///Hello.java");
        assert_eq!(file.session(), None);
    }

    #[test]
    fn test_output_file_has_no_char_content() {
        let file = VirtualFile::output("Hello", FileKind::Class, None);

        assert!(matches!(
            file.char_content(),
            Err(FileError::NotASource { name }) if name == "Hello"
        ));
    }

    #[test]
    fn test_source_file_cannot_be_written() {
        let file = VirtualFile::source("Hello", "class Hello {}");

        assert!(matches!(
            file.open_output_stream(),
            Err(FileError::NotAnOutput { .. })
        ));
        assert!(matches!(
            file.compiled_bytes(),
            Err(FileError::NotAnOutput { .. })
        ));
    }

    #[test]
    fn test_output_stream_accumulates_bytes() {
        let session = Uuid::new_v4();
        let file = VirtualFile::output("pkg.Hello", FileKind::Class, Some(session));
        assert!(file.compiled_bytes().unwrap().is_empty());

        let mut out = file.open_output_stream().unwrap();
        out.write_all(&[0xCA, 0xFE]).unwrap();
        out.write_all(&[0xBA, 0xBE]).unwrap();
        out.flush().unwrap();

        assert_eq!(file.compiled_bytes().unwrap(), vec![0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(file.session(), Some(session));
        assert_eq!(file.uri(), "mem:///pkg/Hello.class");
    }

    #[test]
    fn test_reopening_discards_previous_writer() {
        let file = VirtualFile::output("Hello", FileKind::Class, None);

        let mut first = file.open_output_stream().unwrap();
        first.write_all(b"old").unwrap();
        let mut second = file.open_output_stream().unwrap();
        second.write_all(b"new").unwrap();
        first.write_all(b"late").unwrap();

        assert_eq!(file.compiled_bytes().unwrap(), b"new".to_vec());
    }

    #[test]
    fn test_prefilled_file() {
        let file = VirtualFile::with_bytes("Dep", FileKind::Class, vec![1, 2, 3]);

        assert_eq!(file.compiled_bytes().unwrap(), vec![1, 2, 3]);
        assert_eq!(file.session(), None);
    }
}
