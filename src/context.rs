//! The explicit context threaded through every parse: schema registry,
//! loaded-object table, diagnostics sink and line source.

use crate::diagnostics::{DiagnosticEvent, DiagnosticSink, LogSink, Severity};
use crate::lexer::Tokenizer;
use crate::schema::SchemaRegistry;
use crate::utils::normalize_path;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Supplies the raw lines of a script. Index `n` holds line `n + 1`.
pub trait LineSource: Send + Sync {
    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>>;
}

/// Reads scripts from disk. Bytes that are not UTF-8 are replaced rather
/// than rejected; older scripts are often Latin-1.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLineSource;

impl LineSource for FsLineSource {
    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>> {
        let bytes = std::fs::read(path)?;
        Ok(split_lines(&String::from_utf8_lossy(&bytes)))
    }
}

/// Serves scripts from memory, keyed by normalized path.
#[derive(Debug, Default, Clone)]
pub struct MemoryLineSource {
    files: HashMap<PathBuf, String>,
}

impl MemoryLineSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.files.insert(normalize_path(path.as_ref()), text.into());
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }
}

impl LineSource for MemoryLineSource {
    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>> {
        self.files
            .get(&normalize_path(path))
            .map(|text| split_lines(text))
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such in-memory file"))
    }
}

pub(crate) fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Where a top-level object was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedObject {
    pub reference_type: String,
    pub name: String,
    pub schema: String,
    pub path: PathBuf,
    pub line: usize,
}

/// Every top-level object of every successful load, keyed
/// case-insensitively by (reference type, name). Safe to share between
/// concurrent loads; a later load of the same key replaces the earlier one.
#[derive(Debug, Default)]
pub struct LoadedObjectTable {
    entries: Mutex<IndexMap<(String, String), LoadedObject>>,
}

impl LoadedObjectTable {
    /// Returns the entry this one replaced, if any.
    pub fn record(&self, object: LoadedObject) -> Option<LoadedObject> {
        let key = (
            object.reference_type.to_ascii_lowercase(),
            object.name.to_ascii_lowercase(),
        );
        self.entries.lock().insert(key, object)
    }

    pub fn get(&self, reference_type: &str, name: &str) -> Option<LoadedObject> {
        let key = (reference_type.to_ascii_lowercase(), name.to_ascii_lowercase());
        self.entries.lock().get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<LoadedObject> {
        self.entries.lock().values().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

pub struct ParseContext {
    registry: Arc<SchemaRegistry>,
    loaded: LoadedObjectTable,
    sink: Arc<dyn DiagnosticSink>,
    source: Arc<dyn LineSource>,
    tokenizer: Tokenizer,
}

impl ParseContext {
    /// A context reading from disk and reporting through `log`.
    pub fn new(registry: SchemaRegistry) -> Self {
        Self::with_registry(Arc::new(registry))
    }

    pub fn with_registry(registry: Arc<SchemaRegistry>) -> Self {
        ParseContext {
            registry,
            loaded: LoadedObjectTable::default(),
            sink: Arc::new(LogSink),
            source: Arc::new(FsLineSource),
            tokenizer: Tokenizer::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_line_source(mut self, source: Arc<dyn LineSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn loaded_objects(&self) -> &LoadedObjectTable {
        &self.loaded
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn line_source(&self) -> &dyn LineSource {
        self.source.as_ref()
    }

    pub fn report(&self, event: DiagnosticEvent) {
        self.sink.report(event);
    }

    pub(crate) fn report_at(&self, severity: Severity, message: impl Into<String>, file: &Path, line: usize) {
        self.report(DiagnosticEvent::new(severity, message).at(file, line));
    }
}
