//! Source file handles, locations and the interned `Identifier` type.
//!
//! A file-handle-aware location (file, line, column, byte offset) plus the
//! single owner of source buffers for a compilation.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    rc::Rc,
};

/// Opaque handle into a `SourceFileManager`. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Owns every source buffer for a compilation unit. Append-only during
/// parsing.
#[derive(Debug, Default)]
pub struct SourceFileManager {
    files: Vec<SourceFile>,
    by_path: HashMap<PathBuf, FileId>,
}

impl SourceFileManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl AsRef<Path>, contents: String) -> FileId {
        let path = path.as_ref().to_path_buf();
        if let Some(id) = self.by_path.get(&path) {
            return *id;
        }
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile { path: path.clone(), contents });
        self.by_path.insert(path, id);
        id
    }

    pub fn get(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }
}

/// A single point in a source file: line and column are 0-based, `offset` is
/// the byte offset into the file's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Location {
    pub file: FileId,
    pub line: usize,
    pub col: usize,
    pub offset: usize,
}

impl Default for Location {
    fn default() -> Self {
        Location { file: FileId(0), line: 0, col: 0, offset: 0 }
    }
}

/// Inclusive start/end source range.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct SourceRange {
    pub start: Location,
    pub end: Location,
}

impl Default for SourceRange {
    fn default() -> Self {
        SourceRange { start: Location::default(), end: Location::default() }
    }
}

impl SourceRange {
    pub fn merge(&self, other: SourceRange) -> SourceRange {
        SourceRange { start: self.start, end: other.end }
    }
}

/// Ranges never participate in equality/ordering of the AST nodes that carry
/// them — only the `Identifier`/node payload does.
impl PartialEq for SourceRange {
    fn eq(&self, _other: &SourceRange) -> bool {
        true
    }
}
impl Eq for SourceRange {}

/// An interned identifier. Equality and hashing are by string content only —
/// the optional range is carried purely for diagnostics.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: Rc<str>,
    pub range: Option<SourceRange>,
}

impl Identifier {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Identifier { name: name.into(), range: None }
    }

    pub fn with_range(name: impl Into<Rc<str>>, range: SourceRange) -> Self {
        Identifier { name: name.into(), range: Some(range) }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Identifier {}

impl std::hash::Hash for Identifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::new(value)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::new(value)
    }
}
