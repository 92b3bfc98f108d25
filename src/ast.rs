use crate::lexer::Token;
use std::path::PathBuf;

/// Index of a [`SourceFile`] inside a [`crate::workspace::Workspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub(crate) usize);

/// Index of a scope inside a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub(crate) usize);

/// Index of a schema object inside a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub(crate) usize);

/// Identity of an expression. Ids grow monotonically in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub(crate) usize);

/// The physical line a value or object came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub file: FileId,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub lines: Vec<String>,
    pub tokens: Vec<Token>,
    pub entries: Vec<Entry>,
    /// Objects created by this file, in creation order.
    pub objects: Vec<ObjectId>,
    pub scope: ScopeId,
    /// The file whose include or run directive loaded this one.
    pub parent: Option<FileId>,
}

impl SourceFile {
    pub(crate) fn new(id: FileId, path: PathBuf, lines: Vec<String>, scope: ScopeId) -> Self {
        SourceFile {
            id,
            path,
            lines,
            tokens: Vec::new(),
            entries: Vec::new(),
            objects: Vec::new(),
            scope,
            parent: None,
        }
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub kind: EntryKind,
    pub line: usize,
    /// Comment lines directly above this entry.
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    Object(ObjectId),
    ActiveSwitch { object: ObjectId, text: String },
    /// Property lines on an object this file neither created nor
    /// activated, such as its includer's active object. Writes no line of
    /// its own; the object's properties from this file follow it.
    Continuation { object: ObjectId, reference: String },
    Comment(String),
    Statement(Statement),
    Expression(ExprId),
    Block(Block),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Include,
    Run,
}

impl StatementKind {
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            StatementKind::Include => "include",
            StatementKind::Run => "run",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub path: String,
    pub arguments: Vec<String>,
    /// The file loaded by this statement, unless execution was skipped.
    pub file: Option<FileId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Comment,
    Conditional,
}

/// A `beginRem`/`endRem` or `if`/`endIf` region kept verbatim. Conditionals
/// are never evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    Variable,
    Constant,
}

impl ExpressionKind {
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            ExpressionKind::Variable => "var",
            ExpressionKind::Constant => "const",
        }
    }
}

/// A named variable or constant binding.
#[derive(Debug, Clone)]
pub struct Expression {
    pub id: ExprId,
    pub kind: ExpressionKind,
    pub name: String,
    pub value: Option<String>,
    pub origin: Option<Origin>,
}

impl Expression {
    /// The raw value, or an empty string for a declaration without one.
    #[must_use]
    pub fn raw_value(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Expression {}
