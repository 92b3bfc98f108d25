//! Owns every file, scope, object and expression produced by a set of
//! loads. Everything else refers to them by id.

use crate::ast::{ExprId, Expression, ExpressionKind, FileId, ObjectId, Origin, ScopeId, SourceFile};
use crate::error::ScriptError;
use crate::object::ConObject;
use crate::schema::SchemaRegistry;
use crate::scope::{Scope, ScopeTables};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone)]
pub struct Workspace {
    pub(crate) files: Vec<SourceFile>,
    pub(crate) scopes: Vec<Scope>,
    pub(crate) tables: Vec<ScopeTables>,
    pub(crate) objects: Vec<ConObject>,
    pub(crate) expressions: Vec<Expression>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    /// Panics if `id` did not come from this workspace.
    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0]
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// The most recently loaded file with this path.
    pub fn find_file(&self, path: &Path) -> Option<FileId> {
        self.files.iter().rev().find(|f| f.path == path).map(|f| f.id)
    }

    pub(crate) fn add_file(&mut self, path: PathBuf, lines: Vec<String>, scope: ScopeId) -> FileId {
        let id = FileId(self.files.len());
        self.files.push(SourceFile::new(id, path, lines, scope));
        id
    }

    pub(crate) fn file_mut(&mut self, id: FileId) -> &mut SourceFile {
        &mut self.files[id.0]
    }

    pub fn object(&self, id: ObjectId) -> &ConObject {
        &self.objects[id.0]
    }

    pub fn object_mut(&mut self, id: ObjectId) -> &mut ConObject {
        &mut self.objects[id.0]
    }

    pub(crate) fn insert_object(&mut self, object: ConObject) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    pub fn expression(&self, id: ExprId) -> &Expression {
        &self.expressions[id.0]
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub fn new_expression(
        &mut self,
        kind: ExpressionKind,
        name: &str,
        value: Option<String>,
        origin: Option<Origin>,
    ) -> ExprId {
        let id = ExprId(self.expressions.len());
        self.expressions.push(Expression {
            id,
            kind,
            name: name.to_string(),
            value,
            origin,
        });
        id
    }

    /// Changes what an expression holds. Values already bound to it keep
    /// their converted data until written out again.
    pub fn set_expression_value(&mut self, id: ExprId, value: impl Into<String>) {
        self.expressions[id.0].value = Some(value.into());
    }

    /// Converts `args` for `property` and stores them on `object`.
    /// Variables and constants resolve through `scope`.
    #[allow(clippy::too_many_arguments)]
    pub fn assign_property(
        &mut self,
        registry: &SchemaRegistry,
        scope: ScopeId,
        object: ObjectId,
        property: &str,
        args: &[String],
        origin: Option<Origin>,
        comment: Option<String>,
    ) -> Result<(), ScriptError> {
        let Workspace {
            scopes,
            tables,
            objects,
            expressions,
            ..
        } = self;
        let lookup = crate::scope::ScopedLookup {
            scopes: scopes.as_slice(),
            tables: tables.as_slice(),
            expressions: expressions.as_slice(),
            scope,
        };
        objects[object.0].assign(registry, property, args, &lookup, origin, comment)
    }

    /// Sets a property from one line of text, e.g. `setPosition 1 2 3`.
    /// Variables resolve through `scope`. The change has no source line.
    pub fn set_property_text(
        &mut self,
        registry: &SchemaRegistry,
        scope: ScopeId,
        object: ObjectId,
        text: &str,
    ) -> Result<(), ScriptError> {
        let mut parts = crate::lexer::split_arguments(text).into_iter();
        let property = parts.next().ok_or_else(|| ScriptError::UnrecognizedLine {
            text: text.to_string(),
        })?;
        let args: Vec<String> = parts.collect();
        self.assign_property(registry, scope, object, &property, &args, None, None)
    }
}
