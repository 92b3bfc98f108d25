//! Writes a parsed file back out as script text, and flattens it into
//! plain records for JSON/YAML export.

use crate::ast::{EntryKind, ExprId, FileId, ObjectId, Statement};
use crate::error::ScriptError;
use crate::object::{ConObject, PropertyData, PropertyEntry};
use crate::schema::{Shape, ValueKind};
use crate::value::{convert, quote, Scalar, Value, DEFAULT_FLOAT_PRECISION};
use crate::workspace::Workspace;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Decimal places floats are rounded to before trailing zeros are cut.
    pub float_precision: usize,
    /// Write `v_`/`c_` names instead of the values they currently hold.
    pub keep_expression_refs: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        SerializeOptions {
            float_precision: DEFAULT_FLOAT_PRECISION,
            keep_expression_refs: false,
        }
    }
}

/// Rebuilds the text of `file`. Variables and constants come first, then
/// everything else in source order. Only values that came from `file`
/// itself are written.
///
/// # Errors
/// Fails when a variable a value is bound to no longer converts to the
/// property's type.
pub fn serialize_file(ws: &Workspace, file: FileId, options: SerializeOptions) -> Result<String, ScriptError> {
    let writer = Writer { ws, file, options };
    let source = ws.file(file);
    let mut out = Vec::new();

    for entry in &source.entries {
        if let EntryKind::Expression(id) = entry.kind {
            writer.comment(&mut out, entry.comment.as_deref());
            let expression = ws.expression(id);
            match &expression.value {
                Some(value) => out.push(format!("{} {} = {value}", expression.kind.keyword(), expression.name)),
                None => out.push(format!("{} {}", expression.kind.keyword(), expression.name)),
            }
        }
    }
    let has_body = source
        .entries
        .iter()
        .any(|entry| !matches!(entry.kind, EntryKind::Expression(_)));
    if !out.is_empty() && has_body {
        out.push(String::new());
    }

    let mut written: HashSet<ObjectId> = HashSet::new();
    for entry in &source.entries {
        match &entry.kind {
            EntryKind::Expression(_) => {}
            EntryKind::Comment(text) => writer.comment(&mut out, Some(text)),
            EntryKind::Block(block) => {
                writer.comment(&mut out, entry.comment.as_deref());
                out.extend(block.lines.iter().cloned());
            }
            EntryKind::Statement(statement) => {
                writer.comment(&mut out, entry.comment.as_deref());
                out.push(statement_line(statement));
            }
            EntryKind::Object(id) => {
                writer.comment(&mut out, entry.comment.as_deref());
                let object = ws.object(*id);
                let mut line = format!("{}.create", object.reference_text);
                for arg in &object.create_args {
                    line.push(' ');
                    line.push_str(arg);
                }
                out.push(line);
                if written.insert(*id) {
                    writer.properties(&mut out, object, &object.reference_text, object_file(object))?;
                }
            }
            EntryKind::ActiveSwitch { object, text } => {
                writer.comment(&mut out, entry.comment.as_deref());
                out.push(text.clone());
                if written.insert(*object) {
                    let object = ws.object(*object);
                    let reference = reference_of(text, &object.reference_text);
                    writer.properties(&mut out, object, reference, object_file(object))?;
                }
            }
            EntryKind::Continuation { object, reference } => {
                if written.insert(*object) {
                    let object = ws.object(*object);
                    writer.properties(&mut out, object, reference, object_file(object))?;
                }
            }
        }
    }

    let mut text = out.join("\n");
    text.push('\n');
    Ok(text)
}

fn object_file(object: &ConObject) -> Option<FileId> {
    object.origin.map(|o| o.file)
}

// The reference type as spelled on an `.active` line.
fn reference_of<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    text.split_once('.').map_or(fallback, |(reference, _)| reference.trim())
}

fn statement_line(statement: &Statement) -> String {
    let mut line = format!("{} {}", statement.kind.keyword(), quote(&statement.path));
    for arg in &statement.arguments {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

struct Writer<'a> {
    ws: &'a Workspace,
    file: FileId,
    options: SerializeOptions,
}

impl Writer<'_> {
    fn comment(&self, out: &mut Vec<String>, comment: Option<&str>) {
        for line in comment.into_iter().flat_map(|c| c.split('\n')) {
            if line.is_empty() {
                out.push("rem".to_string());
            } else {
                out.push(format!("rem {line}"));
            }
        }
    }

    // Entries without an origin were set through the API and belong to the
    // object's own file.
    fn owns(&self, entry: &PropertyEntry, home: Option<FileId>) -> bool {
        entry.origin.map_or(home, |o| Some(o.file)) == Some(self.file)
    }

    fn properties(
        &self,
        out: &mut Vec<String>,
        object: &ConObject,
        prefix: &str,
        home: Option<FileId>,
    ) -> Result<(), ScriptError> {
        for property in object.ordered_properties() {
            let name = format!("{prefix}.{}", property.name);
            if let PropertyData::Nested(nested) = &property.data {
                self.properties(out, nested, &name, home)?;
                continue;
            }
            let Some(def) = object.schema.property(&property.name) else {
                continue;
            };
            for entry in property.entries() {
                if !self.owns(entry, home) {
                    continue;
                }
                self.comment(out, entry.comment.as_deref());
                let mut line = name.clone();
                if let (Some(key), Shape::Map { key: kind, .. }) = (&entry.key, &def.shape) {
                    for part in self.render(key, kind)? {
                        line.push(' ');
                        line.push_str(&part);
                    }
                }
                let kinds = def.shape.value_kinds();
                for (at, value) in entry.values.iter().enumerate() {
                    let rendered = match kinds.get(at) {
                        Some(kind) => self.render(value, kind)?,
                        None => value.data.render(self.options.float_precision),
                    };
                    for part in rendered {
                        line.push(' ');
                        line.push_str(&part);
                    }
                }
                out.push(line);
            }
        }
        Ok(())
    }

    /// A bound value, or a bound array item, is re-derived from its
    /// expression's current value.
    fn render(&self, value: &Value, kind: &ValueKind) -> Result<Vec<String>, ScriptError> {
        if let (Scalar::Array(items), ValueKind::Array(element)) = (&value.data, kind) {
            if !value.item_expressions.is_empty() {
                let mut parts = Vec::with_capacity(items.len());
                for (item, expression) in items.iter().zip(&value.item_expressions) {
                    parts.extend(self.derive(item, *expression, element)?);
                }
                return Ok(parts);
            }
        }
        self.derive(&value.data, value.expression, kind)
    }

    fn derive(&self, data: &Scalar, expression: Option<ExprId>, kind: &ValueKind) -> Result<Vec<String>, ScriptError> {
        let Some(id) = expression else {
            return Ok(data.render(self.options.float_precision));
        };
        let expression = self.ws.expression(id);
        if self.options.keep_expression_refs {
            return Ok(vec![expression.name.clone()]);
        }
        Ok(convert(expression.raw_value(), kind)?.render(self.options.float_precision))
    }
}

/// One stored property occurrence, flattened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatProperty {
    pub reference_type: String,
    pub object: String,
    /// `outer.inner` for properties of nested objects.
    pub property: String,
    /// Map keys come first.
    pub values: Vec<Scalar>,
}

/// Every property occurrence `file` defines, grouped by reference type,
/// object and property. Occurrences of one property keep their stored
/// order.
pub fn flatten(ws: &Workspace, file: FileId) -> Vec<FlatProperty> {
    let writer = Writer {
        ws,
        file,
        options: SerializeOptions::default(),
    };
    let mut seen = HashSet::new();
    let mut flat = Vec::new();
    for entry in &ws.file(file).entries {
        let id = match &entry.kind {
            EntryKind::Object(id) => *id,
            EntryKind::ActiveSwitch { object, .. } | EntryKind::Continuation { object, .. } => *object,
            _ => continue,
        };
        if !seen.insert(id) {
            continue;
        }
        let object = ws.object(id);
        flatten_object(&writer, object, &object.name, "", object_file(object), &mut flat);
    }
    flat.sort_by(|a, b| {
        let key = |p: &FlatProperty| {
            (
                p.reference_type.to_ascii_lowercase(),
                p.object.to_ascii_lowercase(),
                p.property.to_ascii_lowercase(),
            )
        };
        key(a).cmp(&key(b))
    });
    flat
}

fn flatten_object(
    writer: &Writer<'_>,
    object: &ConObject,
    name: &str,
    prefix: &str,
    home: Option<FileId>,
    flat: &mut Vec<FlatProperty>,
) {
    for property in object.properties() {
        let path = format!("{prefix}{}", property.name);
        if let PropertyData::Nested(nested) = &property.data {
            flatten_object(writer, nested, name, &format!("{path}."), home, flat);
            continue;
        }
        for entry in property.entries() {
            if !writer.owns(entry, home) {
                continue;
            }
            let values = entry
                .key
                .iter()
                .chain(&entry.values)
                .map(|v| v.data.clone())
                .collect();
            flat.push(FlatProperty {
                reference_type: object.reference_type.clone(),
                object: name.to_string(),
                property: path.clone(),
                values,
            });
        }
    }
}
