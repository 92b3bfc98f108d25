//! Schema tables: which properties a schema type accepts and how each
//! reference type creates its objects.
//!
//! Concrete schemas are data. The core only dispatches against what has
//! been registered here.

use crate::ast::Origin;
use crate::error::{SchemaError, ScriptError};
use crate::object::ConObject;
use std::collections::HashMap;
use std::sync::Arc;

/// A named set of accepted spellings, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    pub variants: Vec<String>,
}

impl EnumDef {
    pub fn new(name: &str, variants: &[&str]) -> Self {
        EnumDef {
            name: name.to_string(),
            variants: variants.iter().map(|v| (*v).to_string()).collect(),
        }
    }

    /// The canonical spelling of `text`, if it names a variant.
    #[must_use]
    pub fn variant(&self, text: &str) -> Option<&str> {
        self.variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(text))
            .map(String::as_str)
    }
}

/// The typed target of one positional argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Int,
    Float,
    Bool,
    Str,
    Enum(EnumDef),
    /// Name of an object of the given reference type.
    Object(String),
    /// Consumes every remaining argument, converting each one.
    Array(Box<ValueKind>),
}

impl ValueKind {
    pub fn array(element: ValueKind) -> Self {
        ValueKind::Array(Box::new(element))
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            ValueKind::Int => "an integer".to_string(),
            ValueKind::Float => "a number".to_string(),
            ValueKind::Bool => "a boolean".to_string(),
            ValueKind::Str => "a string".to_string(),
            ValueKind::Enum(def) => format!("one of {} ({})", def.name, def.variants.join(", ")),
            ValueKind::Object(reference) => format!("a {reference} name"),
            ValueKind::Array(element) => format!("a list of {}", element.describe()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// One value, the last assignment wins.
    Scalar(ValueKind),
    /// A fixed number of positional values.
    Tuple(Vec<ValueKind>),
    /// One entry per occurrence, in source order.
    List(Vec<ValueKind>),
    /// Keyed entries; a repeated key overwrites in place.
    Map { key: ValueKind, value: Vec<ValueKind> },
    /// A nested object of the named schema.
    Nested(String),
}

impl Shape {
    /// Kinds of the positional values an entry stores, key excluded.
    #[must_use]
    pub fn value_kinds(&self) -> &[ValueKind] {
        match self {
            Shape::Scalar(kind) => std::slice::from_ref(kind),
            Shape::Tuple(kinds) | Shape::List(kinds) => kinds,
            Shape::Map { value, .. } => value,
            Shape::Nested(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// Script-visible name.
    pub name: String,
    /// Output order; lower values are written first.
    pub priority: u32,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    pub name: String,
    properties: Vec<PropertyDef>,
    index: HashMap<String, usize>,
}

impl ObjectSchema {
    pub fn builder(name: &str) -> SchemaBuilder {
        SchemaBuilder {
            name: name.to_string(),
            properties: Vec::new(),
        }
    }

    /// Case-insensitive lookup by script name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.index
            .get(&name.to_ascii_lowercase())
            .and_then(|&at| self.properties.get(at))
    }

    pub fn properties(&self) -> &[PropertyDef] {
        &self.properties
    }

    /// Declaration position, used to break output-priority ties.
    pub(crate) fn position(&self, name: &str) -> usize {
        self.index
            .get(&name.to_ascii_lowercase())
            .copied()
            .unwrap_or(usize::MAX)
    }
}

pub struct SchemaBuilder {
    name: String,
    properties: Vec<PropertyDef>,
}

impl SchemaBuilder {
    pub fn property(mut self, name: &str, priority: u32, shape: Shape) -> Self {
        self.properties.push(PropertyDef {
            name: name.to_string(),
            priority,
            shape,
        });
        self
    }

    pub fn scalar(self, name: &str, priority: u32, kind: ValueKind) -> Self {
        self.property(name, priority, Shape::Scalar(kind))
    }

    pub fn tuple(self, name: &str, priority: u32, kinds: Vec<ValueKind>) -> Self {
        self.property(name, priority, Shape::Tuple(kinds))
    }

    pub fn list(self, name: &str, priority: u32, kinds: Vec<ValueKind>) -> Self {
        self.property(name, priority, Shape::List(kinds))
    }

    pub fn map(self, name: &str, priority: u32, key: ValueKind, value: Vec<ValueKind>) -> Self {
        self.property(name, priority, Shape::Map { key, value })
    }

    pub fn nested(self, name: &str, priority: u32, schema: &str) -> Self {
        self.property(name, priority, Shape::Nested(schema.to_string()))
    }

    /// Fails when the same script name is declared twice.
    pub fn build(self) -> Result<ObjectSchema, SchemaError> {
        let mut index = HashMap::new();
        for (at, def) in self.properties.iter().enumerate() {
            if index.insert(def.name.to_ascii_lowercase(), at).is_some() {
                return Err(SchemaError::DuplicatePropertyDeclaration {
                    schema: self.name,
                    property: def.name.clone(),
                });
            }
        }
        Ok(ObjectSchema {
            name: self.name,
            properties: self.properties,
            index,
        })
    }
}

/// How a `.create` line names the new object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateRule {
    /// `<ref>.create <schema> <name>`; a lone argument is the name and the
    /// default schema is used.
    TypeThenName,
    /// `<ref>.create <name>`, always the default schema.
    NameOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceType {
    pub name: String,
    pub default_schema: String,
    pub rule: CreateRule,
}

impl ReferenceType {
    pub fn new(name: &str, default_schema: &str, rule: CreateRule) -> Self {
        ReferenceType {
            name: name.to_string(),
            default_schema: default_schema.to_string(),
            rule,
        }
    }

    /// Picks (schema, name) out of `.create` arguments.
    pub fn split_create_args<'a>(&'a self, args: &'a [String]) -> Result<(&'a str, &'a str), ScriptError> {
        let count_error = || ScriptError::InvalidArgumentCount {
            property: format!("{}.create", self.name),
            expected: match self.rule {
                CreateRule::TypeThenName => "1 or 2".to_string(),
                CreateRule::NameOnly => "1".to_string(),
            },
            found: args.len(),
        };
        match (self.rule, args) {
            (CreateRule::TypeThenName, [schema, name, ..]) => Ok((schema.as_str(), name.as_str())),
            (_, [name, ..]) => Ok((self.default_schema.as_str(), name.as_str())),
            _ => Err(count_error()),
        }
    }
}

/// Reference types and schema tables, keyed case-insensitively.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    references: HashMap<String, ReferenceType>,
    schemas: HashMap<String, Arc<ObjectSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_schema(&mut self, schema: ObjectSchema) -> Result<(), SchemaError> {
        let key = schema.name.to_ascii_lowercase();
        if self.schemas.contains_key(&key) {
            return Err(SchemaError::DuplicateSchema { name: schema.name });
        }
        self.schemas.insert(key, Arc::new(schema));
        Ok(())
    }

    pub fn register_reference(&mut self, reference: ReferenceType) -> Result<(), SchemaError> {
        let key = reference.name.to_ascii_lowercase();
        if self.references.contains_key(&key) {
            return Err(SchemaError::DuplicateReferenceType {
                name: reference.name,
            });
        }
        if self.schema(&reference.default_schema).is_none() {
            return Err(SchemaError::UnknownDefaultSchema {
                reference_type: reference.name,
                schema: reference.default_schema,
            });
        }
        self.references.insert(key, reference);
        Ok(())
    }

    /// Drops every registration.
    pub fn clear(&mut self) {
        self.references.clear();
        self.schemas.clear();
    }

    #[must_use]
    pub fn reference(&self, name: &str) -> Option<&ReferenceType> {
        self.references.get(&name.to_ascii_lowercase())
    }

    pub fn resolve_reference(&self, name: &str) -> Result<&ReferenceType, ScriptError> {
        self.reference(name)
            .ok_or_else(|| ScriptError::UndefinedReferenceType {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&Arc<ObjectSchema>> {
        self.schemas.get(&name.to_ascii_lowercase())
    }

    pub fn resolve_schema(&self, name: &str) -> Result<Arc<ObjectSchema>, ScriptError> {
        self.schema(name)
            .cloned()
            .ok_or_else(|| ScriptError::UnknownSchema {
                name: name.to_string(),
            })
    }

    /// The create-factory: builds the object a `.create` line describes.
    /// `reference_text` is the reference type as written in the script.
    pub fn create(
        &self,
        reference_text: &str,
        args: &[String],
        origin: Option<Origin>,
    ) -> Result<ConObject, ScriptError> {
        let reference = self.resolve_reference(reference_text)?;
        let (schema_name, name) = reference.split_create_args(args)?;
        let schema = self.resolve_schema(schema_name)?;
        Ok(ConObject::new(
            crate::value::unquote(name),
            &reference.name,
            reference_text,
            schema,
            args.to_vec(),
            origin,
        ))
    }

    /// A default instance named `name`, used when a scope creates objects
    /// on demand.
    pub fn create_default(&self, reference: &str, name: &str) -> Result<ConObject, ScriptError> {
        let reference = self.resolve_reference(reference)?;
        let schema = self.resolve_schema(&reference.default_schema)?;
        let args = match reference.rule {
            CreateRule::TypeThenName => vec![schema.name.clone(), name.to_string()],
            CreateRule::NameOnly => vec![name.to_string()],
        };
        Ok(ConObject::new(
            name,
            &reference.name,
            &reference.name,
            schema,
            args,
            None,
        ))
    }
}
