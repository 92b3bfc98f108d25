use crate::ast::Origin;
use crate::error::ScriptError;
use crate::schema::{ObjectSchema, PropertyDef, SchemaRegistry, Shape};
use crate::value::{convert_argument, convert_arguments, ExpressionLookup, Scalar, Value};
use indexmap::IndexMap;
use std::sync::Arc;

/// One stored occurrence of a property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    /// Map key; `None` for every other shape.
    pub key: Option<Value>,
    pub values: Vec<Value>,
    pub origin: Option<Origin>,
    pub comment: Option<String>,
}

impl PropertyEntry {
    pub fn new(values: Vec<Value>) -> Self {
        PropertyEntry {
            key: None,
            values,
            origin: None,
            comment: None,
        }
    }

    /// First stored value, for scalar-shaped properties.
    pub fn first(&self) -> Option<&Scalar> {
        self.values.first().map(|v| &v.data)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyData {
    Scalar(PropertyEntry),
    Tuple(PropertyEntry),
    List(Vec<PropertyEntry>),
    /// Keyed by the key's rendered text, in first-insertion order.
    Map(IndexMap<String, PropertyEntry>),
    Nested(Box<ConObject>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub priority: u32,
    pub data: PropertyData,
}

impl Property {
    /// Stored entries in output order. A nested object yields none.
    pub fn entries(&self) -> Vec<&PropertyEntry> {
        match &self.data {
            PropertyData::Scalar(entry) | PropertyData::Tuple(entry) => vec![entry],
            PropertyData::List(entries) => entries.iter().collect(),
            PropertyData::Map(entries) => entries.values().collect(),
            PropertyData::Nested(_) => Vec::new(),
        }
    }

    /// Removes one list entry or map entry by position.
    pub fn remove_entry(&mut self, index: usize) -> Option<PropertyEntry> {
        match &mut self.data {
            PropertyData::List(entries) if index < entries.len() => Some(entries.remove(index)),
            PropertyData::Map(entries) => entries.shift_remove_index(index).map(|(_, entry)| entry),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            PropertyData::List(entries) => entries.len(),
            PropertyData::Map(entries) => entries.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn nested(&self) -> Option<&ConObject> {
        match &self.data {
            PropertyData::Nested(object) => Some(object),
            _ => None,
        }
    }
}

/// A named instance of a registered reference type.
#[derive(Debug, Clone, PartialEq)]
pub struct ConObject {
    pub name: String,
    /// Canonical reference type name from the registry.
    pub reference_type: String,
    /// The reference type as written on the creating line.
    pub reference_text: String,
    pub schema: Arc<ObjectSchema>,
    /// Raw arguments of the `.create` line.
    pub create_args: Vec<String>,
    pub origin: Option<Origin>,
    pub comment: Option<String>,
    properties: Vec<Property>,
}

impl ConObject {
    pub fn new(
        name: impl Into<String>,
        reference_type: &str,
        reference_text: &str,
        schema: Arc<ObjectSchema>,
        create_args: Vec<String>,
        origin: Option<Origin>,
    ) -> Self {
        ConObject {
            name: name.into(),
            reference_type: reference_type.to_string(),
            reference_text: reference_text.to_string(),
            schema,
            create_args,
            origin,
            comment: None,
            properties: Vec::new(),
        }
    }

    /// Properties in the order they were first assigned.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Properties in output order: priority, then declaration position.
    pub fn ordered_properties(&self) -> Vec<&Property> {
        let mut ordered: Vec<&Property> = self.properties.iter().collect();
        ordered.sort_by_key(|p| (p.priority, self.schema.position(&p.name)));
        ordered
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// The first value of a property, following `outer.inner` paths.
    pub fn value(&self, path: &str) -> Option<&Scalar> {
        match path.split_once('.') {
            Some((head, tail)) => self.property(head)?.nested()?.value(tail),
            None => self.property(path)?.entries().first()?.first(),
        }
    }

    pub fn remove_property(&mut self, name: &str) -> Option<Property> {
        let at = self
            .properties
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))?;
        Some(self.properties.remove(at))
    }

    fn definition(&self, name: &str) -> Result<PropertyDef, ScriptError> {
        self.schema
            .property(name)
            .cloned()
            .ok_or_else(|| ScriptError::UnknownProperty {
                schema: self.schema.name.clone(),
                property: name.to_string(),
            })
    }

    fn slot(&mut self, def: &PropertyDef, registry: &SchemaRegistry) -> Result<&mut Property, ScriptError> {
        let found = self
            .properties
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(&def.name));
        let at = match found {
            Some(at) => at,
            None => {
                let data = match &def.shape {
                    Shape::Scalar(_) => PropertyData::Scalar(PropertyEntry::new(Vec::new())),
                    Shape::Tuple(_) => PropertyData::Tuple(PropertyEntry::new(Vec::new())),
                    Shape::List(_) => PropertyData::List(Vec::new()),
                    Shape::Map { .. } => PropertyData::Map(IndexMap::new()),
                    Shape::Nested(schema) => {
                        let schema = registry.resolve_schema(schema)?;
                        PropertyData::Nested(Box::new(ConObject::new(
                            def.name.clone(),
                            &self.reference_type,
                            &self.reference_text,
                            schema,
                            Vec::new(),
                            self.origin,
                        )))
                    }
                };
                self.properties.push(Property {
                    name: def.name.clone(),
                    priority: def.priority,
                    data,
                });
                self.properties.len() - 1
            }
        };
        Ok(&mut self.properties[at])
    }

    /// The property parser. Finds (or creates) the container `property`
    /// names and stores the converted arguments in it. `outer.inner` names,
    /// and nested properties given the inner name as first argument, are
    /// handed on to the nested object.
    pub fn assign(
        &mut self,
        registry: &SchemaRegistry,
        property: &str,
        args: &[String],
        lookup: &dyn ExpressionLookup,
        origin: Option<Origin>,
        comment: Option<String>,
    ) -> Result<(), ScriptError> {
        let (head, tail) = match property.split_once('.') {
            Some((head, tail)) => (head, Some(tail)),
            None => (property, None),
        };
        let def = self.definition(head)?;

        if let Shape::Nested(_) = def.shape {
            let slot = self.slot(&def, registry)?;
            let PropertyData::Nested(nested) = &mut slot.data else {
                return Err(ScriptError::UnknownProperty {
                    schema: slot.name.clone(),
                    property: property.to_string(),
                });
            };
            return match (tail, args.split_first()) {
                (Some(tail), _) => nested.assign(registry, tail, args, lookup, origin, comment),
                (None, Some((inner, rest))) => nested.assign(registry, inner, rest, lookup, origin, comment),
                (None, None) => Err(ScriptError::InvalidArgumentCount {
                    property: def.name.clone(),
                    expected: "at least 1".to_string(),
                    found: 0,
                }),
            };
        }

        if let Some(tail) = tail {
            return Err(ScriptError::UnknownProperty {
                schema: self.schema.name.clone(),
                property: format!("{}.{tail}", def.name),
            });
        }

        let entry = match &def.shape {
            Shape::Map { key, value } => {
                let (key_arg, rest) = args.split_first().ok_or_else(|| ScriptError::InvalidArgumentCount {
                    property: def.name.clone(),
                    expected: (value.len() + 1).to_string(),
                    found: 0,
                })?;
                let key = convert_argument(key_arg, key, lookup)?;
                let values = convert_arguments(&def.name, value, rest, lookup)?;
                PropertyEntry {
                    key: Some(key),
                    values,
                    origin,
                    comment,
                }
            }
            shape => PropertyEntry {
                key: None,
                values: convert_arguments(&def.name, shape.value_kinds(), args, lookup)?,
                origin,
                comment,
            },
        };

        let slot = self.slot(&def, registry)?;
        store(&mut slot.data, entry);
        Ok(())
    }
}

fn store(data: &mut PropertyData, entry: PropertyEntry) {
    match data {
        PropertyData::Scalar(current) | PropertyData::Tuple(current) => *current = entry,
        PropertyData::List(entries) => entries.push(entry),
        PropertyData::Map(entries) => {
            let key = entry
                .key
                .as_ref()
                .map(|k| k.data.render(crate::value::DEFAULT_FLOAT_PRECISION).join(" ").to_ascii_lowercase())
                .unwrap_or_default();
            // IndexMap keeps the slot of an existing key.
            entries.insert(key, entry);
        }
        PropertyData::Nested(_) => {}
    }
}
