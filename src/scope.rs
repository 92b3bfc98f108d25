//! Scopes: which objects, active objects and expressions a piece of script
//! can see, and whether a child shares or copies what it takes from its
//! parent.

use crate::ast::{ExprId, Expression, ObjectId, ScopeId};
use crate::error::ScriptError;
use crate::object::ConObject;
use crate::schema::SchemaRegistry;
use crate::value::ExpressionLookup;
use crate::workspace::Workspace;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attachment {
    /// Shares the parent's tables; objects keep their identity.
    Attached,
    /// Owns its tables; objects taken from the parent are deep copies.
    #[default]
    Detached,
}

/// What `get` does when the scope has no object of that name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingObjectPolicy {
    CreateNew,
    CheckParent,
    #[default]
    ThrowError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub attachment: Attachment,
    pub policy: MissingObjectPolicy,
    pub parent: Option<ScopeId>,
    /// Also register new objects with the parent.
    pub propagate: bool,
    pub(crate) tables: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ScopeTables {
    pub(crate) objects: IndexMap<(String, String), ObjectId>,
    pub(crate) active: IndexMap<String, ObjectId>,
    pub(crate) expressions: IndexMap<String, ExprId>,
}

/// Outcome of a lenient registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added(ObjectId),
    /// The name was taken; the id is the instance already registered.
    Duplicate(ObjectId),
}

impl Registration {
    pub fn id(self) -> ObjectId {
        match self {
            Registration::Added(id) | Registration::Duplicate(id) => id,
        }
    }
}

fn object_key(name: &str, reference_type: &str) -> (String, String) {
    (name.to_ascii_lowercase(), reference_type.to_ascii_lowercase())
}

/// Expression resolution over borrowed workspace tables, so objects can be
/// mutated while their arguments are converted.
pub(crate) struct ScopedLookup<'a> {
    pub(crate) scopes: &'a [Scope],
    pub(crate) tables: &'a [ScopeTables],
    pub(crate) expressions: &'a [Expression],
    pub(crate) scope: ScopeId,
}

impl ScopedLookup<'_> {
    fn find(&self, name: &str) -> Option<ExprId> {
        let key = name.to_ascii_lowercase();
        let mut current = Some(self.scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if let Some(&found) = self.tables[scope.tables].expressions.get(&key) {
                return Some(found);
            }
            current = match scope.policy {
                MissingObjectPolicy::CheckParent => scope.parent,
                _ => None,
            };
        }
        None
    }
}

impl ExpressionLookup for ScopedLookup<'_> {
    fn lookup(&self, name: &str) -> Option<&Expression> {
        self.find(name).and_then(|id| self.expressions.get(id.0))
    }
}

impl Workspace {
    /// A scope with no parent.
    pub fn new_scope(&mut self, policy: MissingObjectPolicy) -> ScopeId {
        self.tables.push(ScopeTables::default());
        self.push_scope(Scope {
            attachment: Attachment::Detached,
            policy,
            parent: None,
            propagate: false,
            tables: self.tables.len() - 1,
        })
    }

    /// An Attached child shares every table with `parent`. A Detached child
    /// starts empty apart from a deep copy of the parent's active objects.
    pub fn new_child_scope(
        &mut self,
        parent: ScopeId,
        attachment: Attachment,
        policy: MissingObjectPolicy,
    ) -> ScopeId {
        let parent_tables = self.scopes[parent.0].tables;
        let tables = match attachment {
            Attachment::Attached => parent_tables,
            Attachment::Detached => {
                let snapshot: Vec<(String, ObjectId)> = self.tables[parent_tables]
                    .active
                    .iter()
                    .map(|(reference, id)| (reference.clone(), *id))
                    .collect();
                let mut table = ScopeTables::default();
                for (reference, id) in snapshot {
                    let copy = self.clone_object(id);
                    table.active.insert(reference, copy);
                }
                self.tables.push(table);
                self.tables.len() - 1
            }
        };
        self.push_scope(Scope {
            attachment,
            policy,
            parent: Some(parent),
            propagate: false,
            tables,
        })
    }

    fn push_scope(&mut self, scope: Scope) -> ScopeId {
        self.scopes.push(scope);
        ScopeId(self.scopes.len() - 1)
    }

    /// # Panics
    /// Panics if `id` did not come from this workspace.
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    fn tables_of(&self, scope: ScopeId) -> &ScopeTables {
        &self.tables[self.scopes[scope.0].tables]
    }

    fn tables_of_mut(&mut self, scope: ScopeId) -> &mut ScopeTables {
        let at = self.scopes[scope.0].tables;
        &mut self.tables[at]
    }

    pub(crate) fn clone_object(&mut self, id: ObjectId) -> ObjectId {
        let copy = self.objects[id.0].clone();
        self.insert_object(copy)
    }

    /// Looks only at the scope's own registry.
    pub fn find_object(&self, scope: ScopeId, name: &str, reference_type: &str) -> Option<ObjectId> {
        self.tables_of(scope)
            .objects
            .get(&object_key(name, reference_type))
            .copied()
    }

    /// Objects registered in the scope, in registration order.
    pub fn scope_objects(&self, scope: ScopeId) -> Vec<ObjectId> {
        self.tables_of(scope).objects.values().copied().collect()
    }

    /// Resolves an object, applying the scope's missing-object policy on a
    /// local miss.
    pub fn get_object(
        &mut self,
        registry: &SchemaRegistry,
        scope: ScopeId,
        name: &str,
        reference_type: &str,
    ) -> Result<ObjectId, ScriptError> {
        if let Some(found) = self.find_object(scope, name, reference_type) {
            return Ok(found);
        }

        let Scope {
            attachment,
            policy,
            parent,
            ..
        } = self.scopes[scope.0].clone();
        let missing = || ScriptError::MissingRequiredObject {
            name: name.to_string(),
            reference_type: reference_type.to_string(),
        };

        let local = match policy {
            MissingObjectPolicy::ThrowError => return Err(missing()),
            MissingObjectPolicy::CreateNew => {
                let object = registry.create_default(reference_type, name)?;
                log::trace!("creating default {reference_type} '{name}' on demand");
                self.insert_object(object)
            }
            MissingObjectPolicy::CheckParent => {
                let parent = parent.ok_or_else(missing)?;
                let found = self.get_object(registry, parent, name, reference_type)?;
                match attachment {
                    Attachment::Attached => found,
                    Attachment::Detached => self.clone_object(found),
                }
            }
        };
        self.tables_of_mut(scope)
            .objects
            .insert(object_key(name, reference_type), local);
        Ok(local)
    }

    /// Registers a new object. Fails if the scope already holds one with
    /// the same name and reference type.
    pub fn add_object(&mut self, scope: ScopeId, object: ConObject) -> Result<ObjectId, ScriptError> {
        let (name, reference_type) = (object.name.clone(), object.reference_type.clone());
        match self.register_object(scope, object) {
            Registration::Added(id) => Ok(id),
            Registration::Duplicate(_) => Err(ScriptError::DuplicateObject {
                name,
                reference_type,
            }),
        }
    }

    /// Registers a new object, keeping the existing instance on a name
    /// clash instead of failing.
    pub fn register_object(&mut self, scope: ScopeId, object: ConObject) -> Registration {
        if let Some(existing) = self.find_object(scope, &object.name, &object.reference_type) {
            return Registration::Duplicate(existing);
        }
        let id = self.insert_object(object);
        self.link_object(scope, id);
        Registration::Added(id)
    }

    fn link_object(&mut self, scope: ScopeId, id: ObjectId) {
        let key = {
            let object = &self.objects[id.0];
            object_key(&object.name, &object.reference_type)
        };
        let table = self.tables_of_mut(scope);
        if table.objects.contains_key(&key) {
            return;
        }
        table.objects.insert(key, id);

        let current = self.scopes[scope.0].clone();
        let Some(parent) = current.parent else {
            return;
        };
        if !current.propagate || self.scopes[parent.0].tables == current.tables {
            return;
        }
        let shared = match current.attachment {
            Attachment::Attached => id,
            Attachment::Detached => self.clone_object(id),
        };
        self.link_object(parent, shared);
    }

    pub fn set_active(&mut self, scope: ScopeId, reference_type: &str, object: ObjectId) {
        self.tables_of_mut(scope)
            .active
            .insert(reference_type.to_ascii_lowercase(), object);
    }

    pub fn active(&self, scope: ScopeId, reference_type: &str) -> Option<ObjectId> {
        self.tables_of(scope)
            .active
            .get(&reference_type.to_ascii_lowercase())
            .copied()
    }

    pub fn bind_expression(&mut self, scope: ScopeId, expression: ExprId) {
        let name = self.expressions[expression.0].name.to_ascii_lowercase();
        self.tables_of_mut(scope).expressions.insert(name, expression);
    }

    /// Finds a variable or constant visible from `scope`. A CheckParent
    /// scope falls back to its parent.
    pub fn lookup_expression(&self, scope: ScopeId, name: &str) -> Option<ExprId> {
        self.lookup(scope).find(name)
    }

    pub(crate) fn lookup(&self, scope: ScopeId) -> ScopedLookup<'_> {
        ScopedLookup {
            scopes: &self.scopes,
            tables: &self.tables,
            expressions: &self.expressions,
            scope,
        }
    }
}
