//! Schema declarations: join types, their fields and their relationships.
use std::fmt;
use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::error::SchemaError;
use crate::json_ext::ByteString;

mod field;
mod join_type;
mod relationship;

pub use field::Field;
pub use field::FieldType;
pub(crate) use join_type::Immediates;
pub use join_type::FetchImmediates;
pub use join_type::ImmediateSelection;
pub use join_type::ImmediatesRequest;
pub use join_type::JoinType;
pub use relationship::Cardinality;
pub use relationship::Relationship;
pub use relationship::Select;

/// A field of a join type.
pub enum FieldDefinition<S> {
    /// A scalar read off the type's own rows.
    Field(Field),
    /// A link to another type.
    Relationship(Relationship<S>),
}

impl<S> FieldDefinition<S> {
    pub fn as_field(&self) -> Option<&Field> {
        match self {
            FieldDefinition::Field(field) => Some(field),
            FieldDefinition::Relationship(_) => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship<S>> {
        match self {
            FieldDefinition::Field(_) => None,
            FieldDefinition::Relationship(relationship) => Some(relationship),
        }
    }
}

impl<S> fmt::Debug for FieldDefinition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefinition::Field(field) => f.debug_tuple("Field").field(field).finish(),
            FieldDefinition::Relationship(relationship) => {
                f.debug_tuple("Relationship").field(relationship).finish()
            }
        }
    }
}

/// A checked set of join types with one root.
///
/// Relationships name their target by type name, which is how types refer
/// to each other (and to themselves) without owning each other.
pub struct Schema<S> {
    types: IndexMap<ByteString, JoinType<S>>,
    root: ByteString,
}

impl<S> Schema<S> {
    pub fn builder() -> SchemaBuilder<S> {
        SchemaBuilder::default()
    }

    pub fn root(&self) -> &JoinType<S> {
        &self.types[&self.root]
    }

    pub fn get(&self, type_name: &str) -> Option<&JoinType<S>> {
        self.types.get(type_name)
    }

    pub fn types(&self) -> impl Iterator<Item = &JoinType<S>> {
        self.types.values()
    }

    pub(crate) fn target(
        &self,
        relationship: &Relationship<S>,
    ) -> Result<&JoinType<S>, SchemaError> {
        self.get(relationship.target())
            .ok_or_else(|| SchemaError::UnknownType(relationship.target().to_string()))
    }

    /// The schema in GraphQL SDL, root type first.
    pub fn to_sdl(&self) -> String {
        let mut sdl = String::new();
        for join_type in self.types() {
            if !sdl.is_empty() {
                sdl.push('\n');
            }
            let _ = writeln!(sdl, "type {} {{", join_type.name());
            for (name, definition) in join_type.fields() {
                let (args, ty) = match definition {
                    FieldDefinition::Field(field) => (field.args(), field.ty().clone()),
                    FieldDefinition::Relationship(relationship) => {
                        (relationship.args(), relationship.field_type())
                    }
                };
                let _ = write!(sdl, "  {}", name.as_str());
                if !args.is_empty() {
                    let args: Vec<String> = args
                        .iter()
                        .map(|(name, ty)| format!("{}: {ty}", name.as_str()))
                        .collect();
                    let _ = write!(sdl, "({})", args.join(", "));
                }
                let _ = writeln!(sdl, ": {ty}");
            }
            sdl.push_str("}\n");
        }
        sdl
    }
}

impl<S> fmt::Debug for Schema<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("root", &self.root)
            .field("types", &self.types)
            .finish()
    }
}

/// Collects join types, then checks them as a whole.
pub struct SchemaBuilder<S> {
    root: Option<JoinType<S>>,
    types: Vec<JoinType<S>>,
}

impl<S> Default for SchemaBuilder<S> {
    fn default() -> Self {
        Self {
            root: None,
            types: Vec::new(),
        }
    }
}

impl<S> SchemaBuilder<S> {
    pub fn root(mut self, root: JoinType<S>) -> Self {
        self.root = Some(root);
        self
    }

    pub fn join_type(mut self, join_type: JoinType<S>) -> Self {
        self.types.push(join_type);
        self
    }

    pub fn build(self) -> Result<Schema<S>, SchemaError> {
        let root = self.root.ok_or(SchemaError::MissingRoot)?;
        let root_name = root.name.clone();

        let mut types = IndexMap::new();
        for join_type in std::iter::once(root).chain(self.types) {
            if types.contains_key(&join_type.name) {
                return Err(SchemaError::DuplicateType(join_type.name().to_string()));
            }
            types.insert(join_type.name.clone(), join_type);
        }
        let schema = Schema {
            types,
            root: root_name,
        };

        for join_type in schema.types() {
            if let Some(field) = join_type.duplicates.first() {
                return Err(SchemaError::DuplicateField {
                    type_name: join_type.name().to_string(),
                    field: field.as_str().to_string(),
                });
            }
            for (name, definition) in join_type.fields() {
                match definition {
                    FieldDefinition::Field(_) if join_type.is_root() => {
                        return Err(SchemaError::RootField {
                            type_name: join_type.name().to_string(),
                            field: name.as_str().to_string(),
                        });
                    }
                    FieldDefinition::Field(_) => {}
                    FieldDefinition::Relationship(relationship) => {
                        schema.check_relationship(join_type, name, relationship)?
                    }
                }
            }
        }
        Ok(schema)
    }
}

impl<S> Schema<S> {
    fn check_relationship(
        &self,
        join_type: &JoinType<S>,
        name: &ByteString,
        relationship: &Relationship<S>,
    ) -> Result<(), SchemaError> {
        let target = self.target(relationship)?;
        let invalid_join = |field: &ByteString, on_type: &JoinType<S>| {
            SchemaError::InvalidJoinField {
                type_name: join_type.name().to_string(),
                relationship: name.as_str().to_string(),
                field: field.as_str().to_string(),
                on_type: on_type.name().to_string(),
            }
        };
        for field in relationship.parent_join_fields() {
            let declared = join_type.get(field.as_str());
            if declared.and_then(FieldDefinition::as_field).is_none() {
                return Err(invalid_join(field, join_type));
            }
        }
        for field in relationship.child_join_fields() {
            let declared = target.get(field.as_str());
            if declared.and_then(FieldDefinition::as_field).is_none() {
                return Err(invalid_join(field, target));
            }
        }
        if let Some(extract) = &relationship.extract {
            if target.get(extract.as_str()).is_none() {
                return Err(SchemaError::InvalidExtractField {
                    type_name: join_type.name().to_string(),
                    relationship: name.as_str().to_string(),
                    field: extract.as_str().to_string(),
                    on_type: target.name().to_string(),
                });
            }
        }
        Ok(())
    }
}
