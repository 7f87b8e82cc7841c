use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::json_ext::ByteString;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// The type of a field or argument, in GraphQL terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Int,
    Float,
    String,
    Boolean,
    Id,
    /// A named type: a custom scalar, an enum, or a join type.
    Named(String),
    List(Box<FieldType>),
    NonNull(Box<FieldType>),
}

impl FieldType {
    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    pub fn non_null(inner: FieldType) -> Self {
        FieldType::NonNull(Box::new(inner))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::String => write!(f, "String"),
            FieldType::Boolean => write!(f, "Boolean"),
            FieldType::Id => write!(f, "ID"),
            FieldType::Named(name) => write!(f, "{name}"),
            FieldType::List(inner) => write!(f, "[{inner}]"),
            FieldType::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// A scalar attribute of a join type.
///
/// `metadata` belongs to the immediate-fetch adapter: it is where the
/// adapter finds how to read the field off a record, for instance
/// `{"column": "author_id"}`. The engine never looks inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    ty: FieldType,
    metadata: Object,
    args: IndexMap<ByteString, FieldType>,
}

impl Field {
    pub fn new(ty: FieldType) -> Self {
        Self {
            ty,
            metadata: Object::new(),
            args: IndexMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(ByteString::from(key), value.into());
        self
    }

    pub fn with_arg(mut self, name: &str, ty: FieldType) -> Self {
        self.args.insert(ByteString::from(name), ty);
        self
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn args(&self) -> &IndexMap<ByteString, FieldType> {
        &self.args
    }
}
