use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use super::Field;
use super::FieldDefinition;
use super::Relationship;
use crate::context::Context;
use crate::error::BoxError;
use crate::json_ext::ByteString;
use crate::json_ext::Object;
use crate::request::Request;

/// Fetches the scalar fields of many rows of one type in a single call.
#[async_trait]
pub trait FetchImmediates<S>: Send + Sync {
    /// Returns one object per row reachable through `select`.
    ///
    /// Each object must hold a value under the key of every selection in
    /// `request`, including the join fields the engine added. Rows are
    /// returned as the adapter produced them: the engine neither dedupes nor
    /// reorders them.
    async fn fetch_immediates(
        &self,
        request: &ImmediatesRequest<'_>,
        select: &S,
    ) -> Result<Vec<Object>, BoxError>;
}

/// One scalar field the immediate fetch must put on every row.
#[derive(Debug, Clone, Copy)]
pub struct ImmediateSelection<'a> {
    /// Where the value goes on the row.
    pub key: &'a ByteString,
    pub field_name: &'a ByteString,
    pub field: &'a Field,
    pub request: &'a Request,
}

/// The flat request handed to an immediate-fetch adapter.
#[derive(Debug)]
pub struct ImmediatesRequest<'a> {
    pub(crate) type_name: &'a str,
    pub(crate) request: &'a Request,
    pub(crate) selections: Vec<ImmediateSelection<'a>>,
}

impl<'a> ImmediatesRequest<'a> {
    pub fn type_name(&self) -> &str {
        self.type_name
    }

    pub fn selections(&self) -> &[ImmediateSelection<'a>] {
        &self.selections
    }

    /// The arguments of the field that reached this type.
    pub fn request(&self) -> &Request {
        self.request
    }

    pub fn context(&self) -> &Context {
        self.request.context()
    }
}

pub(crate) enum Immediates<S> {
    /// The root type: a single empty row.
    Root,
    Adapter(Arc<dyn FetchImmediates<S>>),
}

/// A named type: its fields, its relationships and how to fetch its rows.
pub struct JoinType<S> {
    pub(crate) name: ByteString,
    pub(crate) fields: IndexMap<ByteString, FieldDefinition<S>>,
    pub(crate) immediates: Immediates<S>,
    pub(crate) duplicates: Vec<ByteString>,
}

impl<S> JoinType<S> {
    pub fn new<A>(name: impl Into<ByteString>, adapter: Arc<A>) -> Self
    where
        A: FetchImmediates<S> + 'static,
    {
        Self::with_immediates(name, Immediates::Adapter(adapter))
    }

    /// The entry point type. It has no scalar fields, only relationships,
    /// and always resolves to a single row.
    pub fn root(name: impl Into<ByteString>) -> Self {
        Self::with_immediates(name, Immediates::Root)
    }

    fn with_immediates(name: impl Into<ByteString>, immediates: Immediates<S>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            immediates,
            duplicates: Vec::new(),
        }
    }

    pub fn field(self, name: &str, field: Field) -> Self {
        self.define(name, FieldDefinition::Field(field))
    }

    pub fn relationship(self, name: &str, relationship: Relationship<S>) -> Self {
        self.define(name, FieldDefinition::Relationship(relationship))
    }

    fn define(mut self, name: &str, definition: FieldDefinition<S>) -> Self {
        let name = ByteString::from(name);
        if self.fields.contains_key(&name) {
            self.duplicates.push(name.clone());
        }
        self.fields.insert(name, definition);
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn is_root(&self) -> bool {
        matches!(self.immediates, Immediates::Root)
    }

    pub fn fields(&self) -> &IndexMap<ByteString, FieldDefinition<S>> {
        &self.fields
    }

    pub fn get(&self, field_name: &str) -> Option<&FieldDefinition<S>> {
        self.fields.get(field_name)
    }
}

impl<S> fmt::Debug for JoinType<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinType")
            .field("name", &self.name)
            .field("root", &self.is_root())
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
