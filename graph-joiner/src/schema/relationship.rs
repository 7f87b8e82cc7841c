use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::FieldType;
use crate::error::BoxError;
use crate::json_ext::ByteString;
use crate::request::Request;

/// Computes the select handle of a relationship's target from the
/// relationship's request and the parent's handle.
///
/// The returned handle must describe every target row reachable from any
/// parent row, for example a SQL query joined against the parent's query.
/// `parent` is `None` for relationships of the root type.
pub trait Select<S>: Send + Sync {
    fn select(&self, request: &Request, parent: Option<&S>) -> Result<S, BoxError>;
}

impl<S, F> Select<S> for F
where
    F: Fn(&Request, Option<&S>) -> Result<S, BoxError> + Send + Sync,
{
    fn select(&self, request: &Request, parent: Option<&S>) -> Result<S, BoxError> {
        self(request, parent)
    }
}

/// How many children a parent row may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one: no match resolves to null, several are an error.
    Single,
    /// Any number, in the order the target returned them.
    Many,
}

/// A declared link from one join type to another.
pub struct Relationship<S> {
    pub(crate) target: ByteString,
    pub(crate) cardinality: Cardinality,
    /// Parent field to child field, in key order.
    pub(crate) join: Vec<(ByteString, ByteString)>,
    pub(crate) args: IndexMap<ByteString, FieldType>,
    pub(crate) extract: Option<ByteString>,
    pub(crate) select: Arc<dyn Select<S>>,
}

impl<S> Relationship<S> {
    pub fn new(
        target: impl Into<ByteString>,
        cardinality: Cardinality,
        select: Arc<dyn Select<S>>,
    ) -> Self {
        Self {
            target: target.into(),
            cardinality,
            join: Vec::new(),
            args: IndexMap::new(),
            extract: None,
            select,
        }
    }

    /// A to-one relationship to `target`.
    pub fn single<F>(target: impl Into<ByteString>, select: F) -> Self
    where
        F: Fn(&Request, Option<&S>) -> Result<S, BoxError> + Send + Sync + 'static,
        S: 'static,
    {
        Self::new(target, Cardinality::Single, Arc::new(select))
    }

    /// A to-many relationship to `target`.
    pub fn many<F>(target: impl Into<ByteString>, select: F) -> Self
    where
        F: Fn(&Request, Option<&S>) -> Result<S, BoxError> + Send + Sync + 'static,
        S: 'static,
    {
        Self::new(target, Cardinality::Many, Arc::new(select))
    }

    /// Correlates `parent_field` on the declaring type with `child_field`
    /// on the target. A relationship without join pairs matches every
    /// parent with every child.
    pub fn join(mut self, parent_field: &str, child_field: &str) -> Self {
        self.join
            .push((ByteString::from(parent_field), ByteString::from(child_field)));
        self
    }

    /// Declares an argument the relationship accepts.
    pub fn arg(mut self, name: &str, ty: FieldType) -> Self {
        self.args.insert(ByteString::from(name), ty);
        self
    }

    /// A copy of this relationship that resolves to the value of `field` on
    /// each child instead of the child object itself.
    pub fn extract(&self, field: &str) -> Self {
        Self {
            extract: Some(ByteString::from(field)),
            ..self.clone()
        }
    }

    pub fn target(&self) -> &str {
        self.target.as_str()
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn args(&self) -> &IndexMap<ByteString, FieldType> {
        &self.args
    }

    pub fn extracted_field(&self) -> Option<&str> {
        self.extract.as_ref().map(|field| field.as_str())
    }

    pub(crate) fn parent_join_fields(&self) -> impl Iterator<Item = &ByteString> {
        self.join.iter().map(|(parent, _)| parent)
    }

    pub(crate) fn child_join_fields(&self) -> impl Iterator<Item = &ByteString> {
        self.join.iter().map(|(_, child)| child)
    }

    /// The type this relationship exposes, with its cardinality applied.
    pub(crate) fn field_type(&self) -> FieldType {
        let target = FieldType::Named(self.target.as_str().to_string());
        match self.cardinality {
            Cardinality::Single => target,
            Cardinality::Many => FieldType::non_null(FieldType::list(FieldType::non_null(target))),
        }
    }
}

impl<S> Clone for Relationship<S> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            cardinality: self.cardinality,
            join: self.join.clone(),
            args: self.args.clone(),
            extract: self.extract.clone(),
            select: self.select.clone(),
        }
    }
}

impl<S> fmt::Debug for Relationship<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relationship")
            .field("target", &self.target)
            .field("cardinality", &self.cardinality)
            .field("join", &self.join)
            .field("args", &self.args)
            .field("extract", &self.extract)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn books() -> Relationship<()> {
        Relationship::many("Book", |_: &Request, _: Option<&()>| Ok(()))
            .join("id", "authorId")
            .arg("genre", FieldType::String)
    }

    #[test]
    fn extract_copies_the_declaration() {
        let relationship = books();
        let titles = relationship.extract("title");

        assert_eq!(relationship.extracted_field(), None);
        assert_eq!(titles.extracted_field(), Some("title"));
        assert_eq!(titles.target(), "Book");
        assert_eq!(titles.args().len(), 1);
        assert_eq!(
            titles.child_join_fields().collect::<Vec<_>>(),
            [&ByteString::from("authorId")]
        );
    }

    #[test]
    fn exposed_type_follows_cardinality() {
        assert_eq!(books().field_type().to_string(), "[Book!]!");
        let author = Relationship::single("Author", |_: &Request, _: Option<&()>| Ok(()));
        assert_eq!(author.field_type().to_string(), "Author");
    }
}
