//! Per-field resolvers for presenting join types through a GraphQL server.
//!
//! Resolution is driven from the root: a root relationship fetches its whole
//! subtree in one pass and every field below it only reads what that pass
//! already put on its row.
use crate::error::JoinError;
use crate::error::SchemaError;
use crate::execution::ExecutionParameters;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::request::Request;
use crate::schema::FieldDefinition;
use crate::schema::JoinType;
use crate::schema::Relationship;

/// How one field of a join type is resolved.
pub enum FieldResolver<'a, S> {
    /// Reads the response key off the already resolved parent row.
    Read,
    /// Fetches a root relationship and its whole subtree.
    Fetch {
        type_name: &'a str,
        relationship: &'a Relationship<S>,
    },
}

impl<S> JoinType<S> {
    /// The resolver of the declared field `field_name`.
    pub fn resolver(&self, field_name: &str) -> Result<FieldResolver<'_, S>, SchemaError> {
        match self.get(field_name) {
            Some(FieldDefinition::Relationship(relationship)) if self.is_root() => {
                Ok(FieldResolver::Fetch {
                    type_name: self.name(),
                    relationship,
                })
            }
            Some(_) => Ok(FieldResolver::Read),
            None => Err(SchemaError::UnknownField {
                type_name: self.name().to_string(),
                field: field_name.to_string(),
            }),
        }
    }
}

impl<S> FieldResolver<'_, S>
where
    S: Send + Sync + 'static,
{
    /// Resolves the field selected by `request` under the response key
    /// `key`. `source` is the parent row; it is ignored by root fetches.
    pub async fn resolve(
        &self,
        parameters: &ExecutionParameters<'_, S>,
        source: &Object,
        key: &str,
        request: &Request,
    ) -> Result<Value, JoinError> {
        match self {
            FieldResolver::Read => Ok(source.get(key).cloned().unwrap_or(Value::Null)),
            FieldResolver::Fetch {
                type_name,
                relationship,
            } => {
                relationship
                    .fetch(parameters, type_name, request, None)
                    .await?
                    .get_root()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::configuration::Configuration;
    use crate::schema::FieldType;
    use crate::schema::Schema;
    use crate::test_harness::MemoryTable;
    use crate::test_harness::Records;
    use crate::test_harness::attribute;

    fn schema(authors: &std::sync::Arc<MemoryTable>) -> Schema<Records> {
        Schema::builder()
            .root(JoinType::root("Query").relationship(
                "author",
                Relationship::single("Author", authors.select_by_argument("id", "id"))
                    .arg("id", FieldType::Int),
            ))
            .join_type(
                JoinType::new("Author", authors.clone())
                    .field("id", attribute(FieldType::Int, "id"))
                    .field("name", attribute(FieldType::String, "name")),
            )
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn root_fields_fetch_and_nested_fields_read() {
        let authors = MemoryTable::from_json(
            "Author",
            json!([
                { "id": 1, "name": "PG Wodehouse" },
                { "id": 2, "name": "Joseph Heller" }
            ]),
        );
        let schema = schema(&authors);
        let configuration = Configuration::default();
        let parameters = ExecutionParameters::new(&schema, &configuration);

        let request = Request::new("author")
            .with_arg("id", json!(2))
            .with_field("name");
        let resolver = schema.root().resolver("author").unwrap();
        let author = resolver
            .resolve(&parameters, &Object::new(), "author", &request)
            .await
            .unwrap();
        assert_eq!(author, json!({ "name": "Joseph Heller" }));
        assert_eq!(authors.fetches(), 1);

        let author = author.as_object().cloned().unwrap_or_default();
        let name = schema
            .get("Author")
            .unwrap()
            .resolver("name")
            .unwrap()
            .resolve(&parameters, &author, "name", &Request::new("name"))
            .await
            .unwrap();
        assert_eq!(name, json!("Joseph Heller"));
        assert_eq!(authors.fetches(), 1);

        assert!(matches!(
            schema.root().resolver("book"),
            Err(SchemaError::UnknownField { .. })
        ));
    }
}
