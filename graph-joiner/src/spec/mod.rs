//! GraphQL documents to request trees.
//!
//! Documents are parsed, not validated: there is no GraphQL schema to
//! validate them against. Unknown fields and arguments are caught later, by
//! the join types the request is resolved against.
use std::collections::HashMap;

use apollo_compiler::ast;
use displaydoc::Display;
use thiserror::Error;
use tracing::instrument;

use crate::configuration::Configuration;
use crate::context::Context;
use crate::error::ErrorExtension;
use crate::json_ext::ByteString;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::request::Request;

mod selection;

/// GraphQL parsing errors.
#[derive(Error, Debug, Display, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SpecError {
    /// parsing error: {0}
    ParsingError(String),
    /// selection processing recursion limit exceeded
    RecursionLimitExceeded,
    /// Unknown operation named "{0}"
    UnknownOperation(String),
    /// the document contains no operation
    NoOperation,
    /// Unknown fragment "{0}"
    UnknownFragment(String),
    /// fields '{first}' and '{second}' conflict because they share the response key '{key}'
    FieldConflict {
        key: String,
        first: String,
        second: String,
    },
    /// fields sharing the response key '{key}' select '{field}' with different arguments
    ArgumentConflict { key: String, field: String },
    /// subscription operation is not supported
    SubscriptionNotSupported,
}

impl ErrorExtension for SpecError {
    fn extension_code(&self) -> String {
        match self {
            SpecError::ParsingError(_) => "PARSING_ERROR",
            SpecError::RecursionLimitExceeded => "RECURSION_LIMIT_EXCEEDED",
            SpecError::UnknownOperation(_)
            | SpecError::NoOperation
            | SpecError::UnknownFragment(_)
            | SpecError::FieldConflict { .. }
            | SpecError::ArgumentConflict { .. } => "GRAPHQL_VALIDATION_FAILED",
            SpecError::SubscriptionNotSupported => "SUBSCRIPTION_NOT_SUPPORTED",
        }
        .to_string()
    }
}

/// Name of the root request when the operation is anonymous.
const ANONYMOUS_OPERATION: &str = "query";

/// Fragment definitions of a document, by name.
pub(crate) type Fragments<'a> = HashMap<&'a str, &'a ast::FragmentDefinition>;

/// Parses `query` and translates the selected operation into a request tree
/// carrying `context` on every node.
#[instrument(skip_all, level = "debug")]
pub fn parse(
    query: &str,
    operation_name: Option<&str>,
    variables: &Object,
    context: &Context,
    configuration: &Configuration,
) -> Result<Request, SpecError> {
    let document = ast::Document::parse(query, "query.graphql")
        .map_err(|invalid| SpecError::ParsingError(invalid.errors.to_string()))?;

    let mut operations = Vec::new();
    let mut fragments = Fragments::new();
    for definition in &document.definitions {
        match definition {
            ast::Definition::OperationDefinition(operation) => operations.push(operation),
            ast::Definition::FragmentDefinition(fragment) => {
                fragments.insert(fragment.name.as_str(), &**fragment);
            }
            _ => {}
        }
    }

    let operation = match operation_name {
        Some(name) => operations
            .into_iter()
            .find(|operation| {
                operation
                    .name
                    .as_ref()
                    .is_some_and(|operation_name| operation_name.as_str() == name)
            })
            .ok_or_else(|| SpecError::UnknownOperation(name.to_string()))?,
        None => operations.into_iter().next().ok_or(SpecError::NoOperation)?,
    };
    if matches!(operation.operation_type, ast::OperationType::Subscription) {
        return Err(SpecError::SubscriptionNotSupported);
    }

    let variables = resolve_variables(operation, variables);
    let name = operation
        .name
        .as_ref()
        .map(|name| name.as_str())
        .unwrap_or(ANONYMOUS_OPERATION);
    let mut root = Request::new(name);
    selection::collect(
        &operation.selection_set,
        &mut root.children,
        &selection::Parameters {
            variables: &variables,
            fragments: &fragments,
            max_depth: configuration.max_depth(),
        },
        0,
    )?;
    Ok(root.with_context(context.clone()))
}

/// Provided values win, then declared defaults, then null.
fn resolve_variables(operation: &ast::OperationDefinition, provided: &Object) -> Object {
    let mut variables = provided.clone();
    for definition in &operation.variables {
        let name = definition.name.as_str();
        if variables.contains_key(name) {
            continue;
        }
        let value = definition
            .default_value
            .as_ref()
            .map(|value| to_json(value, &Object::new()))
            .unwrap_or(Value::Null);
        variables.insert(ByteString::from(name), value);
    }
    variables
}

/// Converts a GraphQL literal, substituting variables.
pub(crate) fn to_json(value: &ast::Value, variables: &Object) -> Value {
    match value {
        ast::Value::Null => Value::Null,
        ast::Value::Enum(name) => Value::String(name.as_str().into()),
        ast::Value::Variable(name) => variables
            .get(name.as_str())
            .cloned()
            .unwrap_or(Value::Null),
        ast::Value::String(value) => Value::String(value.as_str().into()),
        ast::Value::Int(value) => match value.as_str().parse::<i64>() {
            Ok(int) => Value::Number(int.into()),
            // Too large for an i64: keep the precision a float allows
            Err(_) => float(value.as_str()),
        },
        ast::Value::Float(value) => float(value.as_str()),
        ast::Value::Boolean(value) => Value::Bool(*value),
        ast::Value::List(values) => Value::Array(
            values
                .iter()
                .map(|value| to_json(value, variables))
                .collect(),
        ),
        ast::Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, value)| {
                    (ByteString::from(name.as_str()), to_json(value, variables))
                })
                .collect(),
        ),
    }
}

fn float(literal: &str) -> Value {
    literal
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use insta::assert_yaml_snapshot;
    use serde_json_bytes::json;

    use super::*;

    fn parse_query(query: &str) -> Result<Request, SpecError> {
        parse(
            query,
            None,
            &Object::new(),
            &Context::new(),
            &Configuration::default(),
        )
    }

    fn with_variables(query: &str, variables: serde_json_bytes::Value) -> Request {
        let variables = match variables {
            Value::Object(variables) => variables,
            _ => Object::new(),
        };
        parse(
            query,
            None,
            &variables,
            &Context::new(),
            &Configuration::default(),
        )
        .unwrap()
    }

    #[test]
    fn nested_selections_become_children() {
        let request = parse_query(
            r#"{ books(genre: "comedy") { title author { name } } }"#,
        )
        .unwrap();
        assert_yaml_snapshot!(request, @r###"
        fieldName: query
        children:
          books:
            fieldName: books
            args:
              genre: comedy
            children:
              title:
                fieldName: title
              author:
                fieldName: author
                children:
                  name:
                    fieldName: name
        "###);
    }

    #[test]
    fn aliases_key_the_response() {
        let request = parse_query(
            "query Authors { wodehouse: author(id: 1) { name } heller: author(id: 2) { name } }",
        )
        .unwrap();
        assert_eq!(request.field_name(), "Authors");
        let heller = request.child("heller").unwrap();
        assert_eq!(heller.field_name(), "author");
        assert_eq!(heller.arg("id"), Some(&json!(2)));
    }

    #[test]
    fn variables_fall_back_to_defaults_then_null() {
        let request = with_variables(
            r#"query($id: Int, $genre: String = "comedy", $limit: Int) {
                author(id: $id) { books(genre: $genre, limit: $limit) { title } }
            }"#,
            json!({ "id": 2 }),
        );
        let author = request.child("author").unwrap();
        assert_eq!(author.arg("id"), Some(&json!(2)));
        let books = author.child("books").unwrap();
        assert_eq!(books.arg("genre"), Some(&json!("comedy")));
        assert_eq!(books.arg("limit"), Some(&Value::Null));
    }

    #[test]
    fn literal_values_convert_to_json() {
        let request = parse_query(
            r#"{ books(filter: { ids: [1, 2], ratio: 0.5, status: PUBLISHED, flag: false, none: null }) { title } }"#,
        )
        .unwrap();
        assert_eq!(
            request.child("books").unwrap().arg("filter"),
            Some(&json!({
                "ids": [1, 2],
                "ratio": 0.5,
                "status": "PUBLISHED",
                "flag": false,
                "none": null
            }))
        );
    }

    #[test]
    fn fragments_are_flattened_and_merged() {
        let request = parse_query(
            r#"
            query {
                books {
                    ...BookTitle
                    ... on Book { id title }
                    author { name }
                    author { id }
                }
            }
            fragment BookTitle on Book { title }
            "#,
        )
        .unwrap();
        let books = request.child("books").unwrap();
        let keys: Vec<_> = books.requested_keys().map(|key| key.as_str()).collect();
        assert_eq!(keys, ["title", "id", "author"]);
        let author = books.child("author").unwrap();
        let keys: Vec<_> = author.requested_keys().map(|key| key.as_str()).collect();
        assert_eq!(keys, ["name", "id"]);
    }

    #[test]
    fn skip_and_include_honour_variables() {
        let query = r#"query($withTitle: Boolean!) {
            books {
                id @skip(if: true)
                title @include(if: $withTitle)
                genre @include(if: true) @skip(if: $withTitle)
            }
        }"#;
        let request = with_variables(query, json!({ "withTitle": true }));
        let keys: Vec<_> = request
            .child("books")
            .unwrap()
            .requested_keys()
            .map(|key| key.as_str().to_string())
            .collect();
        assert_eq!(keys, ["title"]);

        let request = with_variables(query, json!({ "withTitle": false }));
        let keys: Vec<_> = request
            .child("books")
            .unwrap()
            .requested_keys()
            .map(|key| key.as_str().to_string())
            .collect();
        assert_eq!(keys, ["genre"]);
    }

    #[test]
    fn operations_are_selected_by_name() {
        let query = "query First { authors { name } } query Second { books { title } }";
        let request = parse(
            query,
            Some("Second"),
            &Object::new(),
            &Context::new(),
            &Configuration::default(),
        )
        .unwrap();
        assert!(request.child("books").is_some());

        let err = parse(
            query,
            Some("Third"),
            &Object::new(),
            &Context::new(),
            &Configuration::default(),
        )
        .unwrap_err();
        assert_eq!(err, SpecError::UnknownOperation("Third".to_string()));

        let err = parse_query("fragment F on Book { title }").unwrap_err();
        assert_eq!(err, SpecError::NoOperation);

        let err = parse_query("subscription { books { title } }").unwrap_err();
        assert_eq!(err, SpecError::SubscriptionNotSupported);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        let err = parse_query("{ books { title }").unwrap_err();
        assert!(matches!(err, SpecError::ParsingError(_)));
        assert_eq!(err.extension_code(), "PARSING_ERROR");

        let err = parse_query("{ books { ...Missing } }").unwrap_err();
        assert_eq!(err, SpecError::UnknownFragment("Missing".to_string()));

        let err = parse_query("{ books { title: id title } }").unwrap_err();
        assert_eq!(
            err.to_string(),
            "fields 'id' and 'title' conflict because they share the response key 'title'"
        );

        let err = parse_query("{ author(id: 1) { name } author(id: 2) { name } }").unwrap_err();
        assert_eq!(
            err,
            SpecError::ArgumentConflict {
                key: "author".to_string(),
                field: "author".to_string(),
            }
        );
        assert_eq!(err.extension_code(), "GRAPHQL_VALIDATION_FAILED");
        let err = parse_query("{ books { author { id } author(id: 2) { name } } }").unwrap_err();
        assert!(matches!(err, SpecError::ArgumentConflict { .. }));

        let request = parse_query("{ author(id: 1) { id } author(id: 1) { name } }").unwrap();
        let keys: Vec<_> = request
            .child("author")
            .unwrap()
            .requested_keys()
            .map(|key| key.as_str())
            .collect();
        assert_eq!(keys, ["id", "name"]);
    }

    #[test]
    fn deep_or_cyclic_documents_hit_the_limit() {
        let configuration = Configuration::builder().max_depth(2).build();
        let err = parse(
            "{ a { b { c } } }",
            None,
            &Object::new(),
            &Context::new(),
            &configuration,
        )
        .unwrap_err();
        assert_eq!(err, SpecError::RecursionLimitExceeded);

        let err = parse_query("{ books { ...Loop } } fragment Loop on Book { ...Loop }")
            .unwrap_err();
        assert_eq!(err, SpecError::RecursionLimitExceeded);
    }
}
