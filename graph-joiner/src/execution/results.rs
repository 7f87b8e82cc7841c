use std::collections::HashMap;

use serde::Serialize;

use super::join_key;
use crate::error::JoinError;
use crate::json_ext::ByteString;
use crate::json_ext::JoinKey;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::schema::Cardinality;
use crate::schema::Relationship;

/// One resolved row.
///
/// `value` holds exactly the requested response keys. `join_values` holds
/// the values of the request's join fields, in their order, and is what the
/// parent relationship correlates on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResult {
    pub value: Object,
    pub join_values: JoinKey,
}

/// The children of one relationship, grouped by join key, ready to be
/// looked up once per parent row.
#[derive(Debug)]
pub struct RelationshipResults {
    groups: HashMap<JoinKey, Vec<Value>>,
    parent_keys: Vec<ByteString>,
    cardinality: Cardinality,
    extract: Option<ByteString>,
    type_name: String,
    field: String,
}

impl RelationshipResults {
    pub(crate) fn new<S>(
        relationship: &Relationship<S>,
        type_name: &str,
        field: &str,
        results: Vec<JoinResult>,
    ) -> Self {
        let mut groups: HashMap<JoinKey, Vec<Value>> = HashMap::new();
        for result in results {
            groups
                .entry(result.join_values)
                .or_default()
                .push(Value::Object(result.value));
        }
        Self {
            groups,
            parent_keys: relationship.parent_join_fields().map(join_key).collect(),
            cardinality: relationship.cardinality(),
            extract: relationship.extract.clone(),
            type_name: type_name.to_string(),
            field: field.to_string(),
        }
    }

    /// The children of the parent `row`, which must carry the parent side
    /// of the join.
    pub fn get(&self, row: &Object) -> Result<Value, JoinError> {
        let key = self
            .parent_keys
            .iter()
            .map(|key| row.get(key.as_str()).cloned().unwrap_or(Value::Null))
            .collect();
        self.lookup(&key)
    }

    /// The children of a root relationship, which all share the empty key.
    pub fn get_root(&self) -> Result<Value, JoinError> {
        self.lookup(&JoinKey::empty())
    }

    fn lookup(&self, key: &JoinKey) -> Result<Value, JoinError> {
        let matched = self.groups.get(key).map(Vec::as_slice).unwrap_or_default();
        let mut values = matched.iter().map(|value| match &self.extract {
            Some(field) => value.get(field.as_str()).cloned().unwrap_or(Value::Null),
            None => value.clone(),
        });
        match self.cardinality {
            Cardinality::Many => Ok(Value::Array(values.collect())),
            Cardinality::Single if matched.len() > 1 => Err(JoinError::Cardinality {
                type_name: self.type_name.clone(),
                field: self.field.clone(),
                count: matched.len(),
            }),
            Cardinality::Single => Ok(values.next().unwrap_or(Value::Null)),
        }
    }
}
