//! In-memory adapters, for tests of schemas built on this crate.
//!
//! A [`MemoryTable`] holds a list of records. Its select handle is the list
//! of records a relationship can reach, which plays the part a SQL query
//! plays for a database adapter: each relationship narrows the target's
//! records to those joined with the parent's records, once, for all parents.
//!
//! ```rust
//! use graph_joiner::schema::FieldType;
//! use graph_joiner::schema::JoinType;
//! use graph_joiner::schema::Relationship;
//! use graph_joiner::test_harness::MemoryTable;
//! use graph_joiner::test_harness::attribute;
//!
//! let books = MemoryTable::new("Book", vec![]);
//! let book = JoinType::new("Book", books.clone())
//!     .field("id", attribute(FieldType::Int, "id"))
//!     .field("authorId", attribute(FieldType::Int, "author_id"));
//! let all_books = Relationship::many("Book", books.select_all());
//! ```
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::BoxError;
use crate::json_ext::ByteString;
use crate::json_ext::JoinKey;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::request::Request;
use crate::schema::FetchImmediates;
use crate::schema::Field;
use crate::schema::FieldType;
use crate::schema::ImmediatesRequest;

/// The select handle of memory tables: the reachable records.
pub type Records = Vec<Object>;

/// Field metadata key naming the record attribute a field reads.
pub const ATTRIBUTE: &str = "attribute";

/// A field read from the record attribute `name`.
pub fn attribute(ty: FieldType, name: &str) -> Field {
    Field::new(ty).with_metadata(ATTRIBUTE, Value::String(ByteString::from(name)))
}

/// A list of records that answers immediate fetches and counts them.
#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    records: Arc<Records>,
    fetches: AtomicUsize,
    requested: Mutex<Vec<Vec<String>>>,
}

impl MemoryTable {
    pub fn new(name: &str, records: Records) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            records: Arc::new(records),
            fetches: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        })
    }

    /// Builds a table from a JSON array of objects; other values are ignored.
    pub fn from_json(name: &str, records: Value) -> Arc<Self> {
        let records = match records {
            Value::Array(records) => records
                .into_iter()
                .filter_map(|record| match record {
                    Value::Object(record) => Some(record),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        Self::new(name, records)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[Object] {
        &self.records
    }

    /// How many immediate fetches this table answered.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// The response keys each immediate fetch asked for, in call order.
    pub fn requested(&self) -> Vec<Vec<String>> {
        self.requested.lock().clone()
    }

    /// Reaches every record, whatever the parent.
    pub fn select_all(
        &self,
    ) -> impl Fn(&Request, Option<&Records>) -> Result<Records, BoxError> + Send + Sync + use<>
    {
        let records = self.records.clone();
        move |_, _| Ok(records.as_ref().clone())
    }

    /// Reaches the records whose `attribute` equals the relationship's
    /// argument `argument`, or every record when the argument is absent.
    pub fn select_by_argument(
        &self,
        argument: &str,
        attribute: &str,
    ) -> impl Fn(&Request, Option<&Records>) -> Result<Records, BoxError> + Send + Sync + use<>
    {
        let records = self.records.clone();
        let argument = argument.to_string();
        let attribute = attribute.to_string();
        move |request, _| {
            let Some(expected) = request.arg(&argument) else {
                return Ok(records.as_ref().clone());
            };
            Ok(records
                .iter()
                .filter(|record| record.get(attribute.as_str()) == Some(expected))
                .cloned()
                .collect())
        }
    }

    /// Reaches the records joined with any parent record: those whose
    /// `attribute` equals the `parent_attribute` of a reachable parent.
    pub fn select_joined(
        &self,
        parent_attribute: &str,
        attribute: &str,
    ) -> impl Fn(&Request, Option<&Records>) -> Result<Records, BoxError> + Send + Sync + use<>
    {
        let records = self.records.clone();
        let parent_attribute = parent_attribute.to_string();
        let attribute = attribute.to_string();
        move |_, parents| {
            let parents = parents.ok_or("a joined selection needs a parent selection")?;
            let reachable: HashSet<JoinKey> = parents
                .iter()
                .map(|parent| key_of(parent, &parent_attribute))
                .collect();
            Ok(records
                .iter()
                .filter(|record| reachable.contains(&key_of(record, &attribute)))
                .cloned()
                .collect())
        }
    }
}

fn key_of(record: &Object, attribute: &str) -> JoinKey {
    std::iter::once(record.get(attribute).cloned().unwrap_or(Value::Null)).collect()
}

#[async_trait]
impl FetchImmediates<Records> for MemoryTable {
    async fn fetch_immediates(
        &self,
        request: &ImmediatesRequest<'_>,
        select: &Records,
    ) -> Result<Vec<Object>, BoxError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(
            request
                .selections()
                .iter()
                .map(|selection| selection.key.as_str().to_string())
                .collect(),
        );
        tracing::trace!(table = %self.name, records = select.len(), "memory fetch");

        Ok(select
            .iter()
            .map(|record| {
                request
                    .selections()
                    .iter()
                    .map(|selection| {
                        let attribute = selection
                            .field
                            .metadata(ATTRIBUTE)
                            .and_then(Value::as_str)
                            .unwrap_or(selection.field_name.as_str());
                        let value = record.get(attribute).cloned().unwrap_or(Value::Null);
                        (ByteString::clone(selection.key), value)
                    })
                    .collect::<Object>()
            })
            .collect())
    }
}
