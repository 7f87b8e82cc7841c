//! Batched resolution of a request tree.
//!
//! Each join type is fetched once per tree node with all the rows every
//! parent can reach, and children are correlated back to their parents in
//! memory. The number of adapter calls depends on the shape of the request,
//! never on the number of rows.
use std::collections::HashMap;

use futures::future;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use tracing::Instrument;

use crate::configuration::Configuration;
use crate::error::JoinError;
use crate::error::SchemaError;
use crate::json_ext::ByteString;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::request::Request;
use crate::schema::FieldDefinition;
use crate::schema::FieldType;
use crate::schema::Immediates;
use crate::schema::ImmediateSelection;
use crate::schema::ImmediatesRequest;
use crate::schema::JoinType;
use crate::schema::Relationship;
use crate::schema::Schema;

mod executor;
mod results;

pub use executor::ExecuteRequest;
pub use executor::Executor;
pub use executor::execute;
pub use results::JoinResult;
pub use results::RelationshipResults;

pub(crate) const EXECUTE_SPAN_NAME: &str = "execute";
pub(crate) const FETCH_SPAN_NAME: &str = "fetch";
pub(crate) const RELATIONSHIP_SPAN_NAME: &str = "relationship";

const JOIN_KEY_PREFIX: &str = "__join:";

/// The key a join field's value is stored under on fetched rows. It cannot
/// be a GraphQL response key, so aliases never shadow join values.
pub(crate) fn join_key(field_name: &ByteString) -> ByteString {
    ByteString::from(format!("{JOIN_KEY_PREFIX}{}", field_name.as_str()))
}

/// What every node of one resolution shares.
pub struct ExecutionParameters<'a, S> {
    pub(crate) schema: &'a Schema<S>,
    pub(crate) configuration: &'a Configuration,
}

impl<'a, S> ExecutionParameters<'a, S> {
    pub fn new(schema: &'a Schema<S>, configuration: &'a Configuration) -> Self {
        Self {
            schema,
            configuration,
        }
    }
}

enum Requested<'a, S> {
    Field,
    Relationship(&'a Relationship<S>),
}

impl<S> JoinType<S>
where
    S: Send + Sync + 'static,
{
    /// Fetches the rows `select` describes and resolves `request` on each.
    ///
    /// Only the root type may be fetched without a select handle.
    pub fn fetch<'a>(
        &'a self,
        parameters: &'a ExecutionParameters<'a, S>,
        request: &'a Request,
        select: Option<&'a S>,
    ) -> BoxFuture<'a, Result<Vec<JoinResult>, JoinError>> {
        Box::pin(
            async move {
                let requested = self.requested(request)?;
                let flat = self.flat_request(request, &requested);
                let rows = match (&self.immediates, select) {
                    (Immediates::Root, _) => vec![Object::new()],
                    (Immediates::Adapter(adapter), Some(select)) => {
                        let immediates = self.immediates_request(&flat)?;
                        adapter
                            .fetch_immediates(&immediates, select)
                            .await
                            .map_err(|err| {
                                tracing::debug!("immediate fetch failed: {err}");
                                JoinError::adapter(self.name(), err)
                            })?
                    }
                    (Immediates::Adapter(_), None) => {
                        let detached = SchemaError::DetachedType(self.name().to_string());
                        return Err(JoinError::from(detached));
                    }
                };
                tracing::trace!(rows = rows.len(), "fetched immediates");

                let fetches = requested.iter().filter_map(|(key, child, requested)| {
                    let Requested::Relationship(relationship) = requested else {
                        return None;
                    };
                    Some(async move {
                        let results = relationship
                            .fetch(parameters, self.name(), child, select)
                            .await?;
                        Ok::<_, JoinError>((*key, results))
                    })
                });
                let relationships: HashMap<&ByteString, RelationshipResults> =
                    if parameters.configuration.parallel_relationships() {
                        future::try_join_all(fetches).await?.into_iter().collect()
                    } else {
                        let mut relationships = HashMap::new();
                        for fetch in fetches {
                            let (key, results) = fetch.await?;
                            relationships.insert(key, results);
                        }
                        relationships
                    };

                let join_keys: Vec<ByteString> =
                    request.join_fields().iter().map(join_key).collect();
                rows.into_iter()
                    .map(|row| -> Result<JoinResult, JoinError> {
                        let mut value = Object::new();
                        for (key, _, requested) in &requested {
                            let resolved = match requested {
                                Requested::Field => {
                                    row.get(key.as_str()).cloned().unwrap_or(Value::Null)
                                }
                                Requested::Relationship(_) => match relationships.get(key) {
                                    Some(results) => results.get(&row)?,
                                    None => Value::Null,
                                },
                            };
                            value.insert((*key).clone(), resolved);
                        }
                        let join_values = join_keys
                            .iter()
                            .map(|key| row.get(key.as_str()).cloned().unwrap_or(Value::Null))
                            .collect();
                        Ok(JoinResult { value, join_values })
                    })
                    .collect::<Result<Vec<_>, JoinError>>()
            }
            .instrument(tracing::debug_span!(
                FETCH_SPAN_NAME,
                "join_type" = self.name(),
                "field" = request.field_name()
            )),
        )
    }

    /// Splits the children of `request` into fields and relationships,
    /// checking each against its declaration.
    fn requested<'a>(
        &'a self,
        request: &'a Request,
    ) -> Result<Vec<(&'a ByteString, &'a Request, Requested<'a, S>)>, SchemaError> {
        request
            .children()
            .iter()
            .map(|(key, child)| {
                let definition = self.get(child.field_name()).ok_or_else(|| {
                    SchemaError::UnknownField {
                        type_name: self.name().to_string(),
                        field: child.field_name().to_string(),
                    }
                })?;
                let requested = match definition {
                    FieldDefinition::Field(field) => {
                        self.check_args(child, field.args())?;
                        if !child.is_leaf() {
                            return Err(SchemaError::UnexpectedSelection {
                                type_name: self.name().to_string(),
                                field: child.field_name().to_string(),
                            });
                        }
                        Requested::Field
                    }
                    FieldDefinition::Relationship(relationship) => {
                        self.check_args(child, relationship.args())?;
                        // An extracted field is checked by the target type
                        if child.is_leaf() && relationship.extract.is_none() {
                            return Err(SchemaError::MissingSelection {
                                type_name: self.name().to_string(),
                                field: child.field_name().to_string(),
                            });
                        }
                        Requested::Relationship(relationship)
                    }
                };
                Ok((key, child, requested))
            })
            .collect()
    }

    fn check_args(
        &self,
        request: &Request,
        declared: &IndexMap<ByteString, FieldType>,
    ) -> Result<(), SchemaError> {
        match request.args().keys().find(|name| !declared.contains_key(*name)) {
            Some(argument) => Err(SchemaError::UnknownArgument {
                type_name: self.name().to_string(),
                field: request.field_name().to_string(),
                argument: argument.as_str().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// The request the immediate fetch sees: the requested fields, the join
    /// fields the parent correlates on, and the fields every requested
    /// relationship joins from.
    fn flat_request(
        &self,
        request: &Request,
        requested: &[(&ByteString, &Request, Requested<'_, S>)],
    ) -> Request {
        let mut children = IndexMap::new();
        let mut join_field = |field_name: &ByteString| {
            children.entry(join_key(field_name)).or_insert_with(|| {
                Request::new(field_name.clone()).with_context(request.context().clone())
            });
        };
        for field_name in request.join_fields() {
            join_field(field_name);
        }
        for (_, _, requested) in requested {
            if let Requested::Relationship(relationship) = requested {
                relationship.parent_join_fields().for_each(&mut join_field);
            }
        }
        for (key, child, requested) in requested {
            if let Requested::Field = requested {
                children.insert((*key).clone(), (*child).clone());
            }
        }
        request.with_children(children)
    }

    fn immediates_request<'a>(
        &'a self,
        flat: &'a Request,
    ) -> Result<ImmediatesRequest<'a>, SchemaError> {
        let selections = flat
            .children()
            .iter()
            .map(|(key, child)| {
                let field = self
                    .get(child.field_name())
                    .and_then(FieldDefinition::as_field)
                    .ok_or_else(|| SchemaError::UnknownField {
                        type_name: self.name().to_string(),
                        field: child.field_name().to_string(),
                    })?;
                Ok(ImmediateSelection {
                    key,
                    field_name: &child.field_name,
                    field,
                    request: child,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        Ok(ImmediatesRequest {
            type_name: self.name(),
            request: flat,
            selections,
        })
    }
}

impl<S> Relationship<S>
where
    S: Send + Sync + 'static,
{
    /// Fetches the children of every parent row reachable from
    /// `parent_select`, indexed for lookup by parent row.
    pub fn fetch<'a>(
        &'a self,
        parameters: &'a ExecutionParameters<'a, S>,
        type_name: &'a str,
        request: &'a Request,
        parent_select: Option<&'a S>,
    ) -> BoxFuture<'a, Result<RelationshipResults, JoinError>> {
        Box::pin(
            async move {
                let target = parameters.schema.target(self)?;
                let select = self
                    .select
                    .select(request, parent_select)
                    .map_err(|err| {
                        tracing::debug!("select failed: {err}");
                        JoinError::adapter(target.name(), err)
                    })?;
                let child_request = self.child_request(request);
                let results = target
                    .fetch(parameters, &child_request, Some(&select))
                    .await?;
                tracing::trace!(results = results.len(), "fetched relationship");
                Ok::<_, JoinError>(RelationshipResults::new(
                    self,
                    type_name,
                    request.field_name(),
                    results,
                ))
            }
            .instrument(tracing::debug_span!(
                RELATIONSHIP_SPAN_NAME,
                "type" = type_name,
                "field" = request.field_name(),
                "target" = self.target()
            )),
        )
    }

    /// The request resolved on the target type: the incoming one, made to
    /// carry the child side of the join. An extracting relationship selects
    /// only its extracted field, with the incoming sub-selection.
    fn child_request(&self, request: &Request) -> Request {
        let join_fields = self.child_join_fields().cloned().collect();
        match &self.extract {
            Some(field_name) => {
                let mut extracted = Request::new(field_name.clone());
                extracted.children = request.children.clone();
                extracted.context = request.context.clone();
                let mut children = IndexMap::new();
                children.insert(field_name.clone(), extracted);
                request.with_children(children).with_join_fields(join_fields)
            }
            None => request.with_join_fields(join_fields),
        }
    }
}
