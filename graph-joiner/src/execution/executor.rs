use std::sync::Arc;

use tracing::Instrument;

use super::EXECUTE_SPAN_NAME;
use super::ExecutionParameters;
use crate::configuration::Configuration;
use crate::context::Context;
use crate::error::JoinError;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::request::Request;
use crate::schema::Schema;
use crate::spec;

/// A query to resolve against the root type.
#[derive(Debug, Clone, Default)]
pub struct ExecuteRequest {
    pub query: String,
    pub operation_name: Option<String>,
    pub variables: Object,
    pub context: Context,
}

#[buildstructor::buildstructor]
impl ExecuteRequest {
    #[builder]
    pub fn new(
        query: String,
        operation_name: Option<String>,
        variables: Option<Object>,
        context: Option<Context>,
    ) -> Self {
        Self {
            query,
            operation_name,
            variables: variables.unwrap_or_default(),
            context: context.unwrap_or_default(),
        }
    }
}

/// Resolves GraphQL queries against one schema.
///
/// Every call is independent: nothing is cached or shared between two
/// executions beyond the schema itself.
pub struct Executor<S> {
    schema: Arc<Schema<S>>,
    configuration: Configuration,
}

impl<S> Executor<S>
where
    S: Send + Sync + 'static,
{
    pub fn new(schema: Arc<Schema<S>>, configuration: Configuration) -> Self {
        Self {
            schema,
            configuration,
        }
    }

    pub fn schema(&self) -> &Arc<Schema<S>> {
        &self.schema
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Resolves `query` with no variables and an empty context.
    pub async fn execute(&self, query: &str) -> Result<Value, JoinError> {
        self.execute_with(ExecuteRequest::builder().query(query).build())
            .await
    }

    pub async fn execute_with(&self, request: ExecuteRequest) -> Result<Value, JoinError> {
        let operation_name = request.operation_name.as_deref().unwrap_or_default();
        let span = tracing::info_span!(EXECUTE_SPAN_NAME, "operation_name" = operation_name);
        async {
            let tree = spec::parse(
                &request.query,
                request.operation_name.as_deref(),
                &request.variables,
                &request.context,
                &self.configuration,
            )?;
            resolve(&self.schema, &self.configuration, &tree).await
        }
        .instrument(span)
        .await
    }

    /// Resolves an already built request tree.
    pub async fn execute_request(&self, request: &Request) -> Result<Value, JoinError> {
        resolve(&self.schema, &self.configuration, request).await
    }
}

/// Resolves `query` against `schema` with the default configuration.
pub async fn execute<S>(
    schema: &Schema<S>,
    query: &str,
    context: Context,
) -> Result<Value, JoinError>
where
    S: Send + Sync + 'static,
{
    let configuration = Configuration::default();
    let span = tracing::info_span!(EXECUTE_SPAN_NAME);
    async {
        let tree = spec::parse(query, None, &Object::new(), &context, &configuration)?;
        resolve(schema, &configuration, &tree).await
    }
    .instrument(span)
    .await
}

async fn resolve<S>(
    schema: &Schema<S>,
    configuration: &Configuration,
    request: &Request,
) -> Result<Value, JoinError>
where
    S: Send + Sync + 'static,
{
    let parameters = ExecutionParameters::new(schema, configuration);
    let mut rows = schema.root().fetch(&parameters, request, None).await?;
    let count = rows.len();
    match rows.pop() {
        Some(root) if count == 1 => Ok(Value::Object(root.value)),
        _ => Err(JoinError::RootCardinality { count }),
    }
}
