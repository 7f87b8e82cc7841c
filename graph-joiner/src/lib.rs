//! Resolves GraphQL queries against join types: types whose rows are
//! fetched in bulk and correlated to their parents by join keys.
//!
//! A query is resolved with one immediate fetch per type per node of the
//! query tree, whatever the number of rows. Data access is supplied by the
//! caller through two adapters: [`schema::FetchImmediates`] fetches the
//! scalar fields of a type, and [`schema::Select`] narrows a relationship's
//! target to the rows its parents can reach.

#![warn(unreachable_pub)]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo
    )
)]

pub mod json_ext;

mod configuration;
mod context;
pub mod error;
pub mod execution;
mod request;
pub mod resolvers;
pub mod schema;
pub mod spec;
pub mod test_harness;

pub use configuration::Configuration;
pub use configuration::generate_config_schema;
pub use context::Context;
pub use context::ContextValue;
pub use error::JoinError;
pub use execution::ExecuteRequest;
pub use execution::Executor;
pub use execution::execute;
pub use request::Request;
pub use schema::Schema;
