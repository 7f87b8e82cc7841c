//! Resolution errors.
//!
//! Every failure aborts the whole resolution: there is no partial result and
//! no retry.
use displaydoc::Display;
use thiserror::Error;

pub use crate::configuration::ConfigurationError;
pub use crate::spec::SpecError;

/// The error type adapters return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stable machine readable code for an error, independent of its message.
pub trait ErrorExtension {
    fn extension_code(&self) -> String;
}

/// Error types for resolution.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum JoinError {
    /// {0}
    Schema(#[from] SchemaError),

    /// {0}
    Spec(#[from] SpecError),

    /// relationship '{type_name}.{field}' expected at most one result for a parent but matched {count}
    Cardinality {
        /// The type declaring the relationship.
        type_name: String,
        /// The relationship field.
        field: String,
        /// How many child rows shared the parent's join key.
        count: usize,
    },

    /// adapter for type '{type_name}' failed: {source}
    Adapter {
        /// The type whose adapter failed.
        type_name: String,
        /// The adapter's own error, unchanged.
        source: BoxError,
    },

    /// the root type resolved to {count} rows instead of exactly one
    RootCardinality {
        /// How many rows the root fetch produced.
        count: usize,
    },
}

impl JoinError {
    pub(crate) fn adapter(type_name: &str, source: BoxError) -> Self {
        JoinError::Adapter {
            type_name: type_name.to_string(),
            source,
        }
    }
}

impl ErrorExtension for JoinError {
    fn extension_code(&self) -> String {
        match self {
            JoinError::Schema(err) => return err.extension_code(),
            JoinError::Spec(err) => return err.extension_code(),
            JoinError::Cardinality { .. } => "CARDINALITY_ERROR",
            JoinError::Adapter { .. } => "ADAPTER_ERROR",
            JoinError::RootCardinality { .. } => "ROOT_CARDINALITY_ERROR",
        }
        .to_string()
    }
}

/// Schema errors: a type, field or argument was used without being declared,
/// or a declaration is inconsistent.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    /// cannot query field '{field}' on type '{type_name}'
    UnknownField { type_name: String, field: String },

    /// unknown argument '{argument}' on field '{type_name}.{field}'
    UnknownArgument {
        type_name: String,
        field: String,
        argument: String,
    },

    /// field '{type_name}.{field}' must have a selection of subfields
    MissingSelection { type_name: String, field: String },

    /// field '{type_name}.{field}' is a leaf and cannot have a selection of subfields
    UnexpectedSelection { type_name: String, field: String },

    /// type '{0}' is not declared
    UnknownType(String),

    /// type '{0}' is declared more than once
    DuplicateType(String),

    /// field '{field}' is declared more than once on type '{type_name}'
    DuplicateField { type_name: String, field: String },

    /// relationship '{type_name}.{relationship}' joins on '{field}', which is not a plain field of type '{on_type}'
    InvalidJoinField {
        type_name: String,
        relationship: String,
        field: String,
        on_type: String,
    },

    /// relationship '{type_name}.{relationship}' extracts '{field}', which is not declared on type '{on_type}'
    InvalidExtractField {
        type_name: String,
        relationship: String,
        field: String,
        on_type: String,
    },

    /// the root type '{type_name}' cannot declare the plain field '{field}'
    RootField { type_name: String, field: String },

    /// no root type was declared
    MissingRoot,

    /// type '{0}' can only be fetched through a relationship
    DetachedType(String),
}

impl ErrorExtension for SchemaError {
    fn extension_code(&self) -> String {
        match self {
            SchemaError::UnknownField { .. } => "UNKNOWN_FIELD",
            SchemaError::UnknownArgument { .. } => "UNKNOWN_ARGUMENT",
            SchemaError::MissingSelection { .. } => "MISSING_SELECTION",
            SchemaError::UnexpectedSelection { .. } => "UNEXPECTED_SELECTION",
            SchemaError::UnknownType(_)
            | SchemaError::DuplicateType(_)
            | SchemaError::DuplicateField { .. }
            | SchemaError::InvalidJoinField { .. }
            | SchemaError::InvalidExtractField { .. }
            | SchemaError::RootField { .. }
            | SchemaError::MissingRoot
            | SchemaError::DetachedType(_) => "INVALID_SCHEMA",
        }
        .to_string()
    }
}
