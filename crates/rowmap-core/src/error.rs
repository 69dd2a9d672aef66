use crate::coerce::CoercionError;
use std::{error::Error as StdError, fmt};
use thiserror::Error as ThisError;

///
/// MapError
///
/// Failure of one scan. Every variant aborts the scan it occurred in;
/// partial results are discarded and the destination is left untouched.
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum MapError {
    #[error("cannot map column '{column}' of entity(name={entity}): {source}")]
    Coercion {
        entity: &'static str,
        column: &'static str,
        #[source]
        source: CoercionError,
    },

    #[error("mapper invariant violated: {message}")]
    Invariant { message: String },

    #[error("no key field found in values for entity(name={entity}): missing column '{column}'")]
    MissingKeyColumn {
        entity: &'static str,
        column: &'static str,
    },

    #[error("no rows found")]
    NoRows,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("too many rows for entity(name={entity})")]
    TooManyRows { entity: &'static str },

    /// Row-source failure, passed through unchanged.
    #[error(transparent)]
    Upstream(Box<dyn StdError + Send + Sync + 'static>),
}

impl MapError {
    /// Wrap a row-source failure.
    pub fn upstream<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Upstream(Box::new(err))
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Coercion { .. } => ErrorClass::Coercion,
            Self::Invariant { .. } => ErrorClass::InvariantViolation,
            Self::MissingKeyColumn { .. } => ErrorClass::MissingKey,
            Self::NoRows => ErrorClass::NotFound,
            Self::Schema(_) => ErrorClass::Schema,
            Self::TooManyRows { .. } => ErrorClass::Cardinality,
            Self::Upstream(_) => ErrorClass::Upstream,
        }
    }

    #[must_use]
    pub const fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRows)
    }

    /// Borrow the row-source error if this is an upstream failure of type `E`.
    #[must_use]
    pub fn upstream_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Upstream(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}: {self}", self.class())
    }
}

///
/// SchemaError
///
/// Entity metadata could not be analyzed. Cached by the registry: once a
/// type fails, every later scan touching it sees the same error.
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("registry entry for entity(name={entity}) does not hold its descriptor")]
    DescriptorMismatch { entity: &'static str },

    #[error("duplicate column '{column}' in entity(name={entity})")]
    DuplicateColumn {
        entity: &'static str,
        column: &'static str,
    },

    #[error(
        "multiple primary key fields found in entity(name={entity}): '{first}' and '{second}'"
    )]
    DuplicatePrimaryKey {
        entity: &'static str,
        first: &'static str,
        second: &'static str,
    },

    #[error("entity(name={entity}) declares no primary key")]
    MissingPrimaryKey { entity: &'static str },

    #[error("relation '{field}' of entity(name={entity}) cannot be resolved: {source}")]
    Relation {
        entity: &'static str,
        field: &'static str,
        #[source]
        source: Box<Self>,
    },

    #[error(
        "relation '{field}' of entity(name={entity}) targets its own type and would reuse its key column"
    )]
    SelfRelation {
        entity: &'static str,
        field: &'static str,
    },
}

impl SchemaError {
    /// Innermost error of a relation chain.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Relation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

///
/// ErrorClass
/// Stable classification of scan failures, used by traces and metrics.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorClass {
    Cardinality,
    Coercion,
    InvariantViolation,
    MissingKey,
    NotFound,
    Schema,
    Upstream,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Cardinality => "cardinality",
            Self::Coercion => "coercion",
            Self::InvariantViolation => "invariant_violation",
            Self::MissingKey => "missing_key",
            Self::NotFound => "not_found",
            Self::Schema => "schema",
            Self::Upstream => "upstream",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
