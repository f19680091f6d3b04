//! Error types for LargeColl operations.

use std::fmt;

/// The primary error type for all LargeColl operations.
#[derive(Debug)]
pub enum Error {
    /// Association or entity metadata cannot support the requested operation
    Mapping(MappingError),
    /// Owner identity could not be resolved or does not match its metadata
    Identity(IdentityError),
    /// Query execution errors, surfaced verbatim from the executor
    Query(QueryError),
    /// Type conversion errors
    Type(TypeError),
    /// Caller passed an out-of-range argument (limit, offset, alias)
    InvalidArgument(String),
    /// Serialization/deserialization errors
    Serde(String),
}

#[derive(Debug, Clone)]
pub struct MappingError {
    pub kind: MappingErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingErrorKind {
    /// Related entity does not have exactly one identifier field
    UnsupportedKeyShape,
    /// Owning side has no inverse mapping, so it cannot be traversed backwards
    UnsupportedDirection,
    /// Entity type is not registered with the metadata source
    UnknownEntity,
    /// Entity has no association with the given field name
    UnknownAssociation,
    /// Entity, field or alias name is not a valid identifier
    InvalidName,
    /// Entity metadata declares no identifier fields
    EmptyIdentifier,
}

#[derive(Debug, Clone)]
pub struct IdentityError {
    pub kind: IdentityErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityErrorKind {
    /// The entity instance is not tracked by the identity service
    Unmanaged,
    /// Identity values do not line up with the declared identifier fields
    ArityMismatch,
    /// Another managed instance of the same entity already holds the identifier
    Duplicate,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub query: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Query text or structure is not understood by the executor
    Syntax,
    /// A placeholder has no bound value
    UnboundParameter,
    /// Entity, field or association referenced by the query does not exist
    NotFound,
    /// Executor is unreachable or failed mid-query
    Connection,
    /// Other execution failure
    Database,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

impl MappingError {
    pub fn new(kind: MappingErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl IdentityError {
    pub fn new(kind: IdentityErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl QueryError {
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            query: None,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the rendered query text that failed.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

impl Error {
    /// Shorthand for a mapping error.
    pub fn mapping(kind: MappingErrorKind, message: impl Into<String>) -> Self {
        Error::Mapping(MappingError::new(kind, message))
    }

    /// Shorthand for an identity error.
    pub fn identity(kind: IdentityErrorKind, message: impl Into<String>) -> Self {
        Error::Identity(IdentityError::new(kind, message))
    }

    /// Is this a metadata/mapping precondition failure?
    pub fn is_mapping_error(&self) -> bool {
        matches!(self, Error::Mapping(_))
    }

    /// The mapping error kind, if this is a mapping error.
    pub fn mapping_kind(&self) -> Option<MappingErrorKind> {
        match self {
            Error::Mapping(e) => Some(e.kind),
            _ => None,
        }
    }

    /// The identity error kind, if this is an identity error.
    pub fn identity_kind(&self) -> Option<IdentityErrorKind> {
        match self {
            Error::Identity(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Get the query text that caused this error, if available
    pub fn query_text(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.query.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Mapping(e) => write!(f, "Mapping error: {}", e.message),
            Error::Identity(e) => write!(f, "Identity error: {}", e.message),
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(query) = &self.query {
            write!(f, "{} (in `{}`)", self.message, query)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl From<MappingError> for Error {
    fn from(err: MappingError) -> Self {
        Error::Mapping(err)
    }
}

impl From<IdentityError> for Error {
    fn from(err: IdentityError) -> Self {
        Error::Identity(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

/// Result type alias for LargeColl operations.
pub type Result<T> = std::result::Result<T, Error>;
