mod parse;
mod serialize;

use std::{error, fmt};

pub use {
    parse::{ParseError, WrongValue},
    serialize::SerializeError,
};

macro_rules! opaque_error {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name(Box<dyn error::Error + Send + Sync>);

        impl $name {
            pub fn new<E>(err: E) -> Self
            where
                E: Into<Box<dyn error::Error + Send + Sync>>,
            {
                Self(err.into())
            }

            pub fn msg<T: fmt::Display>(message: T) -> Self {
                Self(message.to_string().into())
            }

            pub fn into_inner(self) -> Box<dyn error::Error + Send + Sync> {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl error::Error for $name {
            fn source(&self) -> Option<&(dyn error::Error + 'static)> {
                Some(self.0.as_ref())
            }
        }
    };
}

opaque_error!(
    /// Failure reported by a [`Database`](crate::database::Database) or [`Transaction`](crate::database::Transaction).
    DatabaseError
);
opaque_error!(
    /// Failure reported by a [`Cache`](crate::cache::Cache) backend.
    CacheError
);
opaque_error!(
    /// Failure reported by a [`ColumnHook`](crate::model::ColumnHook).
    HookError
);

/// Guards against unscoped or meaningless statements. None of these reach the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    EmptyRecord,
    EmptyDeleteCondition,
    MissingUpdateCondition,
    EmptyInsertFields,
    MissingTable,
    PrimaryKeyNotDefined,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EmptyRecord => "record is empty",
            Self::EmptyDeleteCondition => "delete requires at least one condition",
            Self::MissingUpdateCondition => {
                "update requires a primary key value or at least one condition"
            }
            Self::EmptyInsertFields => "insert requires at least one field",
            Self::MissingTable => "table name is empty",
            Self::PrimaryKeyNotDefined => "model has no primary key",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationParseError {
    InvalidHasString(String),
    InvalidOtherKeySyntax(String),
}

impl fmt::Display for RelationParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHasString(tag) => write!(
                f,
                "relation tag {tag:?} must look like [conn.][db.]table:[local_key->]foreign_key,other_key"
            ),
            Self::InvalidOtherKeySyntax(key) => {
                write!(f, "other key {key:?} must look like `a`, `a as b` or `a AS b`")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    NotAStruct(String),
    MalformedRelationTag {
        field: String,
        error: RelationParseError,
    },
    DuplicateColumn(String),
    MultiplePrimaryKeys(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAStruct(field) => {
                write!(f, "element type of has-many field `{field}` is not a record")
            }
            Self::MalformedRelationTag { field, error } => {
                write!(f, "field `{field}`: {error}")
            }
            Self::DuplicateColumn(column) => write!(f, "column `{column}` is declared twice"),
            Self::MultiplePrimaryKeys(column) => {
                write!(f, "second primary key `{column}` declared")
            }
        }
    }
}

#[derive(Debug)]
pub enum RelationError {
    KeyMissing { table: String, local_key: String },
    Fetch { table: String, source: Box<Error> },
}

impl fmt::Display for RelationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyMissing { table, local_key } => write!(
                f,
                "no row carries local key `{local_key}` needed to load `{table}`"
            ),
            Self::Fetch { table, source } => write!(f, "loading `{table}` failed: {source}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug)]
pub enum Error {
    Schema(SchemaError),
    RelationParse(RelationParseError),
    ConnectionNotFound(String),
    Runtime(RuntimeError),
    Validation(ValidationError),
    Relation(RelationError),
    NotFound,
    Cache(CacheError),
    Hook(HookError),
    Database(DatabaseError),
    Parse(ParseError),
    Serialize(SerializeError),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(err) => fmt::Display::fmt(err, f),
            Self::RelationParse(err) => fmt::Display::fmt(err, f),
            Self::ConnectionNotFound(name) => write!(f, "connection `{name}` is not registered"),
            Self::Runtime(err) => fmt::Display::fmt(err, f),
            Self::Validation(err) => fmt::Display::fmt(err, f),
            Self::Relation(err) => fmt::Display::fmt(err, f),
            Self::NotFound => f.write_str("not found"),
            Self::Cache(err) => write!(f, "cache: {err}"),
            Self::Hook(err) => write!(f, "hook: {err}"),
            Self::Database(err) => write!(f, "database: {err}"),
            Self::Parse(err) => write!(f, "parse: {err}"),
            Self::Serialize(err) => write!(f, "serialize: {err}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Cache(err) => Some(err),
            Self::Hook(err) => Some(err),
            Self::Database(err) => Some(err),
            Self::Relation(RelationError::Fetch { source, .. }) => Some(source.as_ref()),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($t:ty => $name:ident),* $(,)?) => {
        $(
            impl From<$t> for Error {
                fn from(value: $t) -> Self {
                    Self::$name(value)
                }
            }
        )*
    };
}

impl_from!(
    SchemaError => Schema,
    RelationParseError => RelationParse,
    RuntimeError => Runtime,
    ValidationError => Validation,
    RelationError => Relation,
    CacheError => Cache,
    HookError => Hook,
    DatabaseError => Database,
    ParseError => Parse,
    SerializeError => Serialize,
);

impl error::Error for RuntimeError {}
impl error::Error for RelationParseError {}
impl error::Error for SchemaError {}
impl error::Error for RelationError {}
impl error::Error for ValidationError {}
