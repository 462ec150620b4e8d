use miette::Diagnostic;
use thiserror::Error;

/// An error that can occur while building a schema.
#[derive(Debug, Diagnostic, Error)]
#[error(transparent)]
#[diagnostic(transparent)]
pub struct Error {
    kind: Box<ErrorKind>,
}

#[derive(Debug, Diagnostic, Error)]
pub(crate) enum ErrorKind {
    #[error("illegal namespace '{name}'")]
    #[diagnostic(help("namespaces are dot-separated identifiers, e.g. 'foo.bar'"))]
    IllegalNamespace { name: String },
    #[error("unknown syntax '{syntax}'")]
    #[diagnostic(help("possible values are 'proto2' and 'proto3'"))]
    UnknownSyntax { syntax: String },
    #[error("duplicate field id {id} in message '{message}'")]
    DuplicateFieldId { message: String, id: u32 },
    #[error("illegal options on '{owner}'")]
    #[diagnostic(help("options must be a mapping of option names to values"))]
    IllegalOptions { owner: String },
    #[error("field '{field}' refers to undeclared oneof '{oneof}'")]
    IllegalOneof { field: String, oneof: String },
    #[error("illegal extended field id {id} in message '{message}'")]
    #[diagnostic(help(
        "extension field ids must fall within the extension range declared by the target message"
    ))]
    IllegalExtendedId { message: String, id: u32 },
    #[error("extended message '{reference}' is not defined")]
    ExtendedNotDefined { reference: String },
    #[error("'{name}' is not a valid definition")]
    InvalidDefinition { name: String },
    #[error("unresolvable type reference '{reference}' in '{owner}'")]
    UnresolvableType { owner: String, reference: String },
    #[error("illegal map key type '{key_type}' for field '{field}'")]
    #[diagnostic(help("map keys must be an integer, boolean or string builtin type"))]
    IllegalKeyType { field: String, key_type: String },
    #[error("proto3 field '{field}' refers to proto2 enum '{reference}'")]
    #[diagnostic(help("only proto3 enums may be used in proto3 messages"))]
    SyntaxMismatch { field: String, reference: String },
    #[error("failed to import '{file}': file not found")]
    ImportMissing { file: String },
    #[error("cannot determine import root for '{file}'")]
    #[diagnostic(help(
        "pass a filename (or a {{root, file}} pair) to import so relative imports can be resolved"
    ))]
    ImportRootUnknown { file: String },
    #[error("failed to decode import '{file}'")]
    DecodeImport {
        file: String,
        #[source]
        err: serde_json::Error,
    },
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Creates an instance of [`struct@Error`] with an arbitrary payload.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::from_kind(ErrorKind::Custom(error.into()))
    }

    pub(crate) fn from_kind(kind: ErrorKind) -> Self {
        Error {
            kind: Box::new(kind),
        }
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns true if this error was caused by an import the resource
    /// loader could not find.
    pub fn is_import_missing(&self) -> bool {
        matches!(&*self.kind, ErrorKind::ImportMissing { .. })
    }
}
