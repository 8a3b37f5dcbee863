use physio_uuid::RecordId;

/// Failure taxonomy for clinic operations.
///
/// Domain variants map one-to-one onto the outcomes the request layer
/// translates into status codes; storage variants wrap the underlying I/O or
/// serialisation failure. All variants are recoverable at the boundary - none
/// is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid input: {0}")]
    ValidationFailed(String),
    #[error("template is not active: {0}")]
    TemplateInactive(RecordId),
    #[error("illegal status transition: {from} -> {to}")]
    IllegalTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error(
        "cannot complete record with unanswered fields: {labels}",
        labels = missing_fields.join(", ")
    )]
    IncompleteSubmission { missing_fields: Vec<String> },
    #[error("field \"{0}\" does not exist in the record's template snapshot")]
    UnknownField(String),
    #[error("{entity} already exists: {value}")]
    DuplicateKey {
        entity: &'static str,
        value: String,
    },

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create document directory: {0}")]
    DocumentDirCreation(std::io::Error),
    #[error("failed to write document: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read document: {0}")]
    FileRead(std::io::Error),
    #[error("failed to delete document: {0}")]
    FileDelete(std::io::Error),
    #[error("failed to serialise YAML: {0}")]
    YamlSerialisation(serde_yaml::Error),
    #[error("failed to deserialise YAML: {0}")]
    YamlDeserialisation(serde_yaml::Error),

    #[error("invalid identifier: {0}")]
    Id(#[from] physio_uuid::IdError),
}

impl ClinicError {
    /// Shorthand for a `NotFound` naming the entity and its identifier.
    pub(crate) fn not_found(entity: &'static str, id: RecordId) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;
