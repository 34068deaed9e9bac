use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Collection,
    Record,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Collection => write!(f, "collection"),
            ResourceType::Record => write!(f, "record"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatDbErrorCode {
    Io,
    Encode,
    Decode,
    InvalidArgument,
    MissingState,
    StructuralMismatch,
    Validation,
    InvalidConfig,
    Integrity,
    CollectionNotFound,
    RecordNotFound,
}

impl FlatDbErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            FlatDbErrorCode::Io => "io",
            FlatDbErrorCode::Encode => "encode",
            FlatDbErrorCode::Decode => "decode",
            FlatDbErrorCode::InvalidArgument => "invalid_argument",
            FlatDbErrorCode::MissingState => "missing_state",
            FlatDbErrorCode::StructuralMismatch => "structural_mismatch",
            FlatDbErrorCode::Validation => "validation",
            FlatDbErrorCode::InvalidConfig => "invalid_config",
            FlatDbErrorCode::Integrity => "integrity",
            FlatDbErrorCode::CollectionNotFound => "collection_not_found",
            FlatDbErrorCode::RecordNotFound => "record_not_found",
        }
    }
}

#[derive(Debug, Error)]
pub enum FlatDbError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("missing pipeline state: {0}")]
    MissingState(String),
    #[error("structural mismatch: {0}")]
    StructuralMismatch(String),
    #[error("Model validation failed. Field '{field}': {message}")]
    Validation { field: String, message: String },
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("{resource_type} '{resource_id}' not found")]
    NotFound {
        resource_type: ResourceType,
        resource_id: String,
    },
}

impl FlatDbError {
    pub fn code(&self) -> FlatDbErrorCode {
        match self {
            FlatDbError::Io(_) => FlatDbErrorCode::Io,
            FlatDbError::Encode(_) => FlatDbErrorCode::Encode,
            FlatDbError::Decode(_) => FlatDbErrorCode::Decode,
            FlatDbError::InvalidArgument(_) => FlatDbErrorCode::InvalidArgument,
            FlatDbError::MissingState(_) => FlatDbErrorCode::MissingState,
            FlatDbError::StructuralMismatch(_) => FlatDbErrorCode::StructuralMismatch,
            FlatDbError::Validation { .. } => FlatDbErrorCode::Validation,
            FlatDbError::InvalidConfig { .. } => FlatDbErrorCode::InvalidConfig,
            FlatDbError::Integrity { .. } => FlatDbErrorCode::Integrity,
            FlatDbError::NotFound { resource_type, .. } => match resource_type {
                ResourceType::Collection => FlatDbErrorCode::CollectionNotFound,
                ResourceType::Record => FlatDbErrorCode::RecordNotFound,
            },
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }

    pub(crate) fn collection_not_found(name: &str) -> Self {
        FlatDbError::NotFound {
            resource_type: ResourceType::Collection,
            resource_id: name.to_string(),
        }
    }

    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        FlatDbError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
