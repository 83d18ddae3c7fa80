//! Error taxonomies of the resource factory.
//!
//! Every fallible entry point returns one of the enums below; nothing is
//! thrown. Contract violations (releasing an unknown handle, internal table
//! inconsistency) are programmer errors and assert instead.

pub type Result<T> = ::std::result::Result<T, Error>;

/// Factory-level results, returned from registration, acquisition and the
/// transport loader.
#[derive(Debug, Fail, Clone, PartialEq, Eq)]
pub enum Error {
    #[fail(display = "Invalid argument.")]
    Invalid,
    #[fail(display = "Handler registry is full.")]
    OutOfResources,
    #[fail(display = "Extension has already been registered.")]
    AlreadyRegistered,
    #[fail(display = "Resource not found: {}.", _0)]
    ResourceNotFound(String),
    #[fail(display = "Missing file extension: '{}'.", _0)]
    MissingFileExtension(String),
    #[fail(display = "Unknown resource type: {}.", _0)]
    UnknownResourceType(String),
    #[fail(display = "I/O failure while loading resource.")]
    IoError,
    #[fail(display = "Resource too large for stream buffer: {}.", _0)]
    StreamBufferTooSmall(String),
    #[fail(display = "Resource is not loaded.")]
    NotLoaded,
    #[fail(display = "Unknown error.")]
    Unknown,
}

/// Results a handler reports back from `create` and `recreate`.
#[derive(Debug, Fail, Clone, Copy, PartialEq, Eq)]
pub enum CreateError {
    #[fail(display = "Out of memory.")]
    OutOfMemory,
    #[fail(display = "Invalid resource format.")]
    FormatError,
    #[fail(display = "Constant mismatch in resource data.")]
    ConstantError,
    #[fail(display = "Unknown create error.")]
    Unknown,
}

/// Reload is a distinct taxonomy: `NotFound` here means the resource was
/// never loaded, and `NotSupported` means the handler declined to provide
/// recreation.
#[derive(Debug, Fail, Clone, PartialEq, Eq)]
pub enum ReloadError {
    #[fail(display = "Resource was never loaded.")]
    NotFound,
    #[fail(display = "Reloading of resource type {} not supported.", extension)]
    NotSupported { extension: String },
    #[fail(display = "Reloading failed: {}", _0)]
    Load(#[fail(cause)] Error),
    #[fail(display = "Out of memory.")]
    OutOfMemory,
    #[fail(display = "Invalid resource format.")]
    FormatError,
    #[fail(display = "Constant mismatch in resource data.")]
    ConstantError,
    #[fail(display = "Unknown reload error.")]
    Unknown,
}

impl From<CreateError> for ReloadError {
    fn from(err: CreateError) -> Self {
        match err {
            CreateError::OutOfMemory => ReloadError::OutOfMemory,
            CreateError::FormatError => ReloadError::FormatError,
            CreateError::ConstantError => ReloadError::ConstantError,
            CreateError::Unknown => ReloadError::Unknown,
        }
    }
}
