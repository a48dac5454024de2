use thiserror::Error;

/// Result type alias for configuration and construction.
pub type TguiResult<T> = std::result::Result<T, TguiError>;

/// Configuration-time faults.
///
/// These indicate a programming error in a declarative description and are
/// raised while building prompts, never while a conversation is running.
#[derive(Debug, Error)]
pub enum TguiError {
    /// A validator description names a type the pipeline does not know.
    #[error("unsupported validator type: {0}")]
    UnsupportedValidator(String),

    /// An item description names a type the field factory does not know.
    #[error("unknown item type: {0}")]
    UnknownItemType(String),

    /// An item description has no `type` tag.
    #[error("item description is missing its `type` tag")]
    MissingItemType,

    /// Validator bounds are inconsistent or not representable.
    #[error("invalid validator bounds: {0}")]
    InvalidBounds(String),

    /// A form has no elements to collect.
    #[error("form `{0}` has no elements")]
    EmptyForm(String),

    /// Two elements of one form share a key.
    #[error("form `{form}` contains duplicate element key `{key}`")]
    DuplicateKey { form: String, key: String },

    /// Failed to read a configuration file.
    #[error("config read error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a configuration document.
    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
