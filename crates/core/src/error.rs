//! Model-layer errors.

/// Errors raised while constructing or reconstructing records.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A field could not be parsed into its expected form
    #[error("malformed {field}: {value}")]
    MalformedInput {
        /// Offending field
        field: String,
        /// Value as it was supplied
        value: String,
    },

    /// Discriminator names no known kind
    #[error("unknown entity kind: {0}")]
    UnknownKind(String),

    /// Serialized record lacks its `__class__` field
    #[error("record has no __class__ field")]
    MissingDiscriminator,

    /// Serialized record is not a JSON object
    #[error("record is not an object")]
    NotAnObject,
}
