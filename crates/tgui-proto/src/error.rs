use thiserror::Error;

/// Result type alias for collaborator operations.
pub type ProtoResult<T> = std::result::Result<T, ProtoError>;

/// Errors reported by the messaging collaborator.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// The transport refused or failed to deliver an outbound call.
    #[error("failed to deliver to chat {chat_id}: {reason}")]
    Delivery { chat_id: i64, reason: String },

    /// A callback query could not be acknowledged.
    #[error("failed to acknowledge callback {callback_id}: {reason}")]
    Acknowledge { callback_id: String, reason: String },
}
