//! Error model (A1): the typed errors every collaborator reports, matching
//! §7. Collaborators log and count these rather than propagating them to a
//! caller that can't do anything about a malformed control message.

use thiserror::Error;

/// The engine's error taxonomy (§7).
#[derive(Debug, Error)]
pub enum EngineError {
    /// A control message or document could not be parsed.
    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },

    /// A numeric field fell outside its documented bounds.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },

    /// A referenced scene, effect, palette, or pattern id does not exist.
    #[error("missing {kind} resource: {id}")]
    MissingResource { kind: &'static str, id: String },

    /// Sending a frame to an output destination failed.
    #[error("I/O failure sending to {destination}: {source}")]
    IoFailure {
        destination: String,
        #[source]
        source: std::io::Error,
    },

    /// A scene/dissolve/config document failed to load.
    #[error("failed to load {path}: {reason}")]
    LoadFailure { path: String, reason: String },
}
