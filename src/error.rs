//! Error types for the mirror run
//!
//! Every stage of a run (configuration, login, pull, tag, push) has its own
//! variant so the top-level runner can report which stage stopped the batch.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid image reference '{reference}': {reason}")]
    Reference { reference: String, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("docker login failed: {0}")]
    Login(String),

    #[error("docker pull failed for {image}: {message}")]
    Pull { image: String, message: String },

    #[error("docker tag failed for {from} -> {to}: {message}")]
    Tag {
        from: String,
        to: String,
        message: String,
    },

    #[error("docker push failed for {image}: {message}")]
    Push { image: String, message: String },
}

impl MirrorError {
    pub fn reference(reference: &str, reason: impl Into<String>) -> Self {
        MirrorError::Reference {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }

    /// Name of the stage that produced the error
    pub fn stage(&self) -> &'static str {
        match self {
            MirrorError::Config(_)
            | MirrorError::Reference { .. }
            | MirrorError::Io { .. }
            | MirrorError::Yaml { .. } => "config",
            MirrorError::Login(_) => "login",
            MirrorError::Pull { .. } => "pull",
            MirrorError::Tag { .. } => "tag",
            MirrorError::Push { .. } => "push",
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
