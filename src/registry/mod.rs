//! Registry session and container engine access

pub mod auth;
pub mod engine;
pub mod session;

pub use auth::RegistryAuth;
pub use engine::{ContainerEngine, DockerEngine};
pub use session::Session;
