//! Authenticated session against the target registry

use crate::config::AuthConfig;
use crate::error::Result;
use crate::logging::Logger;
use crate::registry::engine::ContainerEngine;

/// An engine handle whose credentials were accepted by the target registry.
/// Lives for the whole run and is only read after [`Session::establish`].
pub struct Session<E> {
    engine: E,
    auth: Option<AuthConfig>,
}

impl<E: ContainerEngine> Session<E> {
    /// Log in once. Without credentials the session is anonymous.
    pub async fn establish(engine: E, auth: Option<AuthConfig>, logger: &Logger) -> Result<Self> {
        match &auth {
            Some(auth) => logger.step(&format!(
                "docker login, server: {}, user: {}, password: ***",
                auth.server_address.as_deref().unwrap_or("docker.io"),
                auth.username
            )),
            None => logger.warning("No registry credentials configured, pushing anonymously"),
        }

        engine.login(auth.as_ref()).await?;
        tracing::info!(authenticated = auth.is_some(), "registry session established");

        if auth.is_some() {
            logger.success("Login succeeded");
        }
        Ok(Self { engine, auth })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn auth(&self) -> Option<&AuthConfig> {
        self.auth.as_ref()
    }
}
