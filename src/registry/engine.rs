//! Container engine access
//!
//! [`ContainerEngine`] is the seam between the transfer executor and the local
//! engine. [`DockerEngine`] implements it over the Docker engine API.

use crate::config::{AuthConfig, RegistryConfig};
use crate::error::{MirrorError, Result};
use crate::logging::{Logger, progress_line};
use crate::mirror::reference::Reference;
use crate::registry::auth::RegistryAuth;
use async_trait::async_trait;
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::image::{CreateImageOptions, PushImageOptions, TagImageOptions};
use futures::StreamExt;
use std::pin::pin;

/// The four engine operations a mirror run needs
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Check the engine is reachable and, with credentials, that the target
    /// registry accepts them
    async fn login(&self, auth: Option<&AuthConfig>) -> Result<()>;

    async fn pull(&self, image: &Reference) -> Result<()>;

    async fn tag(&self, source: &Reference, target: &Reference) -> Result<()>;

    async fn push(&self, image: &Reference, auth: Option<&AuthConfig>) -> Result<()>;
}

impl From<&AuthConfig> for DockerCredentials {
    fn from(auth: &AuthConfig) -> Self {
        DockerCredentials {
            username: Some(auth.username.clone()),
            password: Some(auth.password.clone()),
            serveraddress: auth.server_address.clone(),
            ..Default::default()
        }
    }
}

pub struct DockerEngine {
    docker: Docker,
    auth: RegistryAuth,
    logger: Logger,
}

impl DockerEngine {
    /// Connect using `DOCKER_HOST` or the platform's default socket
    pub fn connect(registry: &RegistryConfig, logger: Logger) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| MirrorError::Login(format!("cannot reach the container engine: {}", e)))?;
        let auth = RegistryAuth::new(&registry.address, registry.skip_tls)?;

        Ok(Self {
            docker,
            auth,
            logger,
        })
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn login(&self, auth: Option<&AuthConfig>) -> Result<()> {
        let version = self
            .docker
            .version()
            .await
            .map_err(|e| MirrorError::Login(format!("cannot reach the container engine: {}", e)))?;
        self.logger.detail(&format!(
            "Container engine {} (API {})",
            version.version.as_deref().unwrap_or("unknown"),
            version.api_version.as_deref().unwrap_or("unknown"),
        ));

        match auth {
            Some(auth) => self.auth.login(auth, &self.logger).await,
            None => Ok(()),
        }
    }

    async fn pull(&self, image: &Reference) -> Result<()> {
        let options = CreateImageOptions {
            from_image: image.name().to_string(),
            tag: image.pull_reference().to_string(),
            ..Default::default()
        };
        let fail = |message: String| MirrorError::Pull {
            image: image.to_string(),
            message,
        };

        let mut output = pin!(self.docker.create_image(Some(options), None, None));
        while let Some(event) = output.next().await {
            let info = event.map_err(|e| fail(e.to_string()))?;
            if let Some(error) = info.error {
                return Err(fail(error));
            }
            self.logger.stream(&progress_line(
                info.id.as_deref(),
                info.status.as_deref(),
                info.progress.as_deref(),
            ));
        }
        Ok(())
    }

    async fn tag(&self, source: &Reference, target: &Reference) -> Result<()> {
        let options = TagImageOptions {
            repo: target.name().to_string(),
            tag: target.tag().to_string(),
        };

        self.docker
            .tag_image(&source.to_string(), Some(options))
            .await
            .map_err(|e| MirrorError::Tag {
                from: source.to_string(),
                to: target.to_string(),
                message: e.to_string(),
            })
    }

    async fn push(&self, image: &Reference, auth: Option<&AuthConfig>) -> Result<()> {
        let options = PushImageOptions {
            tag: image.tag().to_string(),
        };
        // bollard encodes these into the X-Registry-Auth header of this call
        let credentials = auth.map(DockerCredentials::from);
        let fail = |message: String| MirrorError::Push {
            image: image.to_string(),
            message,
        };

        let mut output = pin!(
            self.docker
                .push_image(image.name(), Some(options), credentials)
        );
        while let Some(event) = output.next().await {
            let info = event.map_err(|e| fail(e.to_string()))?;
            if let Some(error) = info.error {
                return Err(fail(error));
            }
            self.logger.stream(&progress_line(
                None,
                info.status.as_deref(),
                info.progress.as_deref(),
            ));
        }
        Ok(())
    }
}
