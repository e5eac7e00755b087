//! Run configuration assembled from flags, environment and the image list file

use crate::cli::args::Args;
use crate::error::{MirrorError, Result};
use crate::mirror::list::{ImageList, ListOrigin, TransferEntry};
use std::fmt;

/// Registry credentials used for the login handshake and every push
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    /// Registry address; `None` means the default public registry
    pub server_address: Option<String>,
}

impl AuthConfig {
    pub fn new(username: String, password: String) -> Self {
        Self {
            username,
            password,
            server_address: None,
        }
    }

    pub fn with_server_address(mut self, address: &str) -> Self {
        let address = address.trim();
        self.server_address = (!address.is_empty()).then(|| address.to_string());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(MirrorError::Config("Username cannot be empty".to_string()));
        }
        if self.password.is_empty() {
            return Err(MirrorError::Config("Password cannot be empty".to_string()));
        }
        Ok(())
    }
}

// Keeps the password out of debug output and tracing fields
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("server_address", &self.server_address)
            .finish()
    }
}

/// Target registry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Empty means the default public registry
    pub address: String,
    pub namespace: String,
    pub skip_tls: bool,
}

/// CI context the run was started from. Only reported, never sent anywhere.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct GithubContext {
    pub token: Option<String>,
    pub user: Option<String>,
    pub repo: Option<String>,
    pub run_id: Option<String>,
}

impl fmt::Debug for GithubContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubContext")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("user", &self.user)
            .field("repo", &self.repo)
            .field("run_id", &self.run_id)
            .finish()
    }
}

/// Everything a run needs, passed by reference to the session and executor
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub github: GithubContext,
    pub registry: RegistryConfig,
    /// `None` runs anonymously
    pub auth: Option<AuthConfig>,
    pub images: ImageList,
    pub origin: ListOrigin,
    pub dry_run: bool,
}

impl MirrorConfig {
    /// Build the configuration from parsed arguments and load the image list
    pub fn from_args(args: &Args) -> Result<Self> {
        args.validate().map_err(MirrorError::Config)?;

        let registry = RegistryConfig {
            address: args.docker_registry.clone().unwrap_or_default(),
            namespace: args.docker_namespace.clone().unwrap_or_default(),
            skip_tls: args.skip_tls,
        };

        let auth = match (&args.docker_user, &args.docker_secret) {
            (Some(user), Some(secret)) => {
                let auth = AuthConfig::new(user.clone(), secret.clone())
                    .with_server_address(&registry.address);
                auth.validate()?;
                Some(auth)
            }
            _ => None,
        };

        let github = GithubContext {
            token: args.github_token.clone(),
            user: args.github_user.clone(),
            repo: args.github_repo.clone(),
            run_id: args.github_run_id.clone(),
        };

        let (images, origin) = ImageList::load(&args.images_file, &args.mapping_file)?;

        Ok(Self {
            github,
            registry,
            auth,
            images,
            origin,
            dry_run: args.dry_run,
        })
    }

    /// Resolve the configured images into transfer entries, in order
    pub fn entries(&self) -> Result<Vec<TransferEntry>> {
        self.images
            .entries(&self.registry.address, &self.registry.namespace)
    }
}
