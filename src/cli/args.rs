//! Command-line argument parsing

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "image-mirror")]
#[command(about = "Mirror a list of container images into a target registry")]
#[command(version)]
pub struct Args {
    /// GitHub token of the workflow that started the run
    #[arg(long = "github.token", short = 't', help = "Github token")]
    pub github_token: Option<String>,

    #[arg(long = "github.user", short = 'u', help = "Github owner")]
    pub github_user: Option<String>,

    #[arg(long = "github.repo", short = 'p', help = "Github repository")]
    pub github_repo: Option<String>,

    /// Target registry, empty for Docker Hub
    #[arg(long = "docker.registry", short = 'r', help = "Docker registry address")]
    pub docker_registry: Option<String>,

    #[arg(
        long = "docker.namespace",
        short = 'n',
        help = "Namespace the mirrored images are pushed under"
    )]
    pub docker_namespace: Option<String>,

    #[arg(long = "docker.user", short = 'a', help = "Docker registry user")]
    pub docker_user: Option<String>,

    #[arg(long = "docker.secret", short = 's', help = "Docker registry password")]
    pub docker_secret: Option<String>,

    #[arg(long = "github.run_id", short = 'i', help = "Github run id")]
    pub github_run_id: Option<String>,

    #[arg(
        long = "images-file",
        default_value = "images.txt",
        help = "Plain list of source images, one per line"
    )]
    pub images_file: PathBuf,

    #[arg(
        long = "mapping-file",
        default_value = "needImages.yaml",
        help = "YAML mapping of source images to target images, preferred over --images-file"
    )]
    pub mapping_file: PathBuf,

    #[arg(
        long = "skip-tls",
        help = "Accept invalid registry certificates during login"
    )]
    pub skip_tls: bool,

    #[arg(
        long = "dry-run",
        help = "Print the planned transfers without touching the engine"
    )]
    pub dry_run: bool,

    #[arg(long = "verbose", short = 'v', help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long = "quiet",
        short = 'q',
        conflicts_with = "verbose",
        help = "Only print errors"
    )]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        match (&self.docker_user, &self.docker_secret) {
            (Some(_), None) => {
                return Err("--docker.user was given without --docker.secret".to_string());
            }
            (None, Some(_)) => {
                return Err("--docker.secret was given without --docker.user".to_string());
            }
            _ => {}
        }

        if self.images_file.as_os_str().is_empty() || self.mapping_file.as_os_str().is_empty() {
            return Err("Image list paths cannot be empty".to_string());
        }

        Ok(())
    }

    /// Fill unset options from `MIRROR_*` environment variables
    pub fn with_env(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fill = |slot: &mut Option<String>, keys: &[&str]| {
            if slot.is_none() {
                *slot = keys
                    .iter()
                    .filter_map(|&key| lookup(key))
                    .find(|value| !value.is_empty());
            }
        };

        fill(&mut self.github_token, &["MIRROR_GITHUB_TOKEN"]);
        fill(&mut self.github_user, &["MIRROR_GITHUB_USER"]);
        fill(&mut self.github_repo, &["MIRROR_GITHUB_REPO"]);
        fill(&mut self.docker_registry, &["MIRROR_DOCKER_REGISTRY"]);
        fill(&mut self.docker_namespace, &["MIRROR_DOCKER_NAMESPACE"]);
        fill(&mut self.docker_user, &["MIRROR_DOCKER_USER"]);
        fill(&mut self.docker_secret, &["MIRROR_DOCKER_SECRET"]);
        fill(&mut self.github_run_id, &["MIRROR_RUN_ID", "GITHUB_RUN_ID"]);

        self
    }
}
