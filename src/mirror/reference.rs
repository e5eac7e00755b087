//! Image references (`registry/repository:tag`) and target-name derivation

use crate::error::{MirrorError, Result};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_TAG: &str = "latest";

/// Host names that all designate the default public registry
const DOCKER_HUB_HOSTS: &[&str] = &[
    "docker.io",
    "index.docker.io",
    "registry-1.docker.io",
    "registry.hub.docker.com",
];

/// A parsed image reference.
///
/// `name` holds everything before the tag, registry host included, so
/// `ghcr.io/org/app:1.2` has name `ghcr.io/org/app` and tag `1.2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    name: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl Reference {
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(MirrorError::reference(input, "reference cannot be empty"));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(MirrorError::reference(raw, "reference cannot contain whitespace"));
        }

        let (remainder, digest) = match raw.split_once('@') {
            Some((remainder, digest)) => {
                if !digest.contains(':') || digest.ends_with(':') {
                    return Err(MirrorError::reference(
                        raw,
                        "digest must look like 'algorithm:hex'",
                    ));
                }
                (remainder, Some(digest.to_string()))
            }
            None => (raw, None),
        };

        // A ':' before the last '/' belongs to a registry port, not a tag
        let last_slash = remainder.rfind('/').map_or(0, |pos| pos + 1);
        let (name, tag) = match remainder[last_slash..].rfind(':') {
            Some(pos) => {
                let split = last_slash + pos;
                (&remainder[..split], Some(&remainder[split + 1..]))
            }
            None => (remainder, None),
        };

        if name.is_empty() || name.starts_with('/') || name.ends_with('/') || name.contains("//") {
            return Err(MirrorError::reference(raw, "invalid repository name"));
        }
        validate_name(raw, name)?;
        if let Some(tag) = tag {
            if tag.is_empty() {
                return Err(MirrorError::reference(raw, "tag cannot be empty"));
            }
            if tag.starts_with(['.', '-'])
                || !tag
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
            {
                return Err(MirrorError::reference(
                    raw,
                    "tag may only contain letters, digits, '_', '.' and '-'",
                ));
            }
        }

        Ok(Self {
            name: name.to_string(),
            tag: tag.map(str::to_string),
            digest,
        })
    }

    /// Repository name including any registry host
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The explicit tag, or `latest` when the reference had none
    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or(DEFAULT_TAG)
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Tag or digest used when asking the engine to pull this reference
    pub fn pull_reference(&self) -> &str {
        self.digest().unwrap_or_else(|| self.tag())
    }

    /// Derive the mirror name for this image under `namespace`.
    ///
    /// Path separators and registry ports in the source are flattened to `_`
    /// so that any source repository fits in a single namespace:
    /// `k8s.gcr.io/pause:3.2` becomes `<namespace>/k8s.gcr.io_pause:3.2` and
    /// `localhost:5000/busybox` becomes `<namespace>/localhost_5000_busybox`.
    /// The registry host is prepended unless it is the default public registry.
    pub fn derive_target(&self, registry: &str, namespace: &str) -> Result<Reference> {
        let namespace = namespace.trim().trim_matches('/');
        if namespace.is_empty() {
            return Err(MirrorError::Config(
                "docker.namespace is required to derive target image names".to_string(),
            ));
        }
        if self.digest.is_some() {
            return Err(MirrorError::reference(
                &self.to_string(),
                "digest-pinned images need an explicit target in the mapping file",
            ));
        }

        let flattened = self.name.replace(['/', ':'], "_");
        let target = match registry_host(registry) {
            Some(host) => format!("{}/{}/{}:{}", host, namespace, flattened, self.tag()),
            None => format!("{}/{}:{}", namespace, flattened, self.tag()),
        };
        Reference::parse(&target)
    }
}

impl FromStr for Reference {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self> {
        Reference::parse(s)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.tag, &self.digest) {
            (Some(tag), Some(digest)) => write!(f, "{}:{}@{}", self.name, tag, digest),
            (None, Some(digest)) => write!(f, "{}@{}", self.name, digest),
            _ => write!(f, "{}:{}", self.name, self.tag()),
        }
    }
}

// The first component is a registry host when more components follow and it
// looks like one (`localhost`, a dotted name, or `host:port`). Everything
// after it is the repository path, which must be lowercase.
fn validate_name(raw: &str, name: &str) -> Result<()> {
    let mut components = name.split('/').peekable();
    let first = components.peek().copied().unwrap_or_default();
    let has_host = name.contains('/')
        && (first == "localhost" || first.contains('.') || first.contains(':'));

    if has_host {
        components.next();
        if let Some((host, port)) = first.split_once(':') {
            if host.is_empty() || port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
                return Err(MirrorError::reference(raw, "invalid registry port"));
            }
        }
    }

    for component in components {
        if component.contains(':') {
            return Err(MirrorError::reference(
                raw,
                "':' is only allowed before a tag or as a registry port",
            ));
        }
        if !component
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
        {
            return Err(MirrorError::reference(
                raw,
                "repository path must be lowercase letters, digits, '.', '_' or '-'",
            ));
        }
    }
    Ok(())
}

/// Host part of a registry address, or `None` for the default public registry
pub fn registry_host(registry: &str) -> Option<String> {
    let address = registry.trim();
    let address = address
        .strip_prefix("https://")
        .or_else(|| address.strip_prefix("http://"))
        .unwrap_or(address);
    let host = address.split('/').next().unwrap_or_default().to_lowercase();

    if host.is_empty() || DOCKER_HUB_HOSTS.contains(&host.as_str()) {
        None
    } else {
        Some(host)
    }
}
