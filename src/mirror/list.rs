//! Loading the list of images to mirror
//!
//! Two file formats are understood:
//!
//! * a plain list (`images.txt`): one source reference per line, `#` lines and
//!   blank lines skipped. Targets are derived from the registry namespace.
//! * a YAML mapping (`needImages.yaml`): `source: target` pairs used verbatim.
//!
//! The mapping file takes precedence when both exist. When neither exists the
//! list is empty.

use crate::error::{MirrorError, Result};
use crate::mirror::reference::Reference;
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One image to transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEntry {
    pub source: Reference,
    pub target: Reference,
}

impl TransferEntry {
    pub fn new(source: Reference, target: Reference) -> Result<Self> {
        if target.digest().is_some() {
            return Err(MirrorError::reference(
                &target.to_string(),
                "push targets must be tagged, not digest-pinned",
            ));
        }
        Ok(Self { source, target })
    }
}

impl fmt::Display for TransferEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Images configured for a run, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageList {
    /// Source references whose targets are derived from the namespace
    Derived(Vec<Reference>),
    /// Explicit source to target pairs
    Mapped(Vec<TransferEntry>),
}

/// Where an [`ImageList`] came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOrigin {
    Mapping(PathBuf),
    Plain(PathBuf),
    /// Neither file existed
    Empty,
}

impl ImageList {
    pub fn empty() -> Self {
        ImageList::Derived(Vec::new())
    }

    pub fn len(&self) -> usize {
        match self {
            ImageList::Derived(sources) => sources.len(),
            ImageList::Mapped(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse a newline-delimited list of references
    pub fn parse_plain(content: &str) -> Result<Self> {
        let sources = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(Reference::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(ImageList::Derived(sources))
    }

    /// Parse a YAML mapping of source references to target references
    ///
    /// `path` is only used to label parse errors.
    pub fn parse_mapping(content: &str, path: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(ImageList::Mapped(Vec::new()));
        }

        let mapping: Option<Mapping> =
            serde_yaml::from_str(content).map_err(|source| MirrorError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
        let mut entries = Vec::new();
        for (key, value) in mapping.unwrap_or_default() {
            let (Value::String(source), Value::String(target)) = (&key, &value) else {
                return Err(MirrorError::Config(format!(
                    "{}: mapping entries must be 'source: target' strings, got {:?}: {:?}",
                    path.display(),
                    key,
                    value
                )));
            };
            let entry = TransferEntry::new(Reference::parse(source)?, Reference::parse(target)?)?;
            entries.push(entry);
        }
        Ok(ImageList::Mapped(entries))
    }

    /// Load the list from whichever of the two files exists
    pub fn load(images_file: &Path, mapping_file: &Path) -> Result<(Self, ListOrigin)> {
        if let Some(content) = read_optional(mapping_file)? {
            tracing::debug!(path = %mapping_file.display(), "loading image mapping");
            let list = Self::parse_mapping(&content, mapping_file)?;
            return Ok((list, ListOrigin::Mapping(mapping_file.to_path_buf())));
        }

        if let Some(content) = read_optional(images_file)? {
            tracing::debug!(path = %images_file.display(), "loading image list");
            let list = Self::parse_plain(&content)?;
            return Ok((list, ListOrigin::Plain(images_file.to_path_buf())));
        }

        Ok((Self::empty(), ListOrigin::Empty))
    }

    /// Resolve every configured image into a transfer entry
    pub fn entries(&self, registry: &str, namespace: &str) -> Result<Vec<TransferEntry>> {
        match self {
            ImageList::Derived(sources) => sources
                .iter()
                .map(|source| {
                    let target = source.derive_target(registry, namespace)?;
                    TransferEntry::new(source.clone(), target)
                })
                .collect(),
            ImageList::Mapped(entries) => Ok(entries.clone()),
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(MirrorError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPING: &str = "needImages.yaml";

    fn mapping(content: &str) -> Result<ImageList> {
        ImageList::parse_mapping(content, Path::new(MAPPING))
    }

    fn names(list: &ImageList) -> Vec<String> {
        match list {
            ImageList::Derived(sources) => sources.iter().map(ToString::to_string).collect(),
            ImageList::Mapped(entries) => entries.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_plain_list_skips_comments() {
        let list = ImageList::parse_plain("nginx:latest\n#comment\nalpine:3.18\n").unwrap();
        assert_eq!(names(&list), vec!["nginx:latest", "alpine:3.18"]);
    }

    #[test]
    fn test_plain_list_trims_and_skips_blank_lines() {
        let list = ImageList::parse_plain("  redis:7 \r\n\n\t\n# redis:6\nbusybox").unwrap();
        assert_eq!(names(&list), vec!["redis:7", "busybox:latest"]);
    }

    #[test]
    fn test_plain_list_rejects_bad_reference() {
        let err = ImageList::parse_plain("nginx:latest\nbad ref\n").unwrap_err();
        assert!(matches!(err, MirrorError::Reference { .. }));
    }

    #[test]
    fn test_mapping_keeps_document_order() {
        let yaml = "\
zookeeper:3.8: mirrors/zookeeper:3.8
alpine:3.18: mirrors/alpine:3.18
k8s.gcr.io/pause:3.2: mirrors/pause:3.2
";
        let list = mapping(yaml).unwrap();
        assert_eq!(
            names(&list),
            vec![
                "zookeeper:3.8 -> mirrors/zookeeper:3.8",
                "alpine:3.18 -> mirrors/alpine:3.18",
                "k8s.gcr.io/pause:3.2 -> mirrors/pause:3.2",
            ]
        );
    }

    #[test]
    fn test_mapping_rejects_non_string_values() {
        let err = mapping("nginx:latest: [a, b]\n").unwrap_err();
        assert!(matches!(err, MirrorError::Config(_)));
    }

    #[test]
    fn test_malformed_mapping_is_an_error() {
        let err = mapping("nginx:latest: [unclosed\n").unwrap_err();
        assert!(matches!(err, MirrorError::Yaml { .. }));
        assert!(err.to_string().contains(MAPPING));
    }

    #[test]
    fn test_mapping_rejects_digest_target() {
        let err = mapping("nginx:latest: mirrors/nginx@sha256:abc\n").unwrap_err();
        assert!(matches!(err, MirrorError::Reference { .. }));
    }

    #[test]
    fn test_empty_mapping() {
        assert!(mapping("").unwrap().is_empty());
        assert!(mapping("   \n").unwrap().is_empty());
    }

    #[test]
    fn test_entries_for_derived_list() {
        let list = ImageList::parse_plain("nginx:latest\nbitnami/redis:7.2\n").unwrap();
        let entries = list.entries("", "mirrors").unwrap();
        let rendered: Vec<String> = entries.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "nginx:latest -> mirrors/nginx:latest",
                "bitnami/redis:7.2 -> mirrors/bitnami_redis:7.2",
            ]
        );
    }

    #[test]
    fn test_entries_for_mapping_ignore_namespace() {
        let list = mapping("nginx:1.25: team/web:1.25\n").unwrap();
        let entries = list.entries("registry.example.com", "").unwrap();
        assert_eq!(entries[0].target.to_string(), "team/web:1.25");
    }
}
