use image_mirror::error::MirrorError;
use image_mirror::mirror::{ImageList, ListOrigin};
use std::path::Path;

fn load(dir: &Path) -> Result<(ImageList, ListOrigin), MirrorError> {
    ImageList::load(&dir.join("images.txt"), &dir.join("needImages.yaml"))
}

#[test]
fn test_plain_file_keeps_order_and_drops_comments() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("images.txt"),
        "# images mirrored nightly\nnginx:latest\n#comment\nalpine:3.18\ngcr.io/distroless/static:nonroot",
    )
    .unwrap();

    let (list, origin) = load(dir.path()).unwrap();

    assert_eq!(origin, ListOrigin::Plain(dir.path().join("images.txt")));
    assert_eq!(list.len(), 3);
    let targets: Vec<String> = list
        .entries("", "mirrors")
        .unwrap()
        .into_iter()
        .map(|entry| entry.source.to_string())
        .collect();
    assert_eq!(
        targets,
        vec!["nginx:latest", "alpine:3.18", "gcr.io/distroless/static:nonroot"]
    );
}

#[test]
fn test_missing_files_fall_back_to_empty_list() {
    let dir = tempfile::tempdir().unwrap();

    let (list, origin) = load(dir.path()).unwrap();

    assert!(list.is_empty());
    assert_eq!(origin, ListOrigin::Empty);
}

#[test]
fn test_mapping_file_wins_over_plain_list() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("images.txt"), "busybox:1.36\n").unwrap();
    std::fs::write(
        dir.path().join("needImages.yaml"),
        "# source: target\nquay.io/prometheus/node-exporter:v1.7.0: mirrors/node-exporter:v1.7.0\n",
    )
    .unwrap();

    let (list, origin) = load(dir.path()).unwrap();

    assert_eq!(origin, ListOrigin::Mapping(dir.path().join("needImages.yaml")));
    let entries = list.entries("", "").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source.name(), "quay.io/prometheus/node-exporter");
    assert_eq!(entries[0].target.to_string(), "mirrors/node-exporter:v1.7.0");
}

#[test]
fn test_malformed_mapping_is_reported_with_its_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("needImages.yaml"), "nginx:latest: [oops\n").unwrap();

    let err = load(dir.path()).unwrap_err();

    assert!(matches!(err, MirrorError::Yaml { .. }));
    assert!(err.to_string().contains("needImages.yaml"));
}

#[test]
fn test_unreadable_list_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the file is expected cannot be read as text
    std::fs::create_dir(dir.path().join("images.txt")).unwrap();

    let err = load(dir.path()).unwrap_err();

    assert!(matches!(err, MirrorError::Io { .. }));
}

#[test]
fn test_invalid_reference_fails_before_login() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("images.txt"), "alpine:3.18\nNginx:latest\n").unwrap();

    let err = load(dir.path()).unwrap_err();

    assert!(matches!(err, MirrorError::Reference { .. }));
    assert_eq!(err.stage(), "config");
}
