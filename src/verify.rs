//! Checks that every image the assembled manuscript refers to is on disk.
//!
//! Pandoc silently drops images it cannot resolve, so a missing illustration is
//! easy to miss in the rendered book. This walks the Markdown image references
//! of the merged document instead of the rendered output.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// `![alt](target "optional title")`, capturing the target.
static IMAGE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"!\[[^\]]*\]\(\s*([^)\s]+)"#).expect("image pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Target as written in the manuscript
    pub target: String,
    /// Where it resolves to below the project root
    pub path: PathBuf,
    pub exists: bool,
}

/// Every local image reference in `document`, in order of appearance.
///
/// Remote (`http://`, `https://`) and `data:` targets are not checked.
pub fn image_references(document: &str, root: &Path) -> Vec<ImageReference> {
    IMAGE_REFERENCE
        .captures_iter(document)
        .filter_map(|captures| captures.get(1))
        .map(|target| target.as_str())
        .filter(|target| !is_remote(target))
        .map(|target| {
            let path = root.join(target);
            ImageReference {
                target: target.to_string(),
                exists: path.is_file(),
                path,
            }
        })
        .collect()
}

fn is_remote(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://") || target.starts_with("data:")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn finds_local_references_and_checks_them() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        std::fs::create_dir_all(dir.path().join("images/chapters")).expect("can create dirs");
        std::fs::write(dir.path().join("images/chapters/ch1-header.png"), b"png")
            .expect("can write image");

        let document = "# 1장\n\
            ![챕터 이미지](images/chapters/ch1-header.png){.chapter-header-image}\n\
            text ![diagram](images/diagrams/flow.png \"흐름\")\n\
            ![remote](https://example.com/a.png)\n\
            [not an image](images/x.png)";

        let references = image_references(document, dir.path());
        assert_eq!(references.len(), 2);
        assert_eq!(references[0].target, "images/chapters/ch1-header.png");
        assert!(references[0].exists);
        assert_eq!(references[1].target, "images/diagrams/flow.png");
        assert!(!references[1].exists);
    }

    #[test]
    fn documents_without_images_have_no_references() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        assert!(image_references("# Title\nplain text", dir.path()).is_empty());
    }
}
