//! Manuscript assembly.
//!
//! Chapters are read in the order given by the configuration (never the order
//! the filesystem lists them in), stripped of their YAML front matter, decorated
//! with a header image after their first top-level heading when one is mapped
//! and present on disk, and joined into a single Markdown document separated by
//! horizontal rules.
//!
//! Missing chapters are not fatal: a partial book is still a valid book while
//! it is being written, so they are logged and skipped.

use crate::config::Layout;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Placed between consecutive chapters.
pub const CHAPTER_SEPARATOR: &str = "\n\n---\n\n";

const HEADER_IMAGE_ALT: &str = "챕터 이미지";
const HEADER_IMAGE_CLASS: &str = "chapter-header-image";

/// A line starting with exactly one `#`, then whitespace, then the heading text.
static TOP_LEVEL_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#[^\S\n]+.+$").expect("heading pattern is valid"));

/// One entry of the configured chapter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterFile {
    /// Position in the configured reading order
    pub position: usize,
    /// File name inside `manuscript/`
    pub filename: String,
    /// Header image relative to `images/`, if one is mapped
    pub header_image: Option<PathBuf>,
}

impl ChapterFile {
    /// Pair every configured chapter with its mapped header image.
    pub fn from_config(
        chapters: &[String],
        chapter_images: &BTreeMap<String, PathBuf>,
    ) -> Vec<ChapterFile> {
        chapters
            .iter()
            .enumerate()
            .map(|(position, filename)| ChapterFile {
                position,
                filename: filename.clone(),
                header_image: chapter_images.get(filename).cloned(),
            })
            .collect()
    }
}

/// The merged manuscript, plus the chapters that could not be found.
#[derive(Debug, Default)]
pub struct AssembledDocument {
    pub text: String,
    pub missing: Vec<String>,
}

/// Merge the configured chapters into one document.
pub fn assemble(
    layout: &Layout,
    chapters: &[String],
    chapter_images: &BTreeMap<String, PathBuf>,
) -> Result<AssembledDocument> {
    let mut parts: Vec<String> = Vec::with_capacity(chapters.len());
    let mut missing = Vec::new();

    for chapter in ChapterFile::from_config(chapters, chapter_images) {
        let path = layout.manuscript_dir().join(&chapter.filename);
        if !path.is_file() {
            log::warn!("{} not found, skipping", chapter.filename);
            missing.push(chapter.filename);
            continue;
        }
        log::debug!("chapter {}: {}", chapter.position + 1, path.display());

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read chapter {}", path.display()))?;
        let mut body = strip_front_matter(&contents).to_string();

        if let Some(image) = &chapter.header_image {
            if layout.images_dir().join(image).is_file() {
                body = inject_after_first_heading(&body, &header_image_tag(image));
            } else {
                log::debug!(
                    "header image {} for {} is not present yet",
                    image.display(),
                    chapter.filename
                );
            }
        }

        parts.push(body.trim().to_string());
    }

    Ok(AssembledDocument {
        text: parts.join(CHAPTER_SEPARATOR),
        missing,
    })
}

/// Remove a front-matter block, but only when it opens the file.
///
/// The block is a `---` line, any content, and a closing `---` line followed by a
/// newline. Front matter preceded by anything at all, even blank lines, is left
/// alone.
pub fn strip_front_matter(contents: &str) -> &str {
    let Some(rest) = contents.strip_prefix("---\n") else {
        return contents;
    };
    match rest.find("\n---\n") {
        Some(end) => &rest[end + "\n---\n".len()..],
        None => contents,
    }
}

/// Insert `tag` right after the first top-level heading line, if there is one.
pub fn inject_after_first_heading(body: &str, tag: &str) -> String {
    match TOP_LEVEL_HEADING.find(body) {
        Some(heading) => {
            let mut out = String::with_capacity(body.len() + tag.len());
            out.push_str(&body[..heading.end()]);
            out.push_str(tag);
            out.push_str(&body[heading.end()..]);
            out
        }
        None => body.to_string(),
    }
}

/// Markdown image reference for a header image, relative to the project root.
fn header_image_tag(image: &std::path::Path) -> String {
    let relative = image.to_string_lossy().replace('\\', "/");
    format!("\n![{HEADER_IMAGE_ALT}](images/{relative}){{.{HEADER_IMAGE_CLASS}}}\n")
}
