//! Auto-detection of project defaults for the config wizard.
//!
//! Probes a project directory to suggest a title, the chapter list, chapter
//! header images and the stylesheet, based on the conventional layout.

use crate::config::Layout;
use globset::{Glob, GlobMatcher};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Detected default values for a project.
#[derive(Debug, Default)]
pub struct DetectedDefaults {
    pub title: Option<String>,
    pub chapters: Vec<String>,
    pub chapter_images: BTreeMap<String, PathBuf>,
    pub stylesheet: Option<PathBuf>,
}

/// Detect sensible defaults from a project root.
pub fn detect_defaults(layout: &Layout) -> DetectedDefaults {
    let chapters = detect_chapters(&layout.manuscript_dir());
    let chapter_images = chapters
        .iter()
        .filter_map(|chapter| {
            detect_chapter_image(&layout.images_dir(), chapter).map(|image| (chapter.clone(), image))
        })
        .collect();

    DetectedDefaults {
        title: detect_title(&layout.root),
        chapters,
        chapter_images,
        stylesheet: detect_stylesheet(layout),
    }
}

fn matcher(pattern: &str) -> GlobMatcher {
    Glob::new(pattern)
        .expect("detection glob is valid")
        .compile_matcher()
}

/// File names in `dir` matching `pattern`, sorted by name.
fn matching_files(dir: &Path, pattern: &str) -> Vec<String> {
    let matcher = matcher(pattern);
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(ToString::to_string))
        .filter(|name| matcher.is_match(name))
        .collect();
    names.sort();
    names
}

/// Markdown chapters in `manuscript/`, in file name order.
///
/// This is only a suggestion for the wizard; once written to `ebook.toml` the
/// configured order is authoritative.
pub fn detect_chapters(manuscript_dir: &Path) -> Vec<String> {
    matching_files(manuscript_dir, "*.md")
        .into_iter()
        .filter(|name| !name.starts_with('_'))
        .collect()
}

/// Header image for a numbered chapter, e.g. `03-chapter3.md` -> `chapters/ch3-header.png`.
pub fn detect_chapter_image(images_dir: &Path, chapter: &str) -> Option<PathBuf> {
    let number = chapter_number(chapter)?;
    if number == 0 {
        return None;
    }

    let candidate = PathBuf::from("chapters").join(format!("ch{number}-header.png"));
    if images_dir.join(&candidate).is_file() {
        Some(candidate)
    } else {
        None
    }
}

/// Leading number of a chapter file name.
fn chapter_number(chapter: &str) -> Option<u32> {
    let digits: String = chapter.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// `styles/ebook.css` if present, otherwise the first stylesheet in `styles/`.
///
/// Returned relative to the project root.
fn detect_stylesheet(layout: &Layout) -> Option<PathBuf> {
    let styles = PathBuf::from("styles");
    if layout.styles_dir().join("ebook.css").is_file() {
        return Some(styles.join("ebook.css"));
    }

    matching_files(&layout.styles_dir(), "*.css")
        .into_iter()
        .next()
        .map(|name| styles.join(name))
}

/// Detect title from directory name.
///
/// Transforms the directory name into a readable title by replacing
/// hyphens and underscores with spaces and applying title case.
fn detect_title(root: &Path) -> Option<String> {
    let canonical = root.canonicalize().ok()?;
    let dir_name = canonical.file_name()?.to_str()?;

    let title = dir_name
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}
