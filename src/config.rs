//! Project configuration and filesystem layout.
//!
//! Everything that describes *this particular book* lives in `ebook.toml` at the
//! project root: metadata, the ordered chapter list, the chapter-to-image map,
//! XeLaTeX typesetting parameters and the illustration catalog. The code never
//! hard-codes any of it; a bundled default (the original title's tables) is used
//! by the config wizard as a starting point.

use crate::images::ImageSpec;
use crate::sinks::{Metadata, MetadataBuilder, XeLaTeX};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the project root.
pub const CONFIG_FILE: &str = "ebook.toml";

const BUNDLED_CONFIG: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/ebook.toml"));

/// Complete configuration for an ebook project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub book: Book,
    #[serde(default)]
    pub xelatex: XeLaTeX,
    #[serde(default)]
    pub images: Images,
}

impl Default for Configuration {
    fn default() -> Self {
        toml::from_str(BUNDLED_CONFIG).expect("bundled configuration is valid")
    }
}

impl Configuration {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Configuration> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to load {} - run 'ebook-forge config' first",
                path.display()
            )
        })?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialise configuration to TOML")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Book metadata and manuscript ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    /// BCP 47 language tag handed to pandoc
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Publication date shown on the PDF title page. Defaults to the current month.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Base name of the rendered artifacts inside `output/`
    pub output_name: String,
    /// Stylesheet inlined into HTML output, relative to the project root
    #[serde(default = "default_stylesheet")]
    pub stylesheet: PathBuf,
    /// Chapter file names inside `manuscript/`, in reading order
    #[serde(default)]
    pub chapters: Vec<String>,
    /// Chapter file name -> header image, relative to `images/`
    #[serde(default)]
    pub chapter_images: BTreeMap<String, PathBuf>,
}

fn default_lang() -> String {
    "ko".to_string()
}

fn default_stylesheet() -> PathBuf {
    PathBuf::from("styles/ebook.css")
}

impl Book {
    /// Metadata passed to the converter, with the date resolved.
    pub fn metadata(&self) -> Result<Metadata> {
        let date = self
            .date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y년 %m월").to_string());
        MetadataBuilder::default()
            .title(self.title.as_str())
            .author(self.author.as_str())
            .lang(self.lang.as_str())
            .date(date)
            .build()
            .with_context(|| "Failed to build document metadata")
    }
}

/// Illustration catalog and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Images {
    #[serde(default = "default_model")]
    pub model: String,
    /// Base delay between specs; retries back off by multiples of it
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Appended to every prompt when not empty
    #[serde(default)]
    pub style_suffix: String,
    #[serde(default)]
    pub specs: Vec<ImageSpec>,
}

fn default_model() -> String {
    "gemini-2.0-flash-exp-image-generation".to_string()
}
fn default_delay_seconds() -> u64 {
    3
}
fn default_max_retries() -> u32 {
    3
}

impl Default for Images {
    fn default() -> Self {
        Images {
            model: default_model(),
            delay_seconds: default_delay_seconds(),
            max_retries: default_max_retries(),
            style_suffix: String::new(),
            specs: Vec::new(),
        }
    }
}

impl Images {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }
}

/// Fixed directory layout below the project root.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
}

impl Layout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Layout {
        Layout { root: root.into() }
    }

    pub fn manuscript_dir(&self) -> PathBuf {
        self.root.join("manuscript")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn styles_dir(&self) -> PathBuf {
        self.root.join("styles")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bundled_configuration_parses() {
        let config = Configuration::default();
        assert_eq!(config.book.chapters.len(), 9);
        assert_eq!(config.book.chapters[0], "00-cover.md");
        assert_eq!(
            config.book.chapter_images.get("07-appendix.md"),
            Some(&PathBuf::from("chapters/ch7-header.png"))
        );
        assert_eq!(config.images.specs.len(), 12);
        assert_eq!(config.images.max_retries, 3);
        assert_eq!(config.xelatex.mainfont, "Noto Sans KR");
    }

    #[test]
    fn can_save_and_reload_configuration() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let path = dir.path().join(CONFIG_FILE);
        let config = Configuration::default();
        config.save(&path).expect("can save configuration");

        let loaded = Configuration::load(&path).expect("can load configuration");
        assert_eq!(loaded.book.chapters, config.book.chapters);
        assert_eq!(loaded.book.chapter_images, config.book.chapter_images);
        assert_eq!(loaded.images.specs, config.images.specs);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: Configuration = toml::from_str(
            r#"
            [book]
            title = "제목"
            author = "저자"
            output_name = "book"
            "#,
        )
        .expect("can parse minimal configuration");
        assert_eq!(config.book.lang, "ko");
        assert!(config.book.chapters.is_empty());
        assert_eq!(config.images.delay(), Duration::from_secs(3));
        assert_eq!(config.xelatex.linkcolor, "blue");
    }

    #[test]
    fn explicit_date_is_kept_in_metadata() {
        let mut book = Configuration::default().book;
        book.date = Some("2025년 01월".to_string());
        let metadata = book.metadata().expect("can build metadata");
        assert_eq!(metadata.date.as_deref(), Some("2025년 01월"));
        assert_eq!(metadata.lang, "ko");
    }

    #[test]
    fn missing_config_file_mentions_wizard() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let err = Configuration::load(dir.path().join(CONFIG_FILE)).unwrap_err();
        assert!(format!("{err:#}").contains("ebook-forge config"));
    }
}
