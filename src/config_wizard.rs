//! Interactive configuration wizard for creating `ebook.toml`.
//!
//! The wizard collects book metadata, lets the user pick which manuscript files
//! make up the book (pre-selected in file name order), maps chapters to header
//! images it finds under `images/chapters/`, and keeps the bundled illustration
//! catalog and typesetting defaults as a starting point for hand editing.

use crate::config::{Configuration, Layout};
use crate::detection::{detect_defaults, DetectedDefaults};
use anyhow::{anyhow, Context, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, FuzzySelect, Input, MultiSelect};
use std::path::{Path, PathBuf};

const LANGUAGES: &[&str] = &["ko", "en", "ja"];

/// Run the interactive configuration wizard.
///
/// Prompts the user for book metadata and chapter selection, then writes the
/// configuration to `config_path`.
pub fn run(layout: &Layout, config_path: &Path) -> Result<()> {
    let theme = ColorfulTheme {
        ..ColorfulTheme::default()
    };

    if !layout.root.is_dir() {
        return Err(anyhow!("Path '{}' isn't a directory!", layout.root.display()));
    }

    let DetectedDefaults {
        title: detected_title,
        chapters: detected_chapters,
        chapter_images,
        stylesheet: detected_stylesheet,
    } = detect_defaults(layout);

    let defaults = Configuration::default();
    let mut book = defaults.book.clone();

    book.title = Input::with_theme(&theme)
        .with_prompt("Book title")
        .with_initial_text(detected_title.unwrap_or(book.title))
        .allow_empty(false)
        .interact()
        .with_context(|| "Failed to obtain title")?;

    book.author = Input::with_theme(&theme)
        .with_prompt("Author")
        .default(book.author)
        .interact()
        .with_context(|| "Failed to obtain author")?;

    let lang_idx = FuzzySelect::with_theme(&theme)
        .with_prompt("Document language")
        .items(LANGUAGES)
        .default(0)
        .interact()?;
    book.lang = LANGUAGES[lang_idx].to_string();

    book.output_name = Input::with_theme(&theme)
        .with_prompt("Output file base name (inside output/)")
        .default(book.output_name)
        .validate_with(|input: &String| {
            if input.contains(['/', '\\']) {
                Err("Base name must not contain path separators")
            } else {
                Ok(())
            }
        })
        .interact()?;

    if detected_chapters.is_empty() {
        println!(
            "No chapters found in {}, keeping the default chapter list.",
            layout.manuscript_dir().display()
        );
    } else {
        let defaults: Vec<bool> = detected_chapters.iter().map(|_| true).collect();
        let selections = MultiSelect::with_theme(&theme)
            .with_prompt("Chapters to include (in this order; reorder later in ebook.toml)")
            .items(&detected_chapters)
            .defaults(&defaults)
            .interact()?;

        book.chapters = selections
            .into_iter()
            .map(|i| detected_chapters[i].clone())
            .collect();
        book.chapter_images = chapter_images
            .into_iter()
            .filter(|(chapter, _)| book.chapters.contains(chapter))
            .collect();
    }

    println!(
        "Chapter images: [{}]",
        book.chapter_images
            .iter()
            .map(|(chapter, image)| format!("{chapter} -> {}", image.display()))
            .collect::<Vec<String>>()
            .join("], [")
    );

    let stylesheet: String = Input::with_theme(&theme)
        .with_prompt("Stylesheet for HTML output")
        .default(
            detected_stylesheet
                .unwrap_or(book.stylesheet)
                .to_string_lossy()
                .to_string(),
        )
        .interact()?;
    book.stylesheet = PathBuf::from(stylesheet);

    let config = Configuration { book, ..defaults };

    if config_path.exists()
        && !Confirm::with_theme(&theme)
            .with_prompt(format!(
                "{} already exists, do you want to override it?",
                config_path.display()
            ))
            .interact()?
    {
        let contents = toml::to_string_pretty(&config)
            .with_context(|| "Failed to convert configuration to TOML")?;
        println!("Configuration:");
        println!("{}", contents);
    } else {
        config.save(config_path)?;
        println!("{} written!", config_path.display());
    }

    Ok(())
}
