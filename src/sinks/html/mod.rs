//! Standalone HTML output with the book stylesheet inlined.
//!
//! Pandoc produces a standalone HTML5 page; afterwards the project stylesheet is
//! copied into a `<style>` block just before `</head>` so the file can be opened
//! (or printed to PDF by a browser) without any sibling assets.

use super::pandoc::metadata_args;
use super::{Converter, Render, RenderContext};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const HEAD_CLOSE: &str = "</head>";

#[derive(Debug, Clone)]
pub struct Html {
    /// Stylesheet to inline, relative to the project root
    pub stylesheet: PathBuf,
}

impl Html {
    pub fn new<P: Into<PathBuf>>(stylesheet: P) -> Html {
        Html {
            stylesheet: stylesheet.into(),
        }
    }

    fn options(&self, context: &RenderContext) -> Vec<String> {
        let mut options = vec![
            "--standalone".to_string(),
            "--from=markdown+raw_html+fenced_divs+bracketed_spans".to_string(),
            "--to=html5".to_string(),
        ];
        options.extend(metadata_args(context.metadata, false));
        options.push("--wrap=none".to_string());
        options.push(format!("--resource-path={}", context.root.display()));
        options
    }
}

impl Render for Html {
    fn outfile(&self, context: &RenderContext) -> PathBuf {
        context
            .output_dir
            .join(format!("{}-pandoc.html", context.output_name))
    }

    fn render(
        &self,
        input: &Path,
        context: &RenderContext,
        converter: &dyn Converter,
    ) -> Result<PathBuf> {
        let outfile = self.outfile(context);
        converter
            .convert(input, &outfile, &self.options(context))
            .with_context(|| "Pandoc HTML conversion failed")?;

        let stylesheet = context.root.join(&self.stylesheet);
        let css = std::fs::read_to_string(&stylesheet)
            .with_context(|| format!("Failed to read stylesheet {}", stylesheet.display()))?;
        let html = std::fs::read_to_string(&outfile)
            .with_context(|| format!("Failed to read {}", outfile.display()))?;

        match inline_stylesheet(&html, &css) {
            Some(html) => std::fs::write(&outfile, html)
                .with_context(|| format!("Failed to write {}", outfile.display()))?,
            None => log::warn!(
                "{} has no {HEAD_CLOSE}, stylesheet not inlined",
                outfile.display()
            ),
        }

        Ok(outfile)
    }
}

/// Insert a `<style>` block with `css` before the first `</head>`.
///
/// Returns `None` when the document has no head to close.
pub fn inline_stylesheet(html: &str, css: &str) -> Option<String> {
    let at = html.find(HEAD_CLOSE)?;
    let mut out = String::with_capacity(html.len() + css.len() + 32);
    out.push_str(&html[..at]);
    out.push_str("\n<style>\n");
    out.push_str(css);
    out.push_str("\n</style>\n");
    out.push_str(&html[at..]);
    Some(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sinks::test::{metadata, FakeConverter};
    use crate::sinks::{render_document, Sink};

    #[test]
    fn stylesheet_goes_right_before_head_close() {
        let html = "<html><head><title>t</title></head><body></body></html>";
        let out = inline_stylesheet(html, "body { color: red; }").expect("has a head");
        assert_eq!(
            out,
            "<html><head><title>t</title>\n<style>\nbody { color: red; }\n</style>\n</head><body></body></html>"
        );
    }

    #[test]
    fn documents_without_head_are_left_alone() {
        assert_eq!(inline_stylesheet("<p>fragment</p>", "p {}"), None);
    }

    #[test]
    fn renders_with_html_options_and_inlines_css() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let root = dir.path();
        let output_dir = root.join("output");
        std::fs::create_dir_all(root.join("styles")).expect("can create styles dir");
        std::fs::create_dir_all(&output_dir).expect("can create output dir");
        std::fs::write(root.join("styles/ebook.css"), "h1 { color: navy; }")
            .expect("can write stylesheet");

        let metadata = metadata();
        let context = RenderContext {
            root,
            output_dir: &output_dir,
            output_name: "claude-ebook-guide-by-jm",
            metadata: &metadata,
        };
        let converter = FakeConverter {
            output: Some("<html><head></head><body><h1>제목</h1></body></html>".to_string()),
            ..Default::default()
        };

        let sink = Sink::Html(Html::new("styles/ebook.css"));
        let outfile = render_document(&sink, "# 제목", &context, &converter)
            .expect("can render html");
        assert_eq!(outfile, output_dir.join("claude-ebook-guide-by-jm-pandoc.html"));

        let calls = converter.calls.borrow();
        let options = &calls[0].2;
        assert_eq!(options[0], "--standalone");
        assert!(options.contains(&"--to=html5".to_string()));
        assert!(options.contains(&"--wrap=none".to_string()));
        assert!(options.contains(&"--metadata=lang:ko".to_string()));
        assert!(!options.iter().any(|o| o.starts_with("--metadata=date:")));

        let html = std::fs::read_to_string(&outfile).expect("artifact exists");
        assert!(html.contains("<style>\nh1 { color: navy; }\n</style>\n</head>"));
    }

    #[test]
    fn failed_conversion_skips_css_step() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let metadata = metadata();
        let context = RenderContext {
            root: dir.path(),
            output_dir: dir.path(),
            output_name: "book",
            metadata: &metadata,
        };
        let converter = FakeConverter {
            fail_with: Some("Unknown extension".to_string()),
            ..Default::default()
        };

        // no stylesheet exists; reaching the CSS step would report that instead
        let err = render_document(&Sink::Html(Html::new("styles/ebook.css")), "x", &context, &converter)
            .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("Pandoc HTML conversion failed"));
        assert!(message.contains("Unknown extension"));
        assert!(!dir.path().join("book-pandoc.html").exists());
    }
}
