//! Output sinks for the assembled manuscript.
//!
//! Both sinks hand the document to pandoc through the [`Converter`] trait so the
//! orchestration can be tested without a real pandoc installation. The merged
//! Markdown is written to a temporary file inside `output/`, which is removed
//! when rendering returns, successfully or not.

use anyhow::{Context, Result};
use derive_builder::Builder;
use std::io::Write;
use std::path::{Path, PathBuf};

mod html;
pub use html::*;

mod pandoc;
pub use pandoc::*;

mod xelatex;
pub use xelatex::*;

/// Document metadata handed to the converter.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
#[builder(setter(into))]
pub struct Metadata {
    pub title: String,
    pub author: String,
    pub lang: String,
    /// Only typeset output shows a date
    #[builder(setter(into, strip_option), default)]
    pub date: Option<String>,
}

/// Where and under which name a sink writes its artifact.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    /// Project root, used as pandoc's resource path so image references resolve
    pub root: &'a Path,
    pub output_dir: &'a Path,
    /// Artifact base name; each sink appends its own suffix
    pub output_name: &'a str,
    pub metadata: &'a Metadata,
}

#[derive(Debug)]
pub enum Sink {
    Html(Html),
    XeLaTeX(XeLaTeX),
}

pub trait Render {
    /// Path of the artifact this sink produces.
    fn outfile(&self, context: &RenderContext) -> PathBuf;

    /// Convert the Markdown file at `input`, returning the artifact path.
    fn render(
        &self,
        input: &Path,
        context: &RenderContext,
        converter: &dyn Converter,
    ) -> Result<PathBuf>;
}

impl Render for Sink {
    fn outfile(&self, context: &RenderContext) -> PathBuf {
        match self {
            Sink::Html(h) => h.outfile(context),
            Sink::XeLaTeX(x) => x.outfile(context),
        }
    }

    fn render(
        &self,
        input: &Path,
        context: &RenderContext,
        converter: &dyn Converter,
    ) -> Result<PathBuf> {
        match self {
            Sink::Html(h) => h.render(input, context, converter),
            Sink::XeLaTeX(x) => x.render(input, context, converter),
        }
    }
}

/// Persist `document` next to the outputs and render it through `sink`.
pub fn render_document(
    sink: &Sink,
    document: &str,
    context: &RenderContext,
    converter: &dyn Converter,
) -> Result<PathBuf> {
    let mut merged = tempfile::Builder::new()
        .prefix("_merged")
        .suffix(".md")
        .tempfile_in(context.output_dir)
        .with_context(|| {
            format!(
                "Failed to create merged manuscript in {}",
                context.output_dir.display()
            )
        })?;
    merged
        .write_all(document.as_bytes())
        .and_then(|_| merged.flush())
        .with_context(|| "Failed to write merged manuscript")?;
    log::debug!("merged manuscript written to {}", merged.path().display());

    // `merged` is deleted when it drops, on both the success and error paths
    sink.render(merged.path(), context, converter)
}
