//! PDF output typeset by pandoc's XeLaTeX engine.
//!
//! XeLaTeX is the pandoc engine that handles Korean text without extra packages,
//! provided the configured fonts are installed locally.

use super::pandoc::metadata_args;
use super::{ConversionFailed, Converter, Render, RenderContext};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// LaTeX logs are long; only the head of a failure's stderr is reported.
const MAX_DIAGNOSTIC_CHARS: usize = 500;

/// XeLaTeX typesetting parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XeLaTeX {
    /// LaTeX paper name passed to the geometry package
    #[serde(default = "default_paper")]
    pub paper: String,
    #[serde(default = "default_margin_vertical")]
    pub margin_top_mm: u32,
    #[serde(default = "default_margin_vertical")]
    pub margin_bottom_mm: u32,
    #[serde(default = "default_margin_horizontal")]
    pub margin_left_mm: u32,
    #[serde(default = "default_margin_horizontal")]
    pub margin_right_mm: u32,
    /// Body font family; must support Hangul
    #[serde(default = "default_mainfont")]
    pub mainfont: String,
    #[serde(default = "default_monofont")]
    pub monofont: String,
    #[serde(default = "default_fontsize")]
    pub fontsize_pt: u32,
    #[serde(default = "default_linestretch")]
    pub linestretch: f32,
    #[serde(default = "default_linkcolor")]
    pub linkcolor: String,
}

fn default_paper() -> String {
    "a4paper".to_string()
}
fn default_margin_vertical() -> u32 {
    25
}
fn default_margin_horizontal() -> u32 {
    22
}
fn default_mainfont() -> String {
    "Noto Sans KR".to_string()
}
fn default_monofont() -> String {
    "D2Coding".to_string()
}
fn default_fontsize() -> u32 {
    11
}
fn default_linestretch() -> f32 {
    1.7
}
fn default_linkcolor() -> String {
    "blue".to_string()
}

impl Default for XeLaTeX {
    fn default() -> Self {
        XeLaTeX {
            paper: default_paper(),
            margin_top_mm: default_margin_vertical(),
            margin_bottom_mm: default_margin_vertical(),
            margin_left_mm: default_margin_horizontal(),
            margin_right_mm: default_margin_horizontal(),
            mainfont: default_mainfont(),
            monofont: default_monofont(),
            fontsize_pt: default_fontsize(),
            linestretch: default_linestretch(),
            linkcolor: default_linkcolor(),
        }
    }
}

impl XeLaTeX {
    fn geometry(&self) -> String {
        format!(
            "geometry:{},top={}mm,bottom={}mm,left={}mm,right={}mm",
            self.paper,
            self.margin_top_mm,
            self.margin_bottom_mm,
            self.margin_left_mm,
            self.margin_right_mm
        )
    }

    fn options(&self, context: &RenderContext) -> Vec<String> {
        let mut options = vec![
            "--pdf-engine=xelatex".to_string(),
            "--from=markdown+raw_html+fenced_divs".to_string(),
        ];
        options.extend(metadata_args(context.metadata, true));

        let variables = [
            self.geometry(),
            format!("mainfont:{}", self.mainfont),
            format!("monofont:{}", self.monofont),
            format!("fontsize={}pt", self.fontsize_pt),
            format!("linestretch={}", self.linestretch),
            "colorlinks=true".to_string(),
            format!("linkcolor={}", self.linkcolor),
        ];
        for variable in variables {
            options.push("-V".to_string());
            options.push(variable);
        }

        options.push(format!("--resource-path={}", context.root.display()));
        options
    }
}

impl Render for XeLaTeX {
    fn outfile(&self, context: &RenderContext) -> PathBuf {
        context
            .output_dir
            .join(format!("{}-xelatex.pdf", context.output_name))
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
            .map_err(|e| match e.downcast::<ConversionFailed>() {
                Ok(failed) => anyhow::Error::from(failed.truncated(MAX_DIAGNOSTIC_CHARS)),
                Err(e) => e,
            })
            .with_context(|| "XeLaTeX PDF conversion failed")?;
        Ok(outfile)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sinks::test::metadata;

    #[test]
    #[cfg(unix)]
    fn pdf_failure_reports_only_the_head_of_stderr() {
        use crate::sinks::pandoc::test::stub_pandoc;
        use crate::sinks::Pandoc;

        let dir = tempfile::tempdir().expect("can create temp dir");
        let program = stub_pandoc(
            dir.path(),
            "head -c 2000 /dev/zero | tr '\\000' 'E' >&2\nexit 43",
        );
        let pandoc = Pandoc::probe(program).expect("stub answers --version");
        let metadata = metadata();
        let context = RenderContext {
            root: dir.path(),
            output_dir: dir.path(),
            output_name: "book",
            metadata: &metadata,
        };

        let err = XeLaTeX::default()
            .render(&dir.path().join("in.md"), &context, &pandoc)
            .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("XeLaTeX PDF conversion failed"));
        assert!(message.contains(&"E".repeat(MAX_DIAGNOSTIC_CHARS)));
        assert!(!message.contains(&"E".repeat(MAX_DIAGNOSTIC_CHARS + 1)));
    }

    #[test]
    fn can_serialize_xelatex() {
        let xelatex = XeLaTeX::default();
        toml::to_string(&xelatex).expect("can serialize XeLaTeX to TOML");
    }

    #[test]
    fn options_follow_the_typesetting_parameters() {
        let metadata = metadata();
        let root = Path::new("/books/claude");
        let context = RenderContext {
            root,
            output_dir: Path::new("/books/claude/output"),
            output_name: "book",
            metadata: &metadata,
        };
        let options = XeLaTeX::default().options(&context);

        assert_eq!(options[0], "--pdf-engine=xelatex");
        assert!(options.contains(&"--metadata=date:2025년 03월".to_string()));

        let variable = |name: &str| {
            options
                .windows(2)
                .find(|w| w[0] == "-V" && w[1].starts_with(name))
                .map(|w| w[1].clone())
        };
        assert_eq!(
            variable("geometry").as_deref(),
            Some("geometry:a4paper,top=25mm,bottom=25mm,left=22mm,right=22mm")
        );
        assert_eq!(variable("mainfont").as_deref(), Some("mainfont:Noto Sans KR"));
        assert_eq!(variable("monofont").as_deref(), Some("monofont:D2Coding"));
        assert_eq!(variable("fontsize").as_deref(), Some("fontsize=11pt"));
        assert_eq!(variable("linestretch").as_deref(), Some("linestretch=1.7"));
        assert_eq!(variable("colorlinks").as_deref(), Some("colorlinks=true"));
        assert_eq!(variable("linkcolor").as_deref(), Some("linkcolor=blue"));
        assert_eq!(
            options.last().map(String::as_str),
            Some("--resource-path=/books/claude")
        );
    }
}
