use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// A conversion that ran but exited unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionFailed {
    /// Exit status as reported by the OS
    pub status: String,
    pub stderr: String,
}

impl ConversionFailed {
    /// Keep only the first `limit` characters of the diagnostics.
    pub fn truncated(mut self, limit: usize) -> ConversionFailed {
        if let Some((at, _)) = self.stderr.char_indices().nth(limit) {
            self.stderr.truncate(at);
        }
        self
    }
}

impl std::fmt::Display for ConversionFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pandoc exited with {}:\n{}", self.status, self.stderr)
    }
}

impl std::error::Error for ConversionFailed {}

/// An out-of-process Markdown converter.
pub trait Converter {
    /// Convert `input` into `output`, passing `options` after the file arguments.
    ///
    /// A converter that runs but fails returns a [`ConversionFailed`] carrying
    /// its diagnostics.
    fn convert(&self, input: &Path, output: &Path, options: &[String]) -> Result<()>;
}

/// The `pandoc` binary found on `PATH`.
#[derive(Debug, Clone)]
pub struct Pandoc {
    program: PathBuf,
    /// First line of `pandoc --version`
    pub version: String,
}

impl Pandoc {
    /// Find pandoc and make sure it actually runs.
    pub fn locate() -> Result<Pandoc> {
        let program =
            which::which("pandoc").with_context(|| "pandoc is not installed or not on PATH")?;
        Pandoc::probe(program)
    }

    /// Run `<program> --version` to confirm the converter is usable.
    pub fn probe<P: Into<PathBuf>>(program: P) -> Result<Pandoc> {
        let program = program.into();
        let output = Command::new(&program)
            .arg("--version")
            .output()
            .with_context(|| format!("Failed to run {} --version", program.display()))?;
        if !output.status.success() {
            return Err(anyhow!(
                "{} --version exited with {}",
                program.display(),
                output.status
            ));
        }

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("pandoc")
            .trim()
            .to_string();
        Ok(Pandoc { program, version })
    }
}

impl Converter for Pandoc {
    fn convert(&self, input: &Path, output: &Path, options: &[String]) -> Result<()> {
        let result = Command::new(&self.program)
            .arg(input)
            .arg("-o")
            .arg(output)
            .args(options)
            .output()
            .with_context(|| format!("Failed to spawn {}", self.program.display()))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ConversionFailed {
                status: result.status.to_string(),
                stderr: stderr.trim().to_string(),
            }
            .into());
        }

        let stderr = String::from_utf8_lossy(&result.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            log::warn!("pandoc: {line}");
        }
        Ok(())
    }
}

/// `--metadata=key:value` arguments shared by every sink.
pub(crate) fn metadata_args(metadata: &super::Metadata, include_date: bool) -> Vec<String> {
    let mut args = vec![
        format!("--metadata=title:{}", metadata.title),
        format!("--metadata=author:{}", metadata.author),
    ];
    if include_date {
        if let Some(date) = &metadata.date {
            args.push(format!("--metadata=date:{date}"));
        }
    }
    args.push(format!("--metadata=lang:{}", metadata.lang));
    args
}
