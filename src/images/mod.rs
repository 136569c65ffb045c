//! Batch generation of the book's illustrations.
//!
//! Each [`ImageSpec`] in the catalog names a target file under `images/` and the
//! prompt that produces it. A spec whose target already exists with a non-zero
//! size is considered done and never touched again, so re-running the batch after
//! a partial failure only regenerates what is still missing.
//!
//! Every spec goes through the same small state machine:
//!
//! ```text
//! pending --exists--> skipped
//! pending --attempt--> success
//! pending --attempt--> attempt (retry, backoff delay * n) ... --> failed
//! ```
//!
//! No error is fatal to the batch: a failing spec is retried up to the configured
//! bound, recorded as failed, and the batch moves on to the next one.

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod gemini;
pub use gemini::Gemini;

/// One illustration to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    /// Target file, relative to `images/`
    pub path: PathBuf,
    /// Human readable label used in progress output
    pub description: String,
    pub prompt: String,
}

/// A piece of a generation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
}

/// Something that turns a prompt into response parts, usually a remote model.
pub trait ImageGenerator {
    fn generate(&mut self, prompt: &str) -> Result<Vec<Part>>;
}

impl<G: ImageGenerator + ?Sized> ImageGenerator for &mut G {
    fn generate(&mut self, prompt: &str) -> Result<Vec<Part>> {
        (**self).generate(prompt)
    }
}

/// Terminal state of a single spec.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Skipped,
    Failed,
}

/// Per-outcome lists of spec paths, in catalog order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub success: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl BatchReport {
    pub fn record(&mut self, path: PathBuf, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.success.push(path),
            Outcome::Skipped => self.skipped.push(path),
            Outcome::Failed => self.failed.push(path),
        }
    }

    pub fn total(&self) -> usize {
        self.success.len() + self.skipped.len() + self.failed.len()
    }

    /// Images on disk after the run, whether generated now or earlier.
    pub fn ready(&self) -> usize {
        self.success.len() + self.skipped.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// How hard to try before giving up on a spec.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Pause between specs; the n-th retry waits `delay * n`
    pub delay: Duration,
}

/// True once a target exists with content.
pub fn is_satisfied(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Runs the catalog through a generator, sleeping through `sleep`.
pub struct BatchGenerator<G, S> {
    images_dir: PathBuf,
    policy: RetryPolicy,
    style_suffix: String,
    generator: G,
    sleep: S,
}

impl<G, S> BatchGenerator<G, S>
where
    G: ImageGenerator,
    S: FnMut(Duration),
{
    pub fn new<P: Into<PathBuf>>(images_dir: P, policy: RetryPolicy, generator: G, sleep: S) -> Self {
        BatchGenerator {
            images_dir: images_dir.into(),
            policy,
            style_suffix: String::new(),
            generator,
            sleep,
        }
    }

    pub fn with_style_suffix<S2: ToString>(mut self, suffix: S2) -> Self {
        self.style_suffix = suffix.to_string();
        self
    }

    pub fn target(&self, spec: &ImageSpec) -> PathBuf {
        self.images_dir.join(&spec.path)
    }

    fn prompt_for(&self, spec: &ImageSpec) -> String {
        let suffix = self.style_suffix.trim();
        if suffix.is_empty() {
            spec.prompt.clone()
        } else {
            format!("{} {suffix}", spec.prompt)
        }
    }

    /// Process every spec in order and report where each one ended up.
    pub fn generate_all(&mut self, specs: &[ImageSpec], progress: &ProgressBar) -> BatchReport {
        let mut report = BatchReport::default();

        for (i, spec) in specs.iter().enumerate() {
            progress.set_message(spec.description.clone());
            log::info!(
                "[{}/{}] {} -> {}",
                i + 1,
                specs.len(),
                spec.description,
                spec.path.display()
            );

            let outcome = self.generate_one(spec);
            report.record(spec.path.clone(), outcome);
            progress.inc(1);

            // pace the remote service, whatever happened to this spec
            if i + 1 < specs.len() {
                (self.sleep)(self.policy.delay);
            }
        }

        progress.finish_and_clear();
        report
    }

    /// Drive a single spec to its terminal state.
    pub fn generate_one(&mut self, spec: &ImageSpec) -> Outcome {
        let target = self.target(spec);
        if is_satisfied(&target) {
            log::info!("[SKIP] {} already exists", spec.path.display());
            return Outcome::Skipped;
        }

        let prompt = self.prompt_for(spec);
        let max = self.policy.max_retries;
        for attempt in 1..=max {
            log::info!("[TRY {attempt}/{max}] generating {}", spec.description);

            match self.attempt(&prompt, &target) {
                Ok(Some(size)) => {
                    log::info!("[OK] {} saved ({})", spec.path.display(), format_size(size));
                    return Outcome::Success;
                }
                Ok(None) => log::warn!(
                    "{}: response had no image (attempt {attempt}/{max})",
                    spec.path.display()
                ),
                Err(e) => log::warn!(
                    "{}: attempt {attempt}/{max} failed: {e:#}",
                    spec.path.display()
                ),
            }

            if attempt < max {
                let wait = self.policy.delay * attempt;
                log::info!("retrying in {}s", wait.as_secs());
                (self.sleep)(wait);
            }
        }

        log::error!("[FAIL] {} failed after {max} attempts", spec.path.display());
        Outcome::Failed
    }

    /// One generation call; `Ok(None)` when the response carried no image.
    fn attempt(&mut self, prompt: &str, target: &Path) -> Result<Option<u64>> {
        let parts = self.generator.generate(prompt)?;
        let Some(data) = first_image(&parts) else {
            for part in &parts {
                if let Part::Text(text) = part {
                    log::debug!("model text: {text}");
                }
            }
            return Ok(None);
        };

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(target, data)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        Ok(Some(data.len() as u64))
    }
}

/// Bytes of the first inline part whose MIME type is an image.
pub fn first_image(parts: &[Part]) -> Option<&[u8]> {
    parts.iter().find_map(|part| match part {
        Part::InlineData { mime_type, data } if mime_type.starts_with("image/") => {
            Some(data.as_slice())
        }
        _ => None,
    })
}

/// Which specs a run would generate, without generating anything.
pub fn plan<'a>(images_dir: &Path, specs: &'a [ImageSpec]) -> Vec<(&'a ImageSpec, Outcome)> {
    specs
        .iter()
        .map(|spec| {
            let outcome = if is_satisfied(&images_dir.join(&spec.path)) {
                Outcome::Skipped
            } else {
                Outcome::Success
            };
            (spec, outcome)
        })
        .collect()
}

pub fn format_size(bytes: u64) -> String {
    byte_unit::Byte::from_u64(bytes)
        .get_appropriate_unit(byte_unit::UnitType::Binary)
        .to_string()
}
