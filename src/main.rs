use anyhow::{anyhow, Context, Result};
use cli::{BuildArgs, Cli, Engine, ImagesArgs};
use config::{Configuration, Layout};
use images::{BatchGenerator, BatchReport, Gemini, Outcome, RetryPolicy};
use indicatif::{ProgressBar, ProgressStyle};
use sinks::{Html, Pandoc, Render, RenderContext, Sink};
use std::process::ExitCode;
use std::time::Duration;

mod cli;
mod config;
mod config_wizard;
mod detection;
mod images;
mod manuscript;
mod sinks;
mod verify;

fn main() -> ExitCode {
    init_logging();

    match try_main() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {e:#}", console::style("Error").red());
            ExitCode::FAILURE
        }
    }
}

/// Route `log` records to stderr, filtered by `EBOOK_FORGE_LOG` (default `info`).
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("EBOOK_FORGE_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn try_main() -> Result<ExitCode> {
    use clap::Parser;
    let cli = Cli::parse();

    let layout = Layout::new(&cli.root);
    let config_path = cli.config.clone().unwrap_or_else(|| layout.config_path());

    match &cli.command {
        cli::Commands::Config => {
            config_wizard::run(&layout, &config_path)?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Commands::Build(args) => {
            let config = Configuration::load(&config_path)?;
            build(&layout, &config, args)
        }
        cli::Commands::Images(args) => {
            let config = Configuration::load(&config_path)?;
            generate_images(&layout, &config, args)
        }
        cli::Commands::Verify => {
            let config = Configuration::load(&config_path)?;
            verify_images(&layout, &config)
        }
    }
}

fn banner(title: &str) {
    let rule = "=".repeat(50);
    println!("{rule}");
    println!("  {title}");
    println!("{rule}");
}

fn build(layout: &Layout, config: &Configuration, args: &BuildArgs) -> Result<ExitCode> {
    banner(&format!("{} -- {}", config.book.title, config.book.author));

    let output_dir = layout.output_dir();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    // fail before doing any work if the converter can't run
    let pandoc = Pandoc::locate().with_context(|| "pandoc is required to build the book")?;
    println!("Using {}", pandoc.version);

    println!("  [1/3] Merging manuscript...");
    let document =
        manuscript::assemble(layout, &config.book.chapters, &config.book.chapter_images)?;
    println!(
        "        {} characters merged",
        document.text.chars().count()
    );
    if !document.missing.is_empty() {
        println!(
            "        {} chapter(s) skipped: {}",
            console::style(document.missing.len()).yellow(),
            document.missing.join(", ")
        );
    }

    let sink = match args.engine {
        Engine::Html => Sink::Html(Html::new(&config.book.stylesheet)),
        Engine::Xelatex => Sink::XeLaTeX(config.xelatex.clone()),
    };
    let metadata = config.book.metadata()?;
    let context = RenderContext {
        root: &layout.root,
        output_dir: &output_dir,
        output_name: &config.book.output_name,
        metadata: &metadata,
    };

    println!("  [2/3] Converting with pandoc...");
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("can parse progress style"),
    );
    spinner.set_message(format!("Rendering {}", sink.outfile(&context).display()));
    spinner.enable_steady_tick(Duration::from_millis(120));
    let rendered = sinks::render_document(&sink, &document.text, &context, &pandoc);
    spinner.finish_and_clear();
    let outfile = rendered?;

    let size = std::fs::metadata(&outfile)
        .map(|m| m.len())
        .unwrap_or_default();
    println!("  [3/3] Done!");
    println!(
        "        Output: {} ({})",
        outfile.display(),
        images::format_size(size)
    );

    Ok(ExitCode::SUCCESS)
}

fn generate_images(layout: &Layout, config: &Configuration, args: &ImagesArgs) -> Result<ExitCode> {
    let images_dir = layout.images_dir();
    let specs = &config.images.specs;

    if args.dry_run {
        for (spec, outcome) in images::plan(&images_dir, specs) {
            let status = match outcome {
                Outcome::Skipped => console::style("exists  ").dim(),
                _ => console::style("generate").cyan(),
            };
            println!("  [{status}] {} ({})", spec.path.display(), spec.description);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let api_key = args
        .api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| anyhow!("GEMINI_API_KEY environment variable is not set"))?;

    banner("Generating ebook images");
    println!("  Model:  {}", config.images.model);
    println!("  Images: {}", specs.len());
    println!("  Delay:  {}s", config.images.delay_seconds);
    println!();

    let progress = ProgressBar::new(specs.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("can parse progress style")
            .progress_chars("#>-"),
    );

    let policy = RetryPolicy {
        max_retries: config.images.max_retries,
        delay: config.images.delay(),
    };
    let gemini = Gemini::new(api_key, &config.images.model);
    let report = BatchGenerator::new(&images_dir, policy, gemini, std::thread::sleep)
        .with_style_suffix(&config.images.style_suffix)
        .generate_all(specs, &progress);

    print_report(&report);

    if report.has_failures() {
        println!("  Some images failed. Run again to regenerate only the failed ones.");
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_report(report: &BatchReport) {
    println!();
    banner("Summary");
    println!("  Generated: {}", report.success.len());
    for path in &report.success {
        println!("    {} {}", console::style("✓").green(), path.display());
    }
    println!("  Skipped:   {}", report.skipped.len());
    for path in &report.skipped {
        println!("    {} {}", console::style("-").dim(), path.display());
    }
    println!("  Failed:    {}", report.failed.len());
    for path in &report.failed {
        println!("    {} {}", console::style("✗").red(), path.display());
    }
    println!("{}", "=".repeat(50));
    println!("  {}/{} images ready", report.ready(), report.total());
}

fn verify_images(layout: &Layout, config: &Configuration) -> Result<ExitCode> {
    let document =
        manuscript::assemble(layout, &config.book.chapters, &config.book.chapter_images)?;
    let references = verify::image_references(&document.text, &layout.root);

    println!("=== Image references ===");
    for reference in &references {
        if reference.exists {
            println!("  [{}] {}", console::style("OK  ").green(), reference.target);
        } else {
            println!(
                "  [{}] {} (expected at {})",
                console::style("FAIL").red(),
                reference.target,
                reference.path.display()
            );
        }
    }

    let found = references.iter().filter(|r| r.exists).count();
    println!();
    println!("Total: {found}/{} images found", references.len());
    if !document.missing.is_empty() {
        println!("Missing chapters: {}", document.missing.join(", "));
    }

    if found == references.len() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
