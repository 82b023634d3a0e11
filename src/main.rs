/*!
 * Command-line interface for ctxscan
 */

use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::ThreadPoolBuilder;

use ctxscan::config::{Args, Config, Mode};
use ctxscan::report::{Reporter, ScanReport};
use ctxscan::scanner::Scanner;
use ctxscan::writer::{ContextRoot, XmlWriter};
use ctxscan::{render_tree, ScanLogger, SkipReport};

fn main() -> io::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    if let Some(shell) = args.generate {
        clap_complete::generate(shell, &mut Args::command(), "ctxscan", &mut io::stdout());
        return Ok(());
    }

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    // Create and validate configuration
    let mut config = Config::from_args(args);
    config.load_user_file()?;
    config.validate()?;

    // Configure thread pool
    if let Err(e) = ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build_global()
    {
        log::warn!("Failed to set thread pool size: {}", e);
    }

    let progress = ProgressBar::with_draw_target(
        Some(config.roots.len() as u64),
        ProgressDrawTarget::stderr(),
    );
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {wide_msg:.dim.white} {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress.set_prefix("📂 Scanning");

    let start_time = Instant::now();
    let scanner = Scanner::new(config.clone(), Arc::new(progress.clone()));
    let scans = scanner.scan()?;
    progress.finish_and_clear();

    let logger = ScanLogger::new(config.verbose);
    let mut skipped = SkipReport::default();
    let (mut files, mut directories) = (0, 0);
    for scan in &scans {
        skipped.merge(scan.skipped.clone());
        match config.mode {
            Mode::Tree => {
                if let Some(tree) = &scan.tree {
                    let (f, d) = tree.count();
                    files += f;
                    directories += d;
                }
            }
            Mode::Context | Mode::Files => {
                files += scan.files.len();
                directories += scan.tree.as_ref().map_or(0, |t| t.count().1);
            }
        }
    }

    let output = match config.mode {
        Mode::Context => {
            let roots: Vec<ContextRoot> = scans
                .iter()
                .map(|scan| ContextRoot {
                    path: scan.root.clone(),
                    tree: render_tree(scan.tree.as_ref()),
                    files: scan.files.clone(),
                })
                .collect();

            let writer = XmlWriter::new(logger);
            match &config.output_file {
                Some(path) => {
                    files = writer.write_file(path, &roots)?;
                    path.display().to_string()
                }
                None => {
                    files = writer.write(io::stdout().lock(), &roots)?;
                    "stdout".to_string()
                }
            }
        }
        Mode::Tree => {
            let text: String = scans
                .iter()
                .map(|scan| render_tree(scan.tree.as_ref()))
                .collect::<Vec<_>>()
                .join("\n");
            emit(&config, &text)?
        }
        Mode::Files => {
            let mut text = String::new();
            for path in scans.iter().flat_map(|scan| scan.files.iter()) {
                text.push_str(&path.display().to_string());
                text.push('\n');
            }
            emit(&config, &text)?
        }
    };

    let scan_report = ScanReport {
        output,
        duration: start_time.elapsed(),
        roots: scans.len(),
        files,
        directories,
        skipped,
    };
    Reporter::default().print_report(&scan_report);

    Ok(())
}

/// Write text output to the configured file, or stdout
fn emit(config: &Config, text: &str) -> io::Result<String> {
    match &config.output_file {
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(path.display().to_string())
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
            Ok("stdout".to_string())
        }
    }
}
