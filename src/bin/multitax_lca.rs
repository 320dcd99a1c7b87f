use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use multitax_rs::lineage::DEFAULT_CLIMB_BOUND;
use multitax_rs::{default_results_path, refine_hits, RefineConfig};

/// Reduce BLAST hits to one LCA taxon per query and export Krona counts.
#[derive(Parser, Debug)]
#[command(name = "multitax-lca", version, about)]
struct Args {
    /// BLAST tabular output (13 columns, last one staxids), plain or gzipped
    #[arg(short, long)]
    blast: PathBuf,

    /// Taxonomy dump made of `ID : <taxid>` blocks
    #[arg(short, long)]
    taxonomy: PathBuf,

    /// Results CSV [default: <blast>_Results.csv]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Krona text export (ktImportText input)
    #[arg(short, long)]
    krona: Option<PathBuf>,

    /// Worker threads [default: all cores]
    #[arg(long)]
    threads: Option<usize>,

    /// Ancestors inspected per rank when climbing the taxonomy
    #[arg(long, default_value_t = DEFAULT_CLIMB_BOUND)]
    climb_bound: usize,
}

fn spinner(color: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&[
                "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
            ])
            .template(&format!("{{spinner:.{color}}} {{msg}}"))
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = RefineConfig {
        taxonomy_path: args.taxonomy,
        climb_bound: args.climb_bound,
        threads: args.threads,
    };

    // 1. Refine hits
    let sp = spinner("green");
    sp.set_message(format!("Resolving LCA for {}...", args.blast.display()));
    let results = match refine_hits(&args.blast, &config) {
        Ok(results) => results,
        Err(e) => {
            sp.abandon_with_message("Refinement failed.");
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    sp.finish_with_message(format!(
        "Resolved {} queries ({} unresolved).",
        results.records.len(),
        results.unresolved_count()
    ));

    // 2. Write outputs
    let sp = spinner("yellow");
    sp.set_message("Writing output files...");
    let output = args.output.unwrap_or_else(|| default_results_path(&args.blast));
    if let Err(e) = results.write_results(&output) {
        sp.abandon_with_message("Could not write results.");
        log::error!("{}: {e}", output.display());
        return ExitCode::FAILURE;
    }
    if let Some(krona) = &args.krona {
        if let Err(e) = results.write_krona(krona) {
            sp.abandon_with_message("Could not write Krona export.");
            log::error!("{}: {e}", krona.display());
            return ExitCode::FAILURE;
        }
    }
    sp.finish_with_message(format!("Results written to {}.", output.display()));

    ExitCode::SUCCESS
}
