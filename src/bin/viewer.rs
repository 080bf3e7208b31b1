use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;
use retrieval_viewer::view::session::{RenderOutcome, Selection, Session};
use retrieval_viewer::view::surface::{SheetSurface, TextSurface};
use retrieval_viewer::{CsvDatasetSource, ImprovementChoice, MatchingMode, ViewerConfig};

const SHEET_GAP: usize = 8;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML viewer configuration; the built-in datasets are used if omitted.
    #[clap(long)]
    config: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Renders a single query; before and after postprocessing unless `--mode` narrows it.
    Render {
        #[clap(flatten)]
        selection: SelectionArgs,

        /// Position of the query within the selected subset; wraps around.
        #[clap(long, default_value_t = 0, allow_hyphen_values = true)]
        position: i64,

        /// Path of the PNG contact sheet to write.
        #[clap(long, required = true)]
        output: PathBuf,
    },

    /// Pages through queries interactively, rewriting the contact sheet after every command.
    Browse {
        #[clap(flatten)]
        selection: SelectionArgs,

        /// Path of the PNG contact sheet to keep up to date.
        #[clap(long, required = true)]
        output: PathBuf,
    },

    /// Writes one contact sheet per query of the selected subset.
    Export {
        #[clap(flatten)]
        selection: SelectionArgs,

        /// Directory that receives `<query id>.png` files.
        #[clap(long, required = true)]
        output_dir: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct SelectionArgs {
    /// Dataset name; the first configured dataset if omitted.
    #[clap(long)]
    dataset: Option<String>,

    /// Metric to filter by, e.g. `cmc@1` or `cmc@1_improved`.
    #[clap(long)]
    filter_by: Option<String>,

    /// Half of the metric filter to show: improved or worsened.
    #[clap(long, default_value = "improved")]
    improvement: ImprovementChoice,

    /// Category to page through; the first one if omitted.
    #[clap(long)]
    category: Option<String>,

    /// Print labels, categories and distances of every card.
    #[clap(long)]
    details: bool,

    /// Result rows to show: before or after postprocessing. Repeatable; both if omitted.
    #[clap(long = "mode")]
    modes: Vec<MatchingMode>,
}

/// creates a progress bar with the default template
fn create_progress(name: &str, delta_refresh: usize, elems: usize) -> indicatif::ProgressBar {
    let pb = indicatif::ProgressBar::new(elems as u64);
    pb.set_draw_delta(delta_refresh as u64);
    let rest =
        "[{elapsed_precise}] [{bar:40.cyan/blue}] ({pos}/{len}, ETA {eta}, SPEED: {per_sec})";
    pb.set_style(indicatif::ProgressStyle::default_bar().template(&format!("{}: {}", name, rest)));
    pb
}

/// Turns command-line selections into a `Selection`, resolving metric names to flag columns.
fn resolve_selection(session: &mut Session<CsvDatasetSource>, args: SelectionArgs) -> Result<Selection> {
    let dataset = match args.dataset {
        Some(dataset) => dataset,
        None => session.dataset_names().into_iter().next()
            .ok_or_else(|| anyhow!("No datasets are configured."))?,
    };
    let mut selection = Selection::new(&dataset);
    selection.filter_by = match args.filter_by {
        Some(metric) => resolve_filter(session, &dataset, &metric)?,
        None => None,
    };
    selection.improvement = args.improvement;
    selection.category = args.category;
    selection.show_details = args.details;
    if !args.modes.is_empty() {
        selection.modes = args.modes;
    }
    Ok(selection)
}

fn resolve_filter(session: &mut Session<CsvDatasetSource>, dataset: &str, metric: &str) -> Result<Option<String>> {
    let options = session.filter_options(dataset)?;
    options.iter()
        .find(|option| option.label == metric || option.column.as_deref() == Some(metric))
        .map(|option| option.column.clone())
        .ok_or_else(|| anyhow!(
            "Unknown filter '{}'; available: {}",
            metric,
            options.iter().map(|option| option.label.as_str()).collect::<Vec<_>>().join(", ")))
}

fn render_once(session: &mut Session<CsvDatasetSource>, selection: &Selection, output: &Path) -> Result<()> {
    let mut surface = (TextSurface::new(std::io::stdout()), SheetSurface::new(SHEET_GAP));
    let outcome = session.render(selection, &mut surface)?;
    if let RenderOutcome::Rendered { query_id, index, total } = outcome {
        println!("Query {} ({}/{})", query_id, index + 1, total);
        surface.1.flush(output)?;
    }
    Ok(())
}

fn print_controls(session: &mut Session<CsvDatasetSource>, selection: &Selection) -> Result<()> {
    let active = session.active_queries(selection)?;
    println!("Datasets: {}", session.dataset_names().join(", "));
    let filters = session.filter_options(&selection.dataset)?;
    println!("Filter by: {}", filters.iter().map(|option| option.label.as_str()).collect::<Vec<_>>().join(", "));
    if let Some(summary) = &active.summary {
        println!(
            "Filter type: {} | {}",
            summary.label(ImprovementChoice::Improvements),
            summary.label(ImprovementChoice::Worsenings));
    }
    println!("Categories: {}", active.categories.join(", "));
    println!("[n]ext [p]rev [r]andom | c <category> | f <metric|None> | i improved|worsened | s <dataset> | d(etails) | q(uit)");
    Ok(())
}

fn browse(session: &mut Session<CsvDatasetSource>, mut selection: Selection, output: &Path) -> Result<()> {
    render_once(session, &selection, output)?;
    print_controls(session, &selection)?;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let mut words = line.trim().splitn(2, ' ');
        let command = words.next().unwrap_or("");
        let argument = words.next().map(str::trim);
        match (command, argument) {
            ("q" | "quit", _) => break,
            ("n" | "next", _) => session.next(),
            ("p" | "prev", _) => session.previous(),
            ("r" | "random", _) => session.random(),
            ("d" | "details", _) => selection.show_details = !selection.show_details,
            ("c" | "category", Some(category)) => selection.category = Some(category.to_string()),
            ("i" | "improvement", Some(choice)) => match choice.parse() {
                Ok(choice) => selection.improvement = choice,
                Err(e) => { println!("{}", e); continue; }
            },
            ("f" | "filter", Some(metric)) => match resolve_filter(session, &selection.dataset, metric) {
                Ok(column) => selection.filter_by = column,
                Err(e) => { println!("{}", e); continue; }
            },
            ("s" | "dataset", Some(dataset)) => {
                if !session.dataset_names().iter().any(|name| name == dataset) {
                    println!("Unknown dataset '{}'", dataset);
                    continue;
                }
                selection = Selection { dataset: dataset.to_string(), filter_by: None, category: None, ..selection };
            }
            _ => {
                println!("Unrecognized command '{}'", line.trim());
                continue;
            }
        }
        render_once(session, &selection, output)?;
        print_controls(session, &selection)?;
        print!("> ");
        std::io::stdout().flush()?;
    }
    Ok(())
}

/// File name of the exported sheet for `query_id`; anything but ASCII letters, digits, `-` and `_`
/// becomes `_`, so the sheet always lands directly inside the output directory.
fn sheet_file_name(query_id: &str) -> String {
    let stem = query_id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect::<String>();
    if stem.is_empty() {
        "_.png".to_string()
    } else {
        format!("{}.png", stem)
    }
}

fn export(session: &mut Session<CsvDatasetSource>, selection: &Selection, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    let active = session.active_queries(selection)?;
    let queries = active.queries.iter().collect::<Vec<_>>();
    info!(queries = queries.len(), category = ?active.category, "exporting");

    let pb = create_progress("Exporting", 1, queries.len());
    let session = &*session;
    queries.par_iter().progress_with(pb.clone()).try_for_each(|query| {
        let mut surface = SheetSurface::new(SHEET_GAP);
        session.render_query(&active.dataset, query, selection, &mut surface)?;
        surface.flush(&output_dir.join(sheet_file_name(query.id())))
    })?;
    pb.finish_and_clear();
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let config = match args.config.as_deref() {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    let mut session = Session::new(CsvDatasetSource::new(config.datasets.clone()), config);

    match args.command {
        Command::Render { selection, position, output } => {
            let selection = resolve_selection(&mut session, selection)?;
            session.advance(position);
            render_once(&mut session, &selection, &output)
        }
        Command::Browse { selection, output } => {
            let selection = resolve_selection(&mut session, selection)?;
            browse(&mut session, selection, &output)
        }
        Command::Export { selection, output_dir } => {
            let selection = resolve_selection(&mut session, selection)?;
            export(&mut session, &selection, &output_dir)
        }
    }
}
