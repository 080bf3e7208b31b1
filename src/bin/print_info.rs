use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use retrieval_viewer::view::filter::{filter_options, ImprovementSummary};
use retrieval_viewer::{CsvDatasetSource, DatasetSource, ViewerConfig};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML viewer configuration; the built-in datasets are used if omitted.
    #[clap(long)]
    config: Option<String>,

    /// Name of the dataset to summarize; all configured datasets if omitted.
    #[clap(long)]
    dataset: Option<String>,
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
    let source = CsvDatasetSource::new(config.datasets.clone());
    let names = match args.dataset.as_deref() {
        Some(name) => vec![config.dataset(name)?.name.clone()],
        None => config.dataset_names().into_iter().map(str::to_string).collect(),
    };

    for name in names {
        let dataset = source.load(&name)?;
        println!("{}", dataset);
        for option in filter_options(&dataset.queries, &config.excluded_metrics) {
            if let Some(column) = option.column.as_deref() {
                let summary = ImprovementSummary::new(&dataset.queries, column)?;
                println!(
                    "  {}: {} improved, {} worsened",
                    option.label, summary.improved.len(), summary.worsened.len());
            }
        }
    }
    Ok(())
}
