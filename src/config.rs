use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use crate::error::ViewerError;

/// Locations of one precomputed retrieval dataset.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Name shown in the dataset selector.
    pub name: String,
    /// CSV file with query samples and their top-k columns.
    pub query: PathBuf,
    /// CSV file with gallery samples.
    pub gallery: PathBuf,
    /// Directory or `.zip` archive that sample paths resolve against.
    pub images: PathBuf,
}

/// Settings of the viewer, usually read from a TOML file.
///
/// ```toml
/// size = 256
/// border_size = 6
/// top_k = 5
///
/// [[datasets]]
/// name = "Stanford Online Products"
/// query = "data/SOP/filtered_query_df.csv"
/// gallery = "data/SOP/filtered_gallery_df.csv"
/// images = "data/SOP/SOP_images.zip"
/// ```
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Side length of every rendered card, border included.
    pub size: usize,
    /// Width of the decorative border around the query and correct matches.
    pub border_size: usize,
    /// Upper bound on the number of gallery results per row.
    pub top_k: usize,
    /// Improvement-flag columns that are never offered as filters.
    pub excluded_metrics: Vec<String>,
    pub datasets: Vec<DatasetConfig>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            size: 256,
            border_size: 6,
            top_k: 5,
            excluded_metrics: vec!["simple_improved".to_string()],
            datasets: vec![
                local_dataset("Stanford Online Products", "data/SOP", "SOP_images.zip"),
                local_dataset("DeepFashion InShop", "data/InShop", "InShop_images.zip"),
            ],
        }
    }
}

fn local_dataset(name: &str, root: &str, archive: &str) -> DatasetConfig {
    let root = Path::new(root);
    DatasetConfig {
        name: name.to_string(),
        query: root.join("filtered_query_df.csv"),
        gallery: root.join("filtered_gallery_df.csv"),
        images: root.join(archive),
    }
}

impl ViewerConfig {
    /// Reads a configuration from the TOML file at `path`.
    ///
    /// Keys absent from the file take their default values. Returns an error if the file cannot
    /// be read or parsed, or if the resulting settings are inconsistent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ViewerConfig> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let config = ViewerConfig::parse(&text)
            .with_context(|| format!("invalid config '{}'", path.display()))?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<ViewerConfig> {
        let config: ViewerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.size <= 2 * self.border_size {
            return Err(anyhow!(
                "Card size ({}) must exceed twice the border size ({}).",
                self.size, self.border_size));
        }
        if self.top_k == 0 {
            return Err(anyhow!("top_k must be positive."));
        }
        Ok(())
    }

    /// Returns the dataset with the given name.
    pub fn dataset(&self, name: &str) -> Result<&DatasetConfig> {
        self.datasets.iter()
            .find(|dataset| dataset.name == name)
            .ok_or_else(|| ViewerError::UnknownDataset(name.to_string()).into())
    }

    pub fn dataset_names(&self) -> Vec<&str> {
        self.datasets.iter().map(|dataset| dataset.name.as_str()).collect()
    }
}
