pub mod gallery;
pub mod loader;
pub mod query;

use std::fmt;
use std::fmt::Formatter;
use std::sync::Arc;
use anyhow::Result;
use crate::data::gallery::GalleryDataset;
use crate::data::query::QueryDataset;
use crate::io::ImageLoader;

/// Precomputed retrieval results of one dataset together with the images they refer to.
pub struct RetrievalDataset {
    pub name: String,
    pub queries: QueryDataset,
    pub gallery: GalleryDataset,
    pub images: Arc<dyn ImageLoader>,
}

impl RetrievalDataset {
    /// Checks that every id in every ranked list of every query exists in the gallery.
    ///
    /// Returns `ViewerError::GalleryIdNotFound` for the first id that does not.
    pub fn validate(&self) -> Result<()> {
        self.queries.iter()
            .flat_map(|query| query.top_k().ids().iter().chain(query.postprocessed_top_k().ids()))
            .try_for_each(|id| self.gallery.find_by_id(id).map(|_| ()))
    }
}

impl fmt::Display for RetrievalDataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}\nQueries: {}\nGallery: {}", self.name, self.queries, self.gallery)
    }
}

/// Provides datasets by name. Each dataset is loaded in full and then treated as read-only.
pub trait DatasetSource {
    /// Names of the datasets this source can load, in display order.
    fn names(&self) -> Vec<String>;

    fn load(&self, name: &str) -> Result<RetrievalDataset>;
}
