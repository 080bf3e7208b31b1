use std::collections::HashMap;
use std::fmt;
use std::fmt::Formatter;
use anyhow::{anyhow, Result};
use crate::error::ViewerError;
use crate::types::sample::GallerySample;

/// The searchable collection of candidate images, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct GalleryDataset {
    samples: Vec<GallerySample>,
    index: HashMap<String, usize>,
}

impl GalleryDataset {
    /// Creates a gallery from `samples`.
    ///
    /// Returns an error if two samples share an id.
    pub fn new(samples: Vec<GallerySample>) -> Result<GalleryDataset> {
        let mut index = HashMap::with_capacity(samples.len());
        for (position, sample) in samples.iter().enumerate() {
            if index.insert(sample.id().to_string(), position).is_some() {
                return Err(anyhow!("Gallery id '{}' appears more than once.", sample.id()));
            }
        }
        Ok(GalleryDataset { samples, index })
    }

    pub fn len(&self) -> usize { self.samples.len() }

    pub fn is_empty(&self) -> bool { self.samples.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, GallerySample> { self.samples.iter() }

    /// Returns the gallery sample with the given id.
    ///
    /// A missing id means the precomputed results do not belong to this gallery, so the error is
    /// `ViewerError::GalleryIdNotFound` rather than an empty result.
    pub fn find_by_id(&self, id: &str) -> Result<&GallerySample> {
        match self.index.get(id) {
            Some(&position) => Ok(&self.samples[position]),
            None => Err(ViewerError::GalleryIdNotFound(id.to_string()).into()),
        }
    }
}

impl fmt::Display for GalleryDataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} gallery samples", self.samples.len())
    }
}
