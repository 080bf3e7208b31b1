use std::collections::BTreeMap;
use std::iter::Zip;
use std::slice::Iter;
use anyhow::Result;
use crate::error::ViewerError;
use crate::types::{AttributeValue, ImprovementFlag, MatchingMode};

pub const ID_ATTRIBUTE: &str = "image_id";
pub const LABEL_ATTRIBUTE: &str = "label";
pub const CATEGORY_ATTRIBUTE: &str = "category";
pub const PATH_ATTRIBUTE: &str = "path";

/// The record shape shared by query and gallery images.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Sample {
    id: String,
    label: String,
    category: String,
    path: String,
}

/// Gallery samples carry nothing beyond the shared shape.
pub type GallerySample = Sample;

impl Sample {
    pub fn new(id: &str, label: &str, category: &str, path: &str) -> Sample {
        Sample {
            id: id.to_string(),
            label: label.to_string(),
            category: category.to_string(),
            path: path.to_string(),
        }
    }

    pub fn id(&self) -> &str { &self.id }

    pub fn label(&self) -> &str { &self.label }

    pub fn category(&self) -> &str { &self.category }

    /// Locator of the image within the dataset's image source.
    pub fn path(&self) -> &str { &self.path }

    /// Returns `true` if both samples depict the same identity.
    pub fn matches(&self, other: &Sample) -> bool { self.label == other.label }
}

/// A ranked list of gallery ids and the distance associated with each of them.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RankedList {
    ids: Vec<String>,
    scores: Vec<f32>,
}

impl RankedList {
    pub fn new(ids: Vec<String>, scores: Vec<f32>) -> RankedList {
        RankedList { ids, scores }
    }

    pub fn ids(&self) -> &[String] { &self.ids }

    pub fn scores(&self) -> &[f32] { &self.scores }

    /// Number of ranked entries; the shorter side wins if the lists disagree.
    pub fn len(&self) -> usize { self.ids.len().min(self.scores.len()) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn is_consistent(&self) -> bool { self.ids.len() == self.scores.len() }

    /// Iterates over `(id, score)` pairs in rank order.
    pub fn iter(&self) -> Zip<Iter<'_, String>, Iter<'_, f32>> {
        self.ids.iter().zip(self.scores.iter())
    }
}

/// A query image together with its precomputed retrieval results.
#[derive(PartialEq, Debug, Clone)]
pub struct QuerySample {
    sample: Sample,
    top_k: RankedList,
    postprocessed_top_k: RankedList,
    flags: BTreeMap<String, ImprovementFlag>,
}

impl QuerySample {
    /// Creates a query sample.
    ///
    /// Returns an error if either ranked list holds a different number of ids and scores.
    pub fn new(
        sample: Sample,
        top_k: RankedList,
        postprocessed_top_k: RankedList,
        flags: BTreeMap<String, ImprovementFlag>,
    ) -> Result<QuerySample> {
        for list in [&top_k, &postprocessed_top_k] {
            if !list.is_consistent() {
                return Err(ViewerError::MismatchedTopK {
                    id: sample.id.clone(),
                    ids: list.ids.len(),
                    scores: list.scores.len(),
                }.into());
            }
        }
        Ok(QuerySample { sample, top_k, postprocessed_top_k, flags })
    }

    pub fn sample(&self) -> &Sample { &self.sample }

    pub fn id(&self) -> &str { self.sample.id() }

    pub fn label(&self) -> &str { self.sample.label() }

    pub fn category(&self) -> &str { self.sample.category() }

    pub fn top_k(&self) -> &RankedList { &self.top_k }

    pub fn postprocessed_top_k(&self) -> &RankedList { &self.postprocessed_top_k }

    /// Returns the precomputed result list for `mode`. Nothing is recomputed or truncated.
    pub fn results(&self, mode: MatchingMode) -> &RankedList {
        match mode {
            MatchingMode::BeforePostprocessing => &self.top_k,
            MatchingMode::AfterPostprocessing => &self.postprocessed_top_k,
        }
    }

    pub fn flags(&self) -> &BTreeMap<String, ImprovementFlag> { &self.flags }

    /// Looks up a named attribute: one of the shared record fields or an improvement-flag column.
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match name {
            ID_ATTRIBUTE => Some(AttributeValue::Text(self.sample.id.clone())),
            LABEL_ATTRIBUTE => Some(AttributeValue::Text(self.sample.label.clone())),
            CATEGORY_ATTRIBUTE => Some(AttributeValue::Text(self.sample.category.clone())),
            PATH_ATTRIBUTE => Some(AttributeValue::Text(self.sample.path.clone())),
            _ => self.flags.get(name).map(|flag| AttributeValue::Flag(*flag)),
        }
    }
}
