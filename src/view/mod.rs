//! Everything between a loaded dataset and a display surface: picking the active query, resolving
//! its ranked results, and turning them into labeled cards.

use std::fmt;
use std::fmt::Formatter;
use anyhow::Result;
use tracing::{debug, warn};
use crate::compose::{compose_card, Frame};
use crate::data::gallery::GalleryDataset;
use crate::io::{load_images, Image, ImageLoader};
use crate::types::sample::{QuerySample, RankedList, Sample};
use crate::types::MatchingMode;

pub mod filter;
pub mod navigation;
pub mod session;
pub mod surface;

/// Key-value annotations shown under a card.
#[derive(PartialEq, Debug, Clone)]
pub struct CardInfo {
    pub label: String,
    pub category: String,
    /// Distance to the query; absent on the query card itself.
    pub distance: Option<f32>,
}

impl CardInfo {
    fn query(sample: &Sample) -> CardInfo {
        CardInfo { label: sample.label().to_string(), category: sample.category().to_string(), distance: None }
    }

    fn result(sample: &Sample, distance: f32) -> CardInfo {
        CardInfo {
            label: sample.label().to_string(),
            category: sample.category().to_string(),
            distance: Some(distance),
        }
    }

    /// The annotations in display order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![("Label", self.label.clone()), ("Category", self.category.clone())];
        if let Some(distance) = self.distance {
            entries.push(("Distance", distance.to_string()));
        }
        entries
    }
}

impl fmt::Display for CardInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let entries = self.entries()
            .into_iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>();
        write!(f, "{}", entries.join(", "))
    }
}

/// A composited image and its annotations.
#[derive(PartialEq, Debug, Clone)]
pub struct Card {
    pub image: Image,
    pub info: CardInfo,
    pub frame: Frame,
}

/// One row of the viewer: the query card followed by its results in rank order.
#[derive(PartialEq, Debug, Clone)]
pub struct RetrievalView {
    pub title: String,
    pub cards: Vec<Card>,
    pub show_details: bool,
}

/// Parameters of one render pass.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Number of gallery results to show.
    pub top_k: usize,
    /// Whether the display surface should print card annotations.
    pub show_details: bool,
    /// Side length of each card.
    pub size: usize,
    pub border_size: usize,
}

/// Returns the precomputed ids and scores of `query` for `mode`, untouched.
///
/// Slicing to the desired K is up to the caller.
pub fn resolve(query: &QuerySample, mode: MatchingMode) -> &RankedList {
    query.results(mode)
}

/// Renders the query and its top results for `mode` as a row of cards.
///
/// The query card gets a black frame; a result gets a green frame if its label equals the query's
/// label and plain white padding otherwise. If fewer than `options.top_k` results were
/// precomputed, all of them are shown.
///
/// Returns `ViewerError::GalleryIdNotFound` if a ranked id is absent from `gallery`, and any
/// error raised while loading or compositing an image.
pub fn render(
    options: &RenderOptions,
    query: &QuerySample,
    gallery: &GalleryDataset,
    mode: MatchingMode,
    images: &dyn ImageLoader,
) -> Result<RetrievalView> {
    let ranked = resolve(query, mode);
    if ranked.len() < options.top_k {
        warn!(query = query.id(), requested = options.top_k, available = ranked.len(), "fewer results than requested");
    }

    let results = ranked.iter()
        .take(options.top_k)
        .map(|(id, score)| Ok((gallery.find_by_id(id)?, *score)))
        .collect::<Result<Vec<_>>>()?;

    let mut samples = vec![query.sample()];
    samples.extend(results.iter().map(|(sample, _)| *sample));
    let pixels = load_images(images, &samples)?;

    let mut cards = Vec::with_capacity(pixels.len());
    let mut pixels = pixels.into_iter();
    if let Some(image) = pixels.next() {
        cards.push(Card {
            image: compose_card(image.view(), Frame::Query, options.size, options.border_size)?,
            info: CardInfo::query(query.sample()),
            frame: Frame::Query,
        });
    }
    for ((sample, score), image) in results.iter().zip(pixels) {
        let frame = if sample.matches(query.sample()) { Frame::Match } else { Frame::Plain };
        cards.push(Card {
            image: compose_card(image.view(), frame, options.size, options.border_size)?,
            info: CardInfo::result(sample, *score),
            frame,
        });
    }
    debug!(query = query.id(), mode = %mode, cards = cards.len(), "rendered results");

    Ok(RetrievalView { title: mode.title().to_string(), cards, show_details: options.show_details })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use ndarray::Array3;
    use crate::compose::{Frame, BLACK, GREEN, WHITE};
    use crate::error::ViewerError;
    use crate::io::source::MemoryImages;
    use crate::types::sample::{QuerySample, RankedList, Sample};
    use crate::view::{render, resolve, CardInfo, RenderOptions};
    use crate::{GalleryDataset, MatchingMode};

    pub(crate) fn options(top_k: usize) -> RenderOptions {
        RenderOptions { top_k, show_details: true, size: 32, border_size: 2 }
    }

    pub(crate) fn ranked(ids: &[&str], scores: &[f32]) -> RankedList {
        RankedList::new(ids.iter().map(|s| s.to_string()).collect(), scores.to_vec())
    }

    fn fixture() -> (QuerySample, GalleryDataset, MemoryImages) {
        let query = QuerySample::new(
            Sample::new("q", "A", "shoes", "q.png"),
            ranked(&["1", "2", "3"], &[0.1, 0.2, 0.3]),
            ranked(&["3", "1", "2"], &[0.05, 0.15, 0.25]),
            BTreeMap::new()).unwrap();
        let gallery = GalleryDataset::new(vec![
            Sample::new("1", "A", "shoes", "1.png"),
            Sample::new("2", "B", "bags", "2.png"),
            Sample::new("3", "B", "shoes", "3.png"),
        ]).unwrap();
        let mut images = MemoryImages::default();
        for (path, height, width) in [("q.png", 10, 20), ("1.png", 20, 10), ("2.png", 5, 10), ("3.png", 8, 3)] {
            images.insert(path, Array3::<u8>::from_elem((height, width, 3), 90));
        }
        (query, gallery, images)
    }

    fn corner(image: &Array3<u8>) -> [u8; 3] {
        [image[[0, 0, 0]], image[[0, 0, 1]], image[[0, 0, 2]]]
    }

    #[test]
    fn test_resolve() {
        let (query, _, _) = fixture();
        let ranked = resolve(&query, MatchingMode::AfterPostprocessing);
        assert_eq!(&["3".to_string(), "1".to_string(), "2".to_string()], ranked.ids());
        assert_eq!(&[0.05_f32, 0.15, 0.25], ranked.scores());
        assert_eq!(3, resolve(&query, MatchingMode::BeforePostprocessing).len());
    }

    #[test]
    fn test_render_before() {
        let (query, gallery, images) = fixture();
        let view = render(&options(3), &query, &gallery, MatchingMode::BeforePostprocessing, &images).unwrap();

        assert_eq!("Baseline model", view.title);
        let infos = view.cards.iter().map(|card| card.info.clone()).collect::<Vec<_>>();
        assert_eq!(vec![
            CardInfo { label: "A".to_string(), category: "shoes".to_string(), distance: None },
            CardInfo { label: "A".to_string(), category: "shoes".to_string(), distance: Some(0.1) },
            CardInfo { label: "B".to_string(), category: "bags".to_string(), distance: Some(0.2) },
            CardInfo { label: "B".to_string(), category: "shoes".to_string(), distance: Some(0.3) },
        ], infos);

        let frames = view.cards.iter().map(|card| card.frame).collect::<Vec<_>>();
        assert_eq!(vec![Frame::Query, Frame::Match, Frame::Plain, Frame::Plain], frames);
        assert_eq!(BLACK, corner(&view.cards[0].image));
        assert_eq!(GREEN, corner(&view.cards[1].image));
        assert_eq!(WHITE, corner(&view.cards[2].image));
        assert_eq!(WHITE, corner(&view.cards[3].image));
        assert!(view.cards.iter().all(|card| card.image.dim() == (32, 32, 3)));
    }

    #[test]
    fn test_render_after_keeps_rank_order() {
        let (query, gallery, images) = fixture();
        let view = render(&options(2), &query, &gallery, MatchingMode::AfterPostprocessing, &images).unwrap();

        assert_eq!(3, view.cards.len());
        assert_eq!(Some(0.05), view.cards[1].info.distance);
        assert_eq!(Frame::Plain, view.cards[1].frame);
        assert_eq!(Frame::Match, view.cards[2].frame);
    }

    #[test]
    fn test_render_lenient_top_k() {
        let (query, gallery, images) = fixture();
        let view = render(&options(10), &query, &gallery, MatchingMode::BeforePostprocessing, &images).unwrap();
        assert_eq!(4, view.cards.len());
    }

    #[test]
    fn test_render_missing_gallery_id() {
        let (_, gallery, images) = fixture();
        let query = QuerySample::new(
            Sample::new("q", "A", "shoes", "q.png"),
            ranked(&["1", "7"], &[0.1, 0.2]),
            ranked(&["1", "7"], &[0.1, 0.2]),
            BTreeMap::new()).unwrap();

        let err = render(&options(2), &query, &gallery, MatchingMode::BeforePostprocessing, &images).unwrap_err();
        assert_eq!(Some(&ViewerError::GalleryIdNotFound("7".to_string())), err.downcast_ref::<ViewerError>());
    }

    #[test]
    fn test_card_info_entries() {
        let info = CardInfo { label: "A".to_string(), category: "shoes".to_string(), distance: Some(0.5) };
        assert_eq!(vec![
            ("Label", "A".to_string()),
            ("Category", "shoes".to_string()),
            ("Distance", "0.5".to_string()),
        ], info.entries());
        assert_eq!("Label: A, Category: shoes, Distance: 0.5", info.to_string());
    }
}
