//! A lightweight research tool for inspecting image-retrieval results. For every query image it
//! shows the top-k gallery matches as ranked by a baseline model and as reranked by a
//! postprocessing stage, side by side, with correct matches framed in green.
//!
//! Retrieval results are precomputed: this crate only loads, filters and renders them.
//!
//! ## Rendering one query
//!
//! ```no_run
//! use retrieval_viewer::{CsvDatasetSource, DatasetSource, MatchingMode, ViewerConfig};
//! use retrieval_viewer::view::{render, RenderOptions};
//!
//! let config = ViewerConfig::load("viewer.toml").expect("failed to read config");
//! let source = CsvDatasetSource::new(config.datasets.clone());
//! let dataset = source.load("Stanford Online Products").expect("failed to load dataset");
//!
//! let query = dataset.queries.get(0).unwrap();
//! let options = RenderOptions { top_k: 5, show_details: true, size: 256, border_size: 6 };
//! let view = render(&options, query, &dataset.gallery, MatchingMode::AfterPostprocessing,
//!                   dataset.images.as_ref()).expect("failed to render");
//! for card in &view.cards {
//!     println!("{}", card.info);
//! }
//! ```
//!
//! ## Paging through a filtered subset
//! ```no_run
//! use retrieval_viewer::{CsvDatasetSource, ViewerConfig};
//! use retrieval_viewer::view::session::{Selection, Session};
//! use retrieval_viewer::view::surface::TextSurface;
//!
//! let config = ViewerConfig::default();
//! let mut session = Session::new(CsvDatasetSource::new(config.datasets.clone()), config);
//! let mut selection = Selection::new("DeepFashion InShop");
//! selection.filter_by = Some("cmc@1_improved".to_string());
//!
//! let mut surface = TextSurface::new(std::io::stdout());
//! session.render(&selection, &mut surface).unwrap();
//! session.next();
//! session.render(&selection, &mut surface).unwrap();
//! ```

pub mod compose;
pub mod config;
pub mod data;
pub mod error;
pub mod io;
mod types;
pub mod view;

pub use crate::config::{DatasetConfig, ViewerConfig};
pub use crate::data::gallery::GalleryDataset;
pub use crate::data::loader::CsvDatasetSource;
pub use crate::data::query::QueryDataset;
pub use crate::data::{DatasetSource, RetrievalDataset};
pub use crate::error::ViewerError;

pub use crate::types::{AttributeValue, ImprovementChoice, ImprovementFlag, MatchingMode};
pub use crate::types::sample::{GallerySample, QuerySample, RankedList, Sample};
