use std::collections::HashMap;
use std::sync::Arc;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;
use crate::config::ViewerConfig;
use crate::data::query::QueryDataset;
use crate::data::{DatasetSource, RetrievalDataset};
use crate::types::sample::QuerySample;
use crate::types::{ImprovementChoice, MatchingMode};
use crate::view::filter::{filter_by_category, filter_options, FilterOption, ImprovementSummary};
use crate::view::navigation::{NavigationContext, NavigationState};
use crate::view::surface::DisplaySurface;
use crate::view::{render, RenderOptions};

/// Message shown when the selected filters leave no query.
pub const NO_QUERIES_NOTICE: &str = "There is no query to fulfill the filter requirements.";

/// The state of the selection controls at the time of a render.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Selection {
    pub dataset: String,
    /// Improvement-flag column to filter on; `None` shows every query.
    pub filter_by: Option<String>,
    /// Which half of the flag filter to show; ignored without `filter_by`.
    pub improvement: ImprovementChoice,
    /// Category to page through; the first available one if `None` or no longer available.
    pub category: Option<String>,
    pub show_details: bool,
    /// Result rows to show, in order.
    pub modes: Vec<MatchingMode>,
}

impl Selection {
    pub fn new(dataset: &str) -> Selection {
        Selection {
            dataset: dataset.to_string(),
            filter_by: None,
            improvement: ImprovementChoice::Improvements,
            category: None,
            show_details: false,
            modes: vec![MatchingMode::BeforePostprocessing, MatchingMode::AfterPostprocessing],
        }
    }
}

/// The query subset a selection resolves to.
pub struct ActiveQueries {
    pub dataset: Arc<RetrievalDataset>,
    /// Improved/worsened split of the selected flag column, if one is selected.
    pub summary: Option<ImprovementSummary>,
    /// Categories available after flag filtering.
    pub categories: Vec<String>,
    /// Empty when flag filtering left nothing.
    pub category: Option<String>,
    pub queries: QueryDataset,
}

/// What a render cycle showed.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RenderOutcome {
    Rendered { query_id: String, index: usize, total: usize },
    NoQueries,
}

/// One interactive viewing session: loaded datasets and the navigation state, kept across
/// render cycles.
pub struct Session<S: DatasetSource> {
    source: S,
    config: ViewerConfig,
    datasets: HashMap<String, Arc<RetrievalDataset>>,
    navigation: NavigationState,
    rng: StdRng,
}

impl<S: DatasetSource> Session<S> {
    pub fn new(source: S, config: ViewerConfig) -> Session<S> {
        Session::with_rng(source, config, StdRng::from_entropy())
    }

    pub fn with_rng(source: S, config: ViewerConfig, rng: StdRng) -> Session<S> {
        Session { source, config, datasets: HashMap::new(), navigation: NavigationState::new(), rng }
    }

    pub fn dataset_names(&self) -> Vec<String> { self.source.names() }

    pub fn navigation(&self) -> &NavigationState { &self.navigation }

    /// Returns the named dataset, loading it on first use.
    pub fn dataset(&mut self, name: &str) -> Result<Arc<RetrievalDataset>> {
        if let Some(dataset) = self.datasets.get(name) {
            return Ok(Arc::clone(dataset));
        }
        let dataset = Arc::new(self.source.load(name)?);
        self.datasets.insert(name.to_string(), Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Filter options of the named dataset, without the configured exclusions.
    pub fn filter_options(&mut self, name: &str) -> Result<Vec<FilterOption>> {
        let dataset = self.dataset(name)?;
        Ok(filter_options(&dataset.queries, &self.config.excluded_metrics))
    }

    /// Moves `delta` queries forward (or backward, if negative) within the current subset.
    pub fn advance(&mut self, delta: i64) { self.navigation.advance(delta); }

    pub fn previous(&mut self) { self.navigation.advance(-1); }

    pub fn next(&mut self) { self.navigation.advance(1); }

    pub fn random(&mut self) { self.navigation.random_jump(&mut self.rng); }

    /// Applies the improvement and category filters of `selection`.
    pub fn active_queries(&mut self, selection: &Selection) -> Result<ActiveQueries> {
        let dataset = self.dataset(&selection.dataset)?;

        let (summary, filtered) = match &selection.filter_by {
            Some(column) => {
                let summary = ImprovementSummary::new(&dataset.queries, column)?;
                let filtered = summary.select(selection.improvement).clone();
                (Some(summary), filtered)
            }
            None => (None, dataset.queries.clone()),
        };

        let categories = filtered.categories().to_vec();
        let category = match &selection.category {
            Some(category) if categories.contains(category) => Some(category.clone()),
            _ => categories.first().cloned(),
        };
        let queries = match &category {
            Some(category) => filter_by_category(&filtered, category)?,
            None => filtered,
        };
        Ok(ActiveQueries { dataset, summary, categories, category, queries })
    }

    /// Runs one render cycle for `selection` and hands one row per selected mode to `surface`.
    ///
    /// Changing any of dataset, category, filter column or improvement choice since the previous
    /// cycle starts over at the first query.
    pub fn render(&mut self, selection: &Selection, surface: &mut dyn DisplaySurface) -> Result<RenderOutcome> {
        let active = self.active_queries(selection)?;
        let category = match &active.category {
            Some(category) if !active.queries.is_empty() => category.clone(),
            _ => {
                surface.notice(NO_QUERIES_NOTICE)?;
                return Ok(RenderOutcome::NoQueries);
            }
        };

        self.navigation.reset_if_context_changed(NavigationContext::new(
            &selection.dataset,
            &category,
            selection.filter_by.as_deref(),
            selection.filter_by.as_ref().map(|_| selection.improvement)));

        let total = active.queries.len();
        let index = self.navigation.current_index(total).unwrap_or(0);
        let query = active.queries.get(index as i64)?;
        debug!(dataset = %selection.dataset, category = %category, index, total, "showing query");

        self.render_query(&active.dataset, query, selection, surface)?;
        Ok(RenderOutcome::Rendered { query_id: query.id().to_string(), index, total })
    }

    /// Renders `query` once for every mode of `selection`.
    pub fn render_query(
        &self,
        dataset: &RetrievalDataset,
        query: &QuerySample,
        selection: &Selection,
        surface: &mut dyn DisplaySurface,
    ) -> Result<()> {
        let options = RenderOptions {
            top_k: self.config.top_k.min(dataset.queries.max_top_k()),
            show_details: selection.show_details,
            size: self.config.size,
            border_size: self.config.border_size,
        };
        for &mode in &selection.modes {
            let view = render(&options, query, &dataset.gallery, mode, dataset.images.as_ref())?;
            surface.show_row(&view)?;
        }
        Ok(())
    }
}
