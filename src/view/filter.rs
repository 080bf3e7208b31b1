use anyhow::Result;
use crate::data::loader::IMPROVED_SUFFIX;
use crate::data::query::QueryDataset;
use crate::types::sample::CATEGORY_ATTRIBUTE;
use crate::types::{AttributeValue, ImprovementChoice, ImprovementFlag};

/// Label of the filter option that disables improvement filtering.
pub const FILTER_OPTION_NONE: &str = "None";

/// An entry of the "Filter by" selector.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FilterOption {
    /// Metric name shown to the user, e.g. `cmc@1`.
    pub label: String,
    /// Flag column to filter on; `None` for no filtering.
    pub column: Option<String>,
}

/// Lists the filter options of `dataset`: "None" first, then one per flag column that is not in
/// `excluded`, labeled by the part of the column name before the first underscore.
pub fn filter_options(dataset: &QueryDataset, excluded: &[String]) -> Vec<FilterOption> {
    let mut options = vec![FilterOption { label: FILTER_OPTION_NONE.to_string(), column: None }];
    options.extend(dataset.flag_columns()
        .iter()
        .filter(|column| column.ends_with(IMPROVED_SUFFIX) && !excluded.contains(*column))
        .map(|column| FilterOption {
            label: column.split('_').next().unwrap_or(column.as_str()).to_string(),
            column: Some(column.clone()),
        }));
    options
}

/// Keeps the samples of `dataset` whose `attribute` equals `value`.
pub fn filter_by_attribute<V: Into<AttributeValue>>(dataset: &QueryDataset, attribute: &str, value: V) -> Result<QueryDataset> {
    dataset.filter(attribute, value)
}

pub fn filter_by_category(dataset: &QueryDataset, category: &str) -> Result<QueryDataset> {
    dataset.filter(CATEGORY_ATTRIBUTE, category)
}

/// The two disjoint subsets an improvement-flag column splits a query set into.
#[derive(Debug, Clone)]
pub struct ImprovementSummary {
    pub column: String,
    pub improved: QueryDataset,
    pub worsened: QueryDataset,
}

impl ImprovementSummary {
    /// Splits `dataset` by `column`; queries whose flag is 0 belong to neither half.
    pub fn new(dataset: &QueryDataset, column: &str) -> Result<ImprovementSummary> {
        Ok(ImprovementSummary {
            column: column.to_string(),
            improved: dataset.filter(column, ImprovementFlag::Improved)?,
            worsened: dataset.filter(column, ImprovementFlag::Worsened)?,
        })
    }

    /// Radio-button label of `choice`, with the size of the matching subset.
    pub fn label(&self, choice: ImprovementChoice) -> String {
        format!("{} ({})", choice, self.select(choice).len())
    }

    pub fn select(&self, choice: ImprovementChoice) -> &QueryDataset {
        match choice {
            ImprovementChoice::Improvements => &self.improved,
            ImprovementChoice::Worsenings => &self.worsened,
        }
    }
}
