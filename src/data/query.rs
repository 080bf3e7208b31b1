use std::collections::BTreeSet;
use std::fmt;
use std::fmt::Formatter;
use std::sync::Arc;
use anyhow::Result;
use crate::error::ViewerError;
use crate::types::sample::{QuerySample, CATEGORY_ATTRIBUTE, ID_ATTRIBUTE, LABEL_ATTRIBUTE, PATH_ATTRIBUTE};
use crate::types::AttributeValue;

/// An immutable collection of query samples plus metadata derived from them.
///
/// Samples are shared: filtering produces a new `QueryDataset` over the same `QuerySample` values.
#[derive(Debug, Clone, Default)]
pub struct QueryDataset {
    samples: Vec<Arc<QuerySample>>,
    categories: Vec<String>,
    flag_columns: Vec<String>,
    max_top_k: usize,
}

impl QueryDataset {
    /// Creates a query dataset.
    ///
    /// `max_top_k` is the largest K for which results were precomputed; `flag_columns` lists the
    /// improvement-flag columns available for filtering.
    pub fn new(samples: Vec<QuerySample>, flag_columns: Vec<String>, max_top_k: usize) -> QueryDataset {
        QueryDataset::from_shared(samples.into_iter().map(Arc::new).collect(), flag_columns, max_top_k)
    }

    fn from_shared(samples: Vec<Arc<QuerySample>>, flag_columns: Vec<String>, max_top_k: usize) -> QueryDataset {
        let categories = samples.iter()
            .map(|sample| sample.category().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        QueryDataset { samples, categories, flag_columns, max_top_k }
    }

    pub fn len(&self) -> usize { self.samples.len() }

    pub fn is_empty(&self) -> bool { self.samples.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &QuerySample> { self.samples.iter().map(|s| s.as_ref()) }

    /// Distinct categories of the samples in this set, sorted.
    pub fn categories(&self) -> &[String] { &self.categories }

    /// Improvement-flag columns, in the order the loader found them.
    pub fn flag_columns(&self) -> &[String] { &self.flag_columns }

    pub fn max_top_k(&self) -> usize { self.max_top_k }

    /// Returns the sample at `position`, wrapped around the length of the set.
    ///
    /// Returns `ViewerError::EmptyQuerySet` if there is nothing to wrap around.
    pub fn get(&self, position: i64) -> Result<&QuerySample> {
        let index = wrap_index(position, self.samples.len()).ok_or(ViewerError::EmptyQuerySet)?;
        Ok(self.samples[index].as_ref())
    }

    /// Keeps only the samples whose attribute `column` equals `value`.
    ///
    /// Returns `ViewerError::UnknownAttribute` if `column` is neither a record field nor one of
    /// the flag columns of this set. The receiver is left untouched.
    pub fn filter<V: Into<AttributeValue>>(&self, column: &str, value: V) -> Result<QueryDataset> {
        if !self.has_attribute(column) {
            return Err(ViewerError::UnknownAttribute(column.to_string()).into());
        }
        let value = Some(value.into());
        let samples = self.samples.iter()
            .filter(|sample| sample.attribute(column) == value)
            .cloned()
            .collect();
        Ok(QueryDataset::from_shared(samples, self.flag_columns.clone(), self.max_top_k))
    }

    fn has_attribute(&self, column: &str) -> bool {
        matches!(column, ID_ATTRIBUTE | LABEL_ATTRIBUTE | CATEGORY_ATTRIBUTE | PATH_ATTRIBUTE)
            || self.flag_columns.iter().any(|flag| flag == column)
    }
}

/// Maps an unbounded position onto `[0, len)`; `None` if `len` is zero.
pub(crate) fn wrap_index(position: i64, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(position.rem_euclid(len as i64) as usize)
}

impl fmt::Display for QueryDataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} query samples, max top-k {}, categories [{}], flags [{}]",
            self.samples.len(),
            self.max_top_k,
            self.categories.join(", "),
            self.flag_columns.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use crate::data::query::wrap_index;
    use crate::error::ViewerError;
    use crate::types::sample::{QuerySample, RankedList, Sample};
    use crate::{ImprovementFlag, QueryDataset};

    const CMC: &str = "cmc@1_improved";

    fn query(id: &str, category: &str, flag: ImprovementFlag) -> QuerySample {
        let mut flags = BTreeMap::new();
        flags.insert(CMC.to_string(), flag);
        QuerySample::new(
            Sample::new(id, "A", category, &format!("{}.jpg", id)),
            RankedList::default(),
            RankedList::default(),
            flags).unwrap()
    }

    fn sample_dataset() -> QueryDataset {
        QueryDataset::new(vec![
            query("q0", "shoes", ImprovementFlag::Improved),
            query("q1", "bags", ImprovementFlag::Worsened),
            query("q2", "shoes", ImprovementFlag::Unchanged),
            query("q3", "shoes", ImprovementFlag::Worsened),
            query("q4", "bags", ImprovementFlag::Improved),
        ], vec![CMC.to_string()], 5)
    }

    fn ids(dataset: &QueryDataset) -> Vec<&str> {
        dataset.iter().map(|sample| sample.id()).collect()
    }

    #[test]
    fn test_new() {
        let dataset = sample_dataset();
        assert_eq!(5, dataset.len());
        assert_eq!(5, dataset.max_top_k());
        assert_eq!(&["bags".to_string(), "shoes".to_string()], dataset.categories());
    }

    #[test]
    fn test_get_wraps() {
        let dataset = sample_dataset();
        assert_eq!("q0", dataset.get(0).unwrap().id());
        assert_eq!("q4", dataset.get(-1).unwrap().id());
        assert_eq!("q0", dataset.get(5).unwrap().id());
        assert_eq!("q2", dataset.get(10_000_000_002).unwrap().id());

        let empty = dataset.filter("category", "hats").unwrap();
        assert!(empty.is_empty());
        let err = empty.get(0).unwrap_err();
        assert_eq!(Some(&ViewerError::EmptyQuerySet), err.downcast_ref::<ViewerError>());
    }

    #[test]
    fn test_wrap_index_in_range() {
        for len in 1..8_usize {
            for position in -50..50_i64 {
                let index = wrap_index(position, len).unwrap();
                assert!(index < len);
            }
            assert!(wrap_index(i64::MAX, len).unwrap() < len);
            assert!(wrap_index(i64::MIN, len).unwrap() < len);
        }
        assert_eq!(None, wrap_index(3, 0));
    }

    #[test]
    fn test_filter() {
        let dataset = sample_dataset();
        let improved = dataset.filter(CMC, ImprovementFlag::Improved).unwrap();
        let worsened = dataset.filter(CMC, ImprovementFlag::Worsened).unwrap();
        assert_eq!(vec!["q0", "q4"], ids(&improved));
        assert_eq!(vec!["q1", "q3"], ids(&worsened));
        assert!(improved.iter().all(|s| !ids(&worsened).contains(&s.id())));

        // The receiver is untouched and metadata follows the subset.
        assert_eq!(5, dataset.len());
        assert_eq!(&["bags".to_string(), "shoes".to_string()], improved.categories());
        assert_eq!(&["shoes".to_string()], dataset.filter("category", "shoes").unwrap().categories());
        assert_eq!(5, improved.max_top_k());
        assert_eq!(&[CMC.to_string()], improved.flag_columns());

        let err = dataset.filter("map@5_improved", ImprovementFlag::Improved).unwrap_err();
        assert_eq!(
            Some(&ViewerError::UnknownAttribute("map@5_improved".to_string())),
            err.downcast_ref::<ViewerError>());
    }

    #[test]
    fn test_filter_idempotent() {
        let dataset = sample_dataset();
        let once = dataset.filter(CMC, ImprovementFlag::Worsened).unwrap();
        let twice = once.filter(CMC, ImprovementFlag::Worsened).unwrap();
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn test_filter_commutes() {
        let dataset = sample_dataset();
        let category_first = dataset.filter("category", "shoes").unwrap()
            .filter(CMC, ImprovementFlag::Worsened).unwrap();
        let flag_first = dataset.filter(CMC, ImprovementFlag::Worsened).unwrap()
            .filter("category", "shoes").unwrap();
        assert_eq!(vec!["q3"], ids(&category_first));
        assert_eq!(ids(&category_first), ids(&flag_first));
    }

    #[test]
    fn test_filter_keeps_identity() {
        let dataset = sample_dataset();
        let shoes = dataset.filter("category", "shoes").unwrap();
        assert!(std::ptr::eq(dataset.get(2).unwrap(), shoes.get(1).unwrap()));
    }
}
