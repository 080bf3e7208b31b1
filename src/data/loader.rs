use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use tracing::info;
use crate::config::DatasetConfig;
use crate::data::gallery::GalleryDataset;
use crate::data::query::QueryDataset;
use crate::data::{DatasetSource, RetrievalDataset};
use crate::error::ViewerError;
use crate::io::source::open_images;
use crate::types::sample::{GallerySample, QuerySample, RankedList, Sample,
                           CATEGORY_ATTRIBUTE, ID_ATTRIBUTE, LABEL_ATTRIBUTE, PATH_ATTRIBUTE};
use crate::types::ImprovementFlag;

/// Suffix of the per-metric improvement-flag columns, e.g. `cmc@1_improved`.
pub const IMPROVED_SUFFIX: &str = "_improved";
const POSTPROCESSED_PREFIX: &str = "postprocessed_";

fn top_k_id_column(k: usize) -> String { format!("top_{}_image_id", k) }

fn top_k_score_column(k: usize) -> String { format!("top_{}_score", k) }

/// Column positions of a CSV header, looked up by name.
struct Header {
    positions: HashMap<String, usize>,
    names: Vec<String>,
}

impl Header {
    fn new(record: &StringRecord) -> Header {
        let names = record.iter().map(|name| name.trim().to_string()).collect::<Vec<_>>();
        let positions = names.iter()
            .enumerate()
            .map(|(position, name)| (name.clone(), position))
            .collect();
        Header { positions, names }
    }

    fn position(&self, name: &str) -> Option<usize> { self.positions.get(name).copied() }

    fn require(&self, name: &str) -> Result<usize> {
        self.position(name).ok_or_else(|| ViewerError::MissingColumn(name.to_string()).into())
    }

    /// The largest K such that raw and postprocessed id and score columns exist for 1..=K.
    fn max_top_k(&self) -> usize {
        (1..)
            .take_while(|&k| {
                [top_k_id_column(k), top_k_score_column(k)].iter().all(|column| {
                    self.position(column).is_some()
                        && self.position(&format!("{}{}", POSTPROCESSED_PREFIX, column)).is_some()
                })
            })
            .count()
    }

    fn flag_columns(&self) -> Vec<String> {
        self.names.iter()
            .filter(|name| name.ends_with(IMPROVED_SUFFIX))
            .cloned()
            .collect()
    }
}

/// Positions of the fields every sample row carries.
struct SampleColumns {
    id: usize,
    label: usize,
    category: usize,
    path: usize,
}

impl SampleColumns {
    fn new(header: &Header) -> Result<SampleColumns> {
        Ok(SampleColumns {
            id: header.require(ID_ATTRIBUTE)?,
            label: header.require(LABEL_ATTRIBUTE)?,
            category: header.require(CATEGORY_ATTRIBUTE)?,
            path: header.require(PATH_ATTRIBUTE)?,
        })
    }

    fn read(&self, record: &StringRecord) -> Result<Sample> {
        Ok(Sample::new(
            &normalize_id(cell(record, self.id)?),
            &normalize_id(cell(record, self.label)?),
            cell(record, self.category)?,
            cell(record, self.path)?))
    }
}

fn cell(record: &StringRecord, position: usize) -> Result<&str> {
    record.get(position)
        .map(str::trim)
        .ok_or_else(|| anyhow!("Row has {} fields, expected at least {}.", record.len(), position + 1))
}

/// Integral identifiers written as floats (`12.0`) are reduced to their integer form (`12`), so
/// that ids from score tables and gallery tables compare equal.
fn normalize_id(raw: &str) -> String {
    match raw.strip_suffix(".0") {
        Some(integral) if !integral.is_empty() && integral.parse::<i64>().is_ok() => integral.to_string(),
        _ => raw.to_string(),
    }
}

fn read_csv(path: &Path) -> Result<(Header, Vec<StringRecord>)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open '{}'", path.display()))?;
    let header = Header::new(reader.headers()?);
    let records = reader.records()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    Ok((header, records))
}

/// Reads a gallery table with `image_id`, `label`, `category` and `path` columns.
pub fn read_gallery<P: AsRef<Path>>(path: P) -> Result<GalleryDataset> {
    let path = path.as_ref();
    let (header, records) = read_csv(path)?;
    let columns = SampleColumns::new(&header)
        .with_context(|| format!("gallery table '{}'", path.display()))?;

    let samples = records.iter()
        .enumerate()
        .map(|(row, record)| {
            columns.read(record).with_context(|| format!("'{}', row {}", path.display(), row + 1))
        })
        .collect::<Result<Vec<GallerySample>>>()?;
    GalleryDataset::new(samples)
}

/// Reads a query table: sample columns, `top_<k>_image_id`/`top_<k>_score` columns and their
/// `postprocessed_` counterparts, and any number of `*_improved` flag columns.
///
/// Returns an error if a required column is missing, if a cell cannot be parsed, or if a row
/// carries a different number of ids and scores.
pub fn read_queries<P: AsRef<Path>>(path: P) -> Result<QueryDataset> {
    let path = path.as_ref();
    let (header, records) = read_csv(path)?;
    let columns = SampleColumns::new(&header)
        .with_context(|| format!("query table '{}'", path.display()))?;

    let max_top_k = header.max_top_k();
    if max_top_k == 0 {
        return Err(anyhow::Error::from(ViewerError::MissingColumn(top_k_id_column(1)))
            .context(format!("query table '{}'", path.display())));
    }
    let flag_columns = header.flag_columns();

    let samples = records.iter()
        .enumerate()
        .map(|(row, record)| {
            read_query(&header, &columns, &flag_columns, max_top_k, record)
                .with_context(|| format!("'{}', row {}", path.display(), row + 1))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(QueryDataset::new(samples, flag_columns, max_top_k))
}

fn read_query(
    header: &Header,
    columns: &SampleColumns,
    flag_columns: &[String],
    max_top_k: usize,
    record: &StringRecord,
) -> Result<QuerySample> {
    let sample = columns.read(record)?;
    let top_k = read_ranked_list(header, record, "", max_top_k)?;
    let postprocessed_top_k = read_ranked_list(header, record, POSTPROCESSED_PREFIX, max_top_k)?;

    let mut flags = BTreeMap::new();
    for column in flag_columns {
        let raw = cell(record, header.require(column)?)?;
        if raw.is_empty() {
            continue;
        }
        let flag: ImprovementFlag = raw.parse().with_context(|| format!("column '{}'", column))?;
        flags.insert(column.clone(), flag);
    }
    QuerySample::new(sample, top_k, postprocessed_top_k, flags)
}

/// Reads ranks 1..=`max_top_k`, stopping early at the first rank with an empty id cell. A
/// present id with an empty score (or the reverse) is kept as is and rejected by
/// `QuerySample::new`.
fn read_ranked_list(header: &Header, record: &StringRecord, prefix: &str, max_top_k: usize) -> Result<RankedList> {
    let mut ids = Vec::with_capacity(max_top_k);
    let mut scores = Vec::with_capacity(max_top_k);
    for k in 1..=max_top_k {
        let id_column = format!("{}{}", prefix, top_k_id_column(k));
        let score_column = format!("{}{}", prefix, top_k_score_column(k));
        let id = cell(record, header.require(&id_column)?)?;
        let score = cell(record, header.require(&score_column)?)?;
        if id.is_empty() && score.is_empty() {
            break;
        }
        if !id.is_empty() {
            ids.push(normalize_id(id));
        }
        if !score.is_empty() {
            let score: f32 = score.parse()
                .map_err(|_| anyhow!("'{}' in column '{}' is not a number", score, score_column))?;
            scores.push(score);
        }
    }
    Ok(RankedList::new(ids, scores))
}

/// Loads the datasets listed in a configuration from CSV tables and image directories or archives.
pub struct CsvDatasetSource {
    datasets: Vec<DatasetConfig>,
}

impl CsvDatasetSource {
    pub fn new(datasets: Vec<DatasetConfig>) -> CsvDatasetSource {
        CsvDatasetSource { datasets }
    }
}

impl DatasetSource for CsvDatasetSource {
    fn names(&self) -> Vec<String> {
        self.datasets.iter().map(|dataset| dataset.name.clone()).collect()
    }

    fn load(&self, name: &str) -> Result<RetrievalDataset> {
        let config = self.datasets.iter()
            .find(|dataset| dataset.name == name)
            .ok_or_else(|| ViewerError::UnknownDataset(name.to_string()))?;

        let queries = read_queries(&config.query)?;
        let gallery = read_gallery(&config.gallery)?;
        let images = open_images(&config.images)?;
        let dataset = RetrievalDataset { name: name.to_string(), queries, gallery, images };
        dataset.validate().with_context(|| format!("dataset '{}'", name))?;

        info!(
            dataset = name,
            queries = dataset.queries.len(),
            gallery = dataset.gallery.len(),
            max_top_k = dataset.queries.max_top_k(),
            categories = dataset.queries.categories().len(),
            "loaded dataset");
        Ok(dataset)
    }
}
