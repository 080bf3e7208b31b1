use std::fmt::{Display, Formatter};
use std::str::FromStr;
use anyhow::anyhow;

pub mod sample;

/// Which precomputed result list of a query sample to display.
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy)]
pub enum MatchingMode {
    /// Top-k as ranked by the baseline retrieval model.
    BeforePostprocessing,
    /// Top-k after the reranking stage re-scored the baseline output.
    AfterPostprocessing,
}

impl MatchingMode {
    /// Heading shown above a row of results rendered in this mode.
    pub fn title(&self) -> &'static str {
        match self {
            MatchingMode::BeforePostprocessing => "Baseline model",
            MatchingMode::AfterPostprocessing => "Baseline model + postprocessing",
        }
    }
}

impl Display for MatchingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchingMode::BeforePostprocessing => write!(f, "before"),
            MatchingMode::AfterPostprocessing => write!(f, "after"),
        }
    }
}

impl FromStr for MatchingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" | "baseline" | "before-postprocessing" => Ok(MatchingMode::BeforePostprocessing),
            "after" | "postprocessed" | "after-postprocessing" => Ok(MatchingMode::AfterPostprocessing),
            _ => Err(anyhow!("Matching mode must be one of [before|after]"))
        }
    }
}

/// Per-query, per-metric outcome of reranking.
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy, PartialOrd, Ord)]
pub enum ImprovementFlag {
    Worsened,
    Unchanged,
    Improved,
}

impl ImprovementFlag {
    /// The value stored in `<metric>@<k>_improved` columns.
    pub fn value(&self) -> i8 {
        match self {
            ImprovementFlag::Worsened => -1,
            ImprovementFlag::Unchanged => 0,
            ImprovementFlag::Improved => 1,
        }
    }
}

impl TryFrom<i64> for ImprovementFlag {
    type Error = anyhow::Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(ImprovementFlag::Worsened),
            0 => Ok(ImprovementFlag::Unchanged),
            1 => Ok(ImprovementFlag::Improved),
            _ => Err(anyhow!("Improvement flag must be one of [-1|0|1], got {}", value)),
        }
    }
}

impl FromStr for ImprovementFlag {
    type Err = anyhow::Error;

    /// Accepts integral values written either as integers or as floats (`1`, `-1.0`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s.trim().parse()
            .map_err(|_| anyhow!("Improvement flag '{}' is not a number", s))?;
        if value.fract() != 0.0 {
            return Err(anyhow!("Improvement flag '{}' is not an integer", s));
        }
        ImprovementFlag::try_from(value as i64)
    }
}

impl Display for ImprovementFlag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// The user's choice between the two non-trivial halves of an improvement-flag filter.
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy)]
pub enum ImprovementChoice {
    Improvements,
    Worsenings,
}

impl ImprovementChoice {
    pub fn flag(&self) -> ImprovementFlag {
        match self {
            ImprovementChoice::Improvements => ImprovementFlag::Improved,
            ImprovementChoice::Worsenings => ImprovementFlag::Worsened,
        }
    }
}

impl Display for ImprovementChoice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ImprovementChoice::Improvements => write!(f, "Show only improvements"),
            ImprovementChoice::Worsenings => write!(f, "Show only worsenings"),
        }
    }
}

impl FromStr for ImprovementChoice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "improved" | "improvements" => Ok(ImprovementChoice::Improvements),
            "worsened" | "worsenings" => Ok(ImprovementChoice::Worsenings),
            _ => Err(anyhow!("Improvement choice must be one of [improved|worsened]"))
        }
    }
}

/// Value of a named query-sample attribute, as compared by exact-match filters.
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub enum AttributeValue {
    Text(String),
    Flag(ImprovementFlag),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self { AttributeValue::Text(value.to_string()) }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self { AttributeValue::Text(value) }
}

impl From<ImprovementFlag> for AttributeValue {
    fn from(value: ImprovementFlag) -> Self { AttributeValue::Flag(value) }
}
