//! Benefit records and the filters applied to them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of the benefits catalog.
///
/// There is no fixed schema: spreadsheet rows carry whatever headers the
/// sheet has (always as strings), database rows carry the table's columns
/// with their native JSON types. Only `id` is guaranteed to be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Benefit(Map<String, Value>);

impl Benefit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of `key`, if the field exists and holds a string.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// True when `key` is missing, null, or an empty string.
    pub fn is_blank(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Benefit {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Where a resolved benefits list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenefitSource {
    Spreadsheet,
    Database,
}

impl BenefitSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spreadsheet => "spreadsheet",
            Self::Database => "database",
        }
    }
}

impl std::fmt::Display for BenefitSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Listing filters.
///
/// The two sources apply these differently: spreadsheet rows are compared
/// case-insensitively in process (`matches_ignore_case`), while the
/// database compares with SQL `=`, i.e. exact and collation dependent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenefitFilter {
    pub category: Option<String>,
    pub bank: Option<String>,
    pub limit: Option<u32>,
}

impl BenefitFilter {
    pub fn by_category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    /// Unfiltered: the complete catalog.
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.bank.is_none() && self.limit.is_none()
    }

    /// Spreadsheet-path match. A row without the filtered field never
    /// matches.
    pub fn matches_ignore_case(&self, benefit: &Benefit) -> bool {
        field_matches(benefit, "category", self.category.as_deref())
            && field_matches(benefit, "bank", self.bank.as_deref())
    }

    /// Filter then truncate, the in-process counterpart of
    /// `WHERE ... LIMIT n`.
    pub fn apply_ignore_case(&self, benefits: Vec<Benefit>) -> Vec<Benefit> {
        let matching = benefits
            .into_iter()
            .filter(|benefit| self.matches_ignore_case(benefit));

        match self.limit {
            Some(limit) => matching.take(limit as usize).collect(),
            None => matching.collect(),
        }
    }
}

fn field_matches(benefit: &Benefit, key: &str, wanted: Option<&str>) -> bool {
    let Some(wanted) = wanted else {
        return true;
    };
    match benefit.text(key) {
        Some(value) if !value.is_empty() => value.to_lowercase() == wanted.to_lowercase(),
        _ => false,
    }
}
