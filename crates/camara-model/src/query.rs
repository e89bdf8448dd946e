//! Query parameters passed down the crawl.
//!
//! A base set (date range, legislatures, direction) is built once. Each
//! level derives its own copy with [`QueryParams::with`] and friends, so a
//! branch's overrides are never visible to its parent or siblings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const START_DATE: &str = "dataInicio";
pub const END_DATE: &str = "dataFim";
pub const LEGISLATURE: &str = "idLegislatura";
pub const SORT_FIELD: &str = "ordenarPor";
pub const SORT_ORDER: &str = "ordem";
pub const ORGANIZATION_CODE: &str = "sigla";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            other => Err(format!("unknown sort order '{other}', expected ASC or DESC")),
        }
    }
}

/// A single value or a repeatable list (sent as `name=a&name=b`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    One(String),
    Many(Vec<String>),
}

impl ParamValue {
    fn is_empty(&self) -> bool {
        match self {
            Self::One(value) => value.is_empty(),
            Self::Many(values) => values.is_empty(),
        }
    }
}

/// Insertion-ordered mapping of filter name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, ParamValue)>,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing any previous value in place. Empty values
    /// remove the entry so they are never sent.
    pub fn set(&mut self, name: &str, value: ParamValue) {
        if value.is_empty() {
            self.remove(name);
            return;
        }
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(key, _)| key != name);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Independent copy with `name` overridden.
    #[must_use]
    pub fn with(&self, name: &str, value: ParamValue) -> Self {
        let mut branch = self.clone();
        branch.set(name, value);
        branch
    }

    /// Independent copy with the level's sort field. `None` or an empty
    /// field drops any inherited sort field.
    #[must_use]
    pub fn with_sort_field(&self, field: Option<&str>) -> Self {
        self.with(
            SORT_FIELD,
            ParamValue::One(field.unwrap_or_default().to_string()),
        )
    }

    #[must_use]
    pub fn date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        if let Some(start) = start {
            self.set(
                START_DATE,
                ParamValue::One(start.format(DATE_FORMAT).to_string()),
            );
        }
        if let Some(end) = end {
            self.set(END_DATE, ParamValue::One(end.format(DATE_FORMAT).to_string()));
        }
        self
    }

    #[must_use]
    pub fn legislatures(mut self, ids: &[u32]) -> Self {
        self.set(
            LEGISLATURE,
            ParamValue::Many(ids.iter().map(ToString::to_string).collect()),
        );
        self
    }

    #[must_use]
    pub fn order(mut self, order: SortOrder) -> Self {
        self.set(SORT_ORDER, ParamValue::One(order.as_str().to_string()));
        self
    }

    #[must_use]
    pub fn organization_codes(mut self, codes: &[String]) -> Self {
        self.set(ORGANIZATION_CODE, ParamValue::Many(codes.to_vec()));
        self
    }

    /// Flatten into `(name, value)` pairs, repeating names for lists.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(name, value)| {
            let values: Vec<&str> = match value {
                ParamValue::One(value) => vec![value.as_str()],
                ParamValue::Many(values) => values.iter().map(String::as_str).collect(),
            };
            values.into_iter().map(move |value| (name.as_str(), value))
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
