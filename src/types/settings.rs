//! Index settings payload for `PATCH /indexes/{uid}/settings`.
//!
//! Only fields that are set are sent; the service leaves every omitted
//! setting untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Partial index settings.
///
/// # Examples
///
/// ```
/// use index_tasks::Settings;
///
/// let settings = Settings::new().with_filterable_attributes(["genre"]);
/// let json = serde_json::to_value(&settings).unwrap();
/// assert_eq!(json, serde_json::json!({ "filterableAttributes": ["genre"] }));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Attributes usable in filter expressions and facets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filterable_attributes: Option<Vec<String>>,

    /// Attributes usable in sort expressions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sortable_attributes: Option<Vec<String>>,

    /// Attributes searched for query terms, in priority order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searchable_attributes: Option<Vec<String>>,

    /// Attributes returned in hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub displayed_attributes: Option<Vec<String>>,

    /// Attribute whose value must be unique among returned hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct_attribute: Option<String>,

    /// Ranking rules, in order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking_rules: Option<Vec<String>>,

    /// Words ignored by the query parser.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_words: Option<Vec<String>>,

    /// Synonym lists keyed by word.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<BTreeMap<String, Vec<String>>>,

    /// Embedder configurations keyed by embedder name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedders: Option<Map<String, Value>>,
}

fn to_strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl Settings {
    /// Empty settings: nothing is changed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filterable attributes.
    #[must_use]
    pub fn with_filterable_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filterable_attributes = Some(to_strings(attributes));
        self
    }

    /// Set the sortable attributes.
    #[must_use]
    pub fn with_sortable_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sortable_attributes = Some(to_strings(attributes));
        self
    }

    /// Set the searchable attributes.
    #[must_use]
    pub fn with_searchable_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable_attributes = Some(to_strings(attributes));
        self
    }

    /// Set the distinct attribute.
    #[must_use]
    pub fn with_distinct_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.distinct_attribute = Some(attribute.into());
        self
    }

    /// Add or replace one embedder configuration.
    #[must_use]
    pub fn with_embedder(mut self, name: impl Into<String>, config: Value) -> Self {
        self.embedders
            .get_or_insert_with(Map::new)
            .insert(name.into(), config);
        self
    }

    /// Returns `true` if no setting would be changed.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
