//! Query-string filters for list endpoints.
//!
//! Each repository declares which fields may be filtered and how (exact
//! match or case-insensitive substring). [`Filters::parse`] turns the raw
//! `key=value` query map into typed filters, rejecting unknown keys, and the
//! result is applied either to a `sqlx::QueryBuilder` or, for the in-memory
//! store, to a field lookup closure.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use storekeep_core::{Document, Email, OrderStatusCode};

use crate::validation::ValidationErrors;

/// How a filter value is compared against the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// Column equals the value.
    Equals,
    /// Column contains the value, ignoring case.
    Contains,
}

/// How the raw query-string value is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Document,
    Email,
    Decimal,
    OrderStatus,
}

/// A filterable field of an entity.
#[derive(Debug)]
pub struct FilterField {
    /// Query-string key.
    pub name: &'static str,
    /// Qualified SQL column.
    pub column: &'static str,
    pub matching: Match,
    pub kind: ValueKind,
}

impl FilterField {
    /// Case-insensitive substring filter on a text column.
    #[must_use]
    pub const fn contains(name: &'static str, column: &'static str) -> Self {
        Self {
            name,
            column,
            matching: Match::Contains,
            kind: ValueKind::Text,
        }
    }

    /// Exact-match filter.
    #[must_use]
    pub const fn equals(name: &'static str, column: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            column,
            matching: Match::Equals,
            kind,
        }
    }

    fn parse_value(&self, raw: &str) -> Result<FilterValue, String> {
        match self.kind {
            ValueKind::Text => Ok(FilterValue::Text(raw.trim().to_string())),
            ValueKind::Document => Document::parse(raw)
                .map(|d| FilterValue::Text(d.into_inner()))
                .map_err(|e| e.to_string()),
            ValueKind::Email => Email::parse(raw)
                .map(|e| FilterValue::Text(e.as_str().to_string()))
                .map_err(|e| e.to_string()),
            ValueKind::Decimal => raw
                .trim()
                .parse::<Decimal>()
                .map(FilterValue::Decimal)
                .map_err(|_| format!("'{raw}' is not a decimal number")),
            ValueKind::OrderStatus => raw
                .trim()
                .parse::<OrderStatusCode>()
                .map(FilterValue::OrderStatus)
                .map_err(|e| e.to_string()),
        }
    }
}

/// A parsed filter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Decimal(Decimal),
    OrderStatus(OrderStatusCode),
}

/// One field/value pair.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: &'static FilterField,
    pub value: FilterValue,
}

impl Filter {
    /// Whether an entity's value for this field satisfies the filter.
    #[must_use]
    pub fn matches(&self, candidate: Option<&FilterValue>) -> bool {
        let Some(candidate) = candidate else {
            return false;
        };

        match (self.field.matching, &self.value, candidate) {
            (Match::Contains, FilterValue::Text(needle), FilterValue::Text(haystack)) => {
                haystack.to_lowercase().contains(&needle.to_lowercase())
            }
            (Match::Equals, expected, actual) => expected == actual,
            _ => false,
        }
    }
}

/// A set of filters, all of which must match.
#[derive(Debug, Clone, Default)]
pub struct Filters(Vec<Filter>);

impl Filters {
    /// No filtering.
    #[must_use]
    pub const fn none() -> Self {
        Self(Vec::new())
    }

    /// Parse query-string parameters against the allowed fields.
    ///
    /// # Errors
    ///
    /// Returns one field error per unknown key or unparseable value.
    pub fn parse(
        allowed: &'static [FilterField],
        params: &HashMap<String, String>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut filters = Vec::with_capacity(params.len());

        let mut keys: Vec<&String> = params.keys().collect();
        keys.sort();

        for key in keys {
            let raw = params.get(key).map_or("", String::as_str);
            let Some(field) = allowed.iter().find(|f| f.name == key) else {
                let names: Vec<&str> = allowed.iter().map(|f| f.name).collect();
                errors.add(
                    key.as_str(),
                    format!("is not a filterable field (allowed: {})", names.join(", ")),
                );
                continue;
            };

            match field.parse_value(raw) {
                Ok(value) => filters.push(Filter { field, value }),
                Err(message) => errors.add(key.as_str(), message),
            }
        }

        errors.into_result(Self(filters))
    }

    /// Whether there is nothing to filter on.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the filters.
    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.0.iter()
    }

    /// Check an entity, given a lookup from field name to its value.
    pub fn matches<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<FilterValue>,
    {
        self.0
            .iter()
            .all(|filter| filter.matches(lookup(filter.field.name).as_ref()))
    }

    /// Append `AND <condition>` clauses for every filter.
    ///
    /// The builder must already contain a `WHERE` clause (e.g. `WHERE TRUE`).
    pub fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        for filter in &self.0 {
            builder.push(" AND ").push(filter.field.column);
            match (&filter.field.matching, &filter.value) {
                (Match::Contains, FilterValue::Text(text)) => {
                    builder
                        .push(" ILIKE ")
                        .push_bind(format!("%{}%", escape_like(text)));
                }
                (_, FilterValue::Text(text)) => {
                    builder.push(" = ").push_bind(text.clone());
                }
                (_, FilterValue::Decimal(value)) => {
                    builder.push(" = ").push_bind(*value);
                }
                (_, FilterValue::OrderStatus(code)) => {
                    builder.push(" = ").push_bind(*code);
                }
            }
        }
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    static FIELDS: &[FilterField] = &[
        FilterField::contains("name", "p.name"),
        FilterField::equals("price", "p.price", ValueKind::Decimal),
        FilterField::equals("document", "c.document", ValueKind::Document),
    ];

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_parse_known_fields() {
        let filters = Filters::parse(FIELDS, &params(&[("name", "burg"), ("price", "10.5")]))
            .unwrap();
        assert_eq!(filters.iter().count(), 2);
    }

    #[test]
    fn test_parse_rejects_unknown_field() {
        let errors = Filters::parse(FIELDS, &params(&[("color", "red")])).unwrap_err();
        assert_eq!(
            errors.messages(),
            vec!["color: is not a filterable field (allowed: name, price, document)"]
        );
    }

    #[test]
    fn test_parse_rejects_bad_value() {
        let errors = Filters::parse(FIELDS, &params(&[("price", "cheap")])).unwrap_err();
        assert_eq!(errors.messages(), vec!["price: 'cheap' is not a decimal number"]);
    }

    #[test]
    fn test_document_filter_is_normalized() {
        let filters = Filters::parse(FIELDS, &params(&[("document", "123.456.789-09")])).unwrap();
        assert!(filters.matches(|_| Some(FilterValue::Text("12345678909".to_string()))));
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let filters = Filters::parse(FIELDS, &params(&[("name", "BURG")])).unwrap();
        assert!(filters.matches(|_| Some(FilterValue::Text("Cheeseburger".to_string()))));
        assert!(!filters.matches(|_| Some(FilterValue::Text("Fries".to_string()))));
    }

    #[test]
    fn test_decimal_equality_ignores_scale() {
        let filters = Filters::parse(FIELDS, &params(&[("price", "10.5")])).unwrap();
        assert!(filters.matches(|_| Some(FilterValue::Decimal(Decimal::new(1050, 2)))));
    }

    #[test]
    fn test_missing_value_does_not_match() {
        let filters = Filters::parse(FIELDS, &params(&[("name", "x")])).unwrap();
        assert!(!filters.matches(|_| None));
    }

    #[test]
    fn test_sql_conditions() {
        let filters = Filters::parse(FIELDS, &params(&[("name", "50%"), ("price", "2")])).unwrap();
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM p WHERE TRUE");
        filters.push_conditions(&mut builder);
        assert_eq!(
            builder.sql(),
            "SELECT * FROM p WHERE TRUE AND p.name ILIKE $1 AND p.price = $2"
        );
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
