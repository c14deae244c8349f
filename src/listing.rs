//! Query refinements shared by the list endpoints.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::{AppResult, FieldErrors};

/// A parsed `?ordering=` value: a field name, optionally prefixed with `-`
/// for descending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<F> {
    pub field: F,
    pub descending: bool,
}

impl<F: FromStr> SortKey<F> {
    /// Parses an optional ordering parameter. Unknown fields are reported
    /// against `ordering`.
    pub fn parse(raw: Option<&str>) -> AppResult<Option<Self>> {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Ok(None);
        };
        let (descending, name) = match raw.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, raw),
        };
        match name.parse::<F>() {
            Ok(field) => Ok(Some(SortKey { field, descending })),
            Err(_) => {
                let mut errors = FieldErrors::new();
                errors.add("ordering", format!("Cannot order by \"{raw}\"."));
                errors.into_result().map(|()| None)
            }
        }
    }

    pub fn direct(&self, ordering: Ordering) -> Ordering {
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}
