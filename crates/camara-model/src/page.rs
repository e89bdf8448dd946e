//! One response's worth of a listing, and the decoder that turns its raw
//! records into typed entities.

use serde_json::Value;

use crate::entity::{Entity, EntityKind};

/// Raw records from one response plus the `next` locator, if the server
/// advertised one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub records: Vec<Value>,
    pub next: Option<String>,
}

/// The response body was JSON but not shaped like `{"dados": ...}`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("malformed response body: {reason}")]
pub struct MalformedBody {
    reason: &'static str,
}

/// A raw record could not be turned into the requested entity.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode {kind} at index {index}: {source}")]
pub struct DecodeError {
    pub kind: EntityKind,
    pub index: usize,
    #[source]
    pub source: serde_json::Error,
}

impl Page {
    /// Build a page from a parsed response body.
    ///
    /// Listings carry `{"dados": [...]}`; detail endpoints carry
    /// `{"dados": {...}}`, which becomes a one-record page.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedBody`] when the body has no `dados` key or when
    /// `dados` is neither an array nor an object.
    pub fn from_body(body: Value, next: Option<String>) -> Result<Self, MalformedBody> {
        let Value::Object(mut body) = body else {
            return Err(MalformedBody {
                reason: "body is not a JSON object",
            });
        };

        let records = match body.remove("dados") {
            Some(Value::Array(records)) => records,
            Some(record @ Value::Object(_)) => vec![record],
            Some(_) => {
                return Err(MalformedBody {
                    reason: "`dados` is neither an array nor an object",
                })
            }
            None => {
                return Err(MalformedBody {
                    reason: "missing `dados` key",
                })
            }
        };

        Ok(Self { records, next })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Decode every record of `page` as `T`.
///
/// All-or-nothing: the first record that fails aborts the page, so the
/// caller can decide whether to drop the page or the whole branch.
///
/// # Errors
///
/// Returns [`DecodeError`] naming the entity kind and record index when a
/// required field is missing or has the wrong shape.
pub fn decode<T: Entity>(page: &Page) -> Result<Vec<T>, DecodeError> {
    page.records
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            T::deserialize(raw).map_err(|source| DecodeError {
                kind: T::KIND,
                index,
                source,
            })
        })
        .collect()
}

/// Decode the single document of a detail page. Returns `None` for an
/// empty page.
///
/// # Errors
///
/// Returns [`DecodeError`] when the document does not match `T`.
pub fn decode_one<T: Entity>(page: &Page) -> Result<Option<T>, DecodeError> {
    Ok(decode::<T>(page)?.into_iter().next())
}
