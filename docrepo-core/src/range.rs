//! Bounded intervals over orderable values.

use bson::{Bson, Document};
use std::ops::{RangeFrom, RangeInclusive, RangeToInclusive};

/// Key holding the lower bound of a range in dynamic query values.
pub const RANGE_START: &str = "start";
/// Key holding the upper bound of a range in dynamic query values.
pub const RANGE_END: &str = "end";

/// An inclusive interval with optional bounds.
///
/// A range with only `start` matches values `>= start`, a range with only `end`
/// matches values `<= end`. A range with neither bound is rejected when it is
/// translated.
///
/// The standard inclusive range syntaxes convert into a `Range`:
///
/// ```ignore
/// use docrepo::range::Range;
///
/// let between: Range<i64> = (10..=30).into();
/// let from: Range<i64> = (15..).into();
/// let up_to: Range<i64> = (..=20).into();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Range<T> {
    pub start: Option<T>,
    pub end: Option<T>,
}

impl<T> Range<T> {
    /// Matches values between `start` and `end`, both inclusive.
    pub fn between(start: T, end: T) -> Self {
        Self { start: Some(start), end: Some(end) }
    }

    /// Matches values greater than or equal to `start`.
    pub fn starting_at(start: T) -> Self {
        Self { start: Some(start), end: None }
    }

    /// Matches values less than or equal to `end`.
    pub fn ending_at(end: T) -> Self {
        Self { start: None, end: Some(end) }
    }

    /// Returns `true` if at least one bound is present.
    pub fn is_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Converts both bounds with the given function.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Range<U> {
        Range {
            start: self.start.map(&mut f),
            end: self.end.map(&mut f),
        }
    }
}

impl<T> From<RangeInclusive<T>> for Range<T> {
    fn from(range: RangeInclusive<T>) -> Self {
        let (start, end) = range.into_inner();
        Range::between(start, end)
    }
}

impl<T> From<RangeFrom<T>> for Range<T> {
    fn from(range: RangeFrom<T>) -> Self {
        Range::starting_at(range.start)
    }
}

impl<T> From<RangeToInclusive<T>> for Range<T> {
    fn from(range: RangeToInclusive<T>) -> Self {
        Range::ending_at(range.end)
    }
}

/// Returns `true` if a dynamic value has the shape of a range.
///
/// A range is a non-empty document whose keys are only `start` and/or `end`. Bound
/// presence is decided by the key, not by the bound's value, so `{"start": 0}` is a
/// range.
pub fn is_range(value: &Bson) -> bool {
    match value {
        Bson::Document(document) => {
            !document.is_empty()
                && document
                    .keys()
                    .all(|key| key == RANGE_START || key == RANGE_END)
        }
        _ => false,
    }
}

/// Reads a range out of a dynamic value already known to satisfy [`is_range`].
///
/// `null` bounds count as absent.
pub(crate) fn range_from_document(document: &Document) -> Range<Bson> {
    let bound = |key: &str| match document.get(key) {
        None | Some(Bson::Null) => None,
        Some(value) => Some(value.clone()),
    };

    Range {
        start: bound(RANGE_START),
        end: bound(RANGE_END),
    }
}
