//! Partial-success container shared by adapters and the orchestrator.

use super::error::BidderError;

/// Values and errors produced side by side.
///
/// The two sequences are independent: errors never imply an absence of values,
/// so an adapter can reject one impression and still bid on the others.
#[derive(Debug, Clone, PartialEq)]
pub struct BidderResult<T> {
    pub values: Vec<T>,
    pub errors: Vec<BidderError>,
}

impl<T> BidderResult<T> {
    #[must_use]
    pub fn of(values: Vec<T>, errors: Vec<BidderError>) -> Self {
        Self { values, errors }
    }

    #[must_use]
    pub fn with_values(values: Vec<T>) -> Self {
        Self::of(values, Vec::new())
    }

    #[must_use]
    pub fn with_error(error: BidderError) -> Self {
        Self::of(Vec::new(), vec![error])
    }

    #[must_use]
    pub fn with_errors(errors: Vec<BidderError>) -> Self {
        Self::of(Vec::new(), errors)
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::of(Vec::new(), Vec::new())
    }

    /// True when neither values nor errors were produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.errors.is_empty()
    }

    /// Append another result, keeping the relative order of both.
    pub fn extend(&mut self, other: BidderResult<T>) {
        self.values.extend(other.values);
        self.errors.extend(other.errors);
    }

    pub fn push_error(&mut self, error: BidderError) {
        self.errors.push(error);
    }

    pub fn map<U, F>(self, f: F) -> BidderResult<U>
    where
        F: FnMut(T) -> U,
    {
        BidderResult {
            values: self.values.into_iter().map(f).collect(),
            errors: self.errors,
        }
    }
}

impl<T> Default for BidderResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> FromIterator<BidderResult<T>> for BidderResult<T> {
    fn from_iter<I: IntoIterator<Item = BidderResult<T>>>(iter: I) -> Self {
        let mut merged = Self::empty();
        for result in iter {
            merged.extend(result);
        }
        merged
    }
}
