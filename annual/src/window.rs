use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::Year;

/// Closed `[start, end]` range of years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearWindow {
    pub start: Year,
    pub end: Year,
}

impl YearWindow {
    pub fn new(start: Year, end: Year) -> Self {
        Self { start, end }
    }

    pub fn single(year: Year) -> Self {
        Self::new(year, year)
    }

    pub fn contains(&self, year: Year) -> bool {
        self.start <= year && year <= self.end
    }

    pub fn years(&self) -> RangeInclusive<Year> {
        self.start..=self.end
    }

    pub fn len(&self) -> usize {
        if self.start > self.end {
            return 0;
        }
        (self.end - self.start) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lazily keeps the items whose year lies inside `window`.
///
/// Items without a year are dropped whatever the bounds are.
pub fn in_window<T, I, F>(items: I, window: YearWindow, year_of: F) -> impl Iterator<Item = T>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> Option<Year>,
{
    items
        .into_iter()
        .filter(move |e| year_of(e).is_some_and(|y| window.contains(y)))
}

/// Same as [`in_window`] with a fallible year extractor.
///
/// Extraction failures are passed through as `Err` items, nothing is skipped silently.
pub fn try_in_window<T, E, I, F>(
    items: I,
    window: YearWindow,
    year_of: F,
) -> impl Iterator<Item = Result<T, E>>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> Result<Option<Year>, E>,
{
    items.into_iter().filter_map(move |e| match year_of(&e) {
        Ok(Some(y)) if window.contains(y) => Some(Ok(e)),
        Ok(_) => None,
        Err(err) => Some(Err(err)),
    })
}
