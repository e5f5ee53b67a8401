use std::collections::{btree_map, BTreeMap};

use serde::{Deserialize, Serialize};

use crate::Year;

/// Year keyed values, iterated in year order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct YearSeries<V>(BTreeMap<Year, V>);

impl<V> Default for YearSeries<V> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<V> YearSeries<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, year: Year, value: V) -> Option<V> {
        self.0.insert(year, value)
    }

    pub fn get(&self, year: Year) -> Option<&V> {
        self.0.get(&year)
    }

    pub fn contains_year(&self, year: Year) -> bool {
        self.0.contains_key(&year)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn years(&self) -> impl Iterator<Item = Year> + '_ {
        self.0.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.0.values()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Year, V> {
        self.0.iter()
    }

    pub fn map_values<U, F>(&self, mut f: F) -> YearSeries<U>
    where
        F: FnMut(Year, &V) -> U,
    {
        YearSeries(self.0.iter().map(|(y, v)| (*y, f(*y, v))).collect())
    }

    pub fn into_inner(self) -> BTreeMap<Year, V> {
        self.0
    }
}

impl<V> YearSeries<V>
where
    V: Copy + Into<f64>,
{
    pub fn to_f64(&self) -> YearSeries<f64> {
        self.map_values(|_, v| (*v).into())
    }
}

impl<V> FromIterator<(Year, V)> for YearSeries<V> {
    fn from_iter<T: IntoIterator<Item = (Year, V)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<V> From<BTreeMap<Year, V>> for YearSeries<V> {
    fn from(value: BTreeMap<Year, V>) -> Self {
        Self(value)
    }
}

impl<V, const N: usize> From<[(Year, V); N]> for YearSeries<V> {
    fn from(value: [(Year, V); N]) -> Self {
        value.into_iter().collect()
    }
}

impl<'a, V> IntoIterator for &'a YearSeries<V> {
    type Item = (&'a Year, &'a V);
    type IntoIter = btree_map::Iter<'a, Year, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<V> IntoIterator for YearSeries<V> {
    type Item = (Year, V);
    type IntoIter = btree_map::IntoIter<Year, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_iteration() {
        let s: YearSeries<u32> = vec![(2022, 1), (2019, 3), (2021, 2)].into_iter().collect();
        assert_eq!(s.years().collect::<Vec<_>>(), vec![2019, 2021, 2022]);
    }

    #[test]
    fn unique_keys() {
        let mut s = YearSeries::from([(2020, 1_u32)]);
        assert_eq!(s.insert(2020, 5), Some(1));
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(2020), Some(&5));
    }

    #[test]
    fn serializes_as_map() {
        let s = YearSeries::from([(2021, 4_u32), (2022, 1)]);
        let js = serde_json::to_string(&s).unwrap();
        assert_eq!(js, r#"{"2021":4,"2022":1}"#);
    }
}
