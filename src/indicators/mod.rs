use std::collections::{btree_map, BTreeMap};

use annual::{Reducer, YearSeries, YearWindow};
use serde::Serialize;

use crate::{error::Result, labels::MessageResolver, structs::OrgId};

mod catalog;
mod count;
mod fte;
mod ratio;

pub use catalog::{
    Catalog, Collaborators, IndicatorDefinition, IndicatorKind, IndicatorSpec, SeriesDefinition,
    SeriesSpec,
};
pub use count::{AuthorRole, Category, CategorySpec, CountIndicator, CountIndicatorBuilder};
pub use fte::{FteIndicator, FteMode, StatusSelector};
pub use ratio::RatioIndicator;

/// Named component series behind a result, for display only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ComputationDetails(BTreeMap<String, YearSeries<f64>>);

impl ComputationDetails {
    pub fn single(name: &str, series: YearSeries<f64>) -> Self {
        let mut d = Self::default();
        d.insert(name, series);
        d
    }

    pub fn insert(&mut self, name: &str, series: YearSeries<f64>) {
        self.0.insert(name.to_owned(), series);
    }

    pub fn nest(&mut self, prefix: &str, other: ComputationDetails) {
        for (name, series) in other.0 {
            self.0.insert(format!("{prefix}.{name}"), series);
        }
    }

    pub fn get(&self, name: &str) -> Option<&YearSeries<f64>> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, YearSeries<f64>> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Computation {
    pub series: YearSeries<f64>,
    pub details: ComputationDetails,
}

pub trait AnnualIndicator: Send + Sync {
    fn key(&self) -> &str;

    fn values_per_year(&self, org: OrgId, window: YearWindow) -> Result<Computation>;

    fn reducer(&self) -> Reducer {
        Reducer::Sum
    }

    fn merged_value(&self, org: OrgId, window: YearWindow) -> Result<f64> {
        let computation = self.values_per_year(org, window)?;
        Ok(self.reducer().apply(&computation.series))
    }

    fn name(&self, resolver: &dyn MessageResolver, locale: &str) -> String {
        resolver.message(locale, &format!("{}.name", self.key()), &[])
    }

    /// `{key}.label` when the resolver has one, otherwise the generic
    /// `indicator.label` template with the name in front of `args`.
    fn label(&self, resolver: &dyn MessageResolver, locale: &str, args: &[&str]) -> String {
        if let Some(own) = resolver.lookup(locale, &format!("{}.label", self.key()), args) {
            return own;
        }
        let name = self.name(resolver, locale);
        let mut full = vec![name.as_str()];
        full.extend_from_slice(args);
        resolver
            .lookup(locale, "indicator.label", &full)
            .unwrap_or(name)
    }
}

impl<T> AnnualIndicator for Box<T>
where
    T: AnnualIndicator + ?Sized,
{
    fn key(&self) -> &str {
        (**self).key()
    }

    fn values_per_year(&self, org: OrgId, window: YearWindow) -> Result<Computation> {
        (**self).values_per_year(org, window)
    }

    fn reducer(&self) -> Reducer {
        (**self).reducer()
    }

    fn merged_value(&self, org: OrgId, window: YearWindow) -> Result<f64> {
        (**self).merged_value(org, window)
    }

    fn name(&self, resolver: &dyn MessageResolver, locale: &str) -> String {
        (**self).name(resolver, locale)
    }

    fn label(&self, resolver: &dyn MessageResolver, locale: &str, args: &[&str]) -> String {
        (**self).label(resolver, locale, args)
    }
}
