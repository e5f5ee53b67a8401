use annual::{map_series, ParaSettings, Reducer, YearWindow};
use tracing::debug;

use crate::{
    error::Result,
    indicators::{AnnualIndicator, Computation, ComputationDetails},
    structs::OrgId,
};

/// Numerator over denominator, year by year.
///
/// The years come from the numerator alone. A denominator that is missing or
/// not positive for a year gives 0 for that year.
pub struct RatioIndicator<N = Box<dyn AnnualIndicator>, D = Box<dyn AnnualIndicator>> {
    key: String,
    numerator: N,
    denominator: D,
    reducer: Reducer,
    para: ParaSettings,
}

impl<N, D> RatioIndicator<N, D>
where
    N: AnnualIndicator,
    D: AnnualIndicator,
{
    pub fn new(key: &str, numerator: N, denominator: D) -> Self {
        Self {
            key: key.to_owned(),
            numerator,
            denominator,
            reducer: Reducer::Average,
            para: ParaSettings::default(),
        }
    }

    pub fn with_reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn with_para(mut self, para: ParaSettings) -> Self {
        self.para = para;
        self
    }
}

fn ratio(numerator: f64, denominator: Option<f64>) -> f64 {
    match denominator {
        Some(d) if d > 0.0 => numerator / d,
        _ => 0.0,
    }
}

impl<N, D> AnnualIndicator for RatioIndicator<N, D>
where
    N: AnnualIndicator,
    D: AnnualIndicator,
{
    fn key(&self) -> &str {
        &self.key
    }

    fn values_per_year(&self, org: OrgId, window: YearWindow) -> Result<Computation> {
        let num = self.numerator.values_per_year(org, window)?;
        let den = self.denominator.values_per_year(org, window)?;

        let den_series = &den.series;
        let series = map_series(num.series, &self.para, |year, n| {
            ratio(n, den_series.get(year).copied())
        })?;
        let missing = series
            .years()
            .filter(|y| !den_series.contains_year(*y))
            .count();
        debug!(
            key = %self.key,
            org,
            years = series.len(),
            missing_denominator = missing,
            "computed ratio"
        );

        let mut details = ComputationDetails::single("ratio", series.clone());
        details.nest("numerator", num.details);
        details.nest("denominator", den.details);
        Ok(Computation { series, details })
    }

    fn reducer(&self) -> Reducer {
        self.reducer
    }
}

#[cfg(test)]
mod tests {
    use annual::YearSeries;

    use super::*;
    use crate::indicators::tests::Fixed;

    fn fixed(key: &'static str, series: YearSeries<f64>) -> Fixed {
        Fixed { key, series }
    }

    #[test]
    fn absent_denominator_is_zero() {
        let r = RatioIndicator::new(
            "r",
            fixed("n", YearSeries::from([(2022, 4.0)])),
            fixed("d", YearSeries::new()),
        );
        let c = r.values_per_year(1, YearWindow::single(2022)).unwrap();
        assert_eq!(c.series, YearSeries::from([(2022, 0.0)]));
    }

    #[test]
    fn zero_denominator_is_zero() {
        let r = RatioIndicator::new(
            "r",
            fixed("n", YearSeries::from([(2022, 4.0), (2023, 3.0)])),
            fixed("d", YearSeries::from([(2022, 0.0), (2023, 1.5)])),
        );
        let c = r.values_per_year(1, YearWindow::new(2022, 2023)).unwrap();
        assert_eq!(c.series, YearSeries::from([(2022, 0.0), (2023, 2.0)]));
    }

    #[test]
    fn years_follow_numerator() {
        let r = RatioIndicator::new(
            "r",
            fixed("n", YearSeries::from([(2020, 2.0)])),
            fixed("d", YearSeries::from([(2020, 1.0), (2021, 4.0)])),
        );
        let c = r.values_per_year(1, YearWindow::new(2020, 2021)).unwrap();
        assert!(!c.series.contains_year(2021));
        assert_eq!(c.series.len(), 1);
    }

    #[test]
    fn averaged_merge() {
        let r = RatioIndicator::new(
            "r",
            fixed("n", YearSeries::from([(2021, 4.0), (2022, 1.0)])),
            fixed("d", YearSeries::from([(2021, 2.0)])),
        );
        let w = YearWindow::new(2021, 2022);
        let c = r.values_per_year(1, w).unwrap();
        assert_eq!(c.series, YearSeries::from([(2021, 2.0), (2022, 0.0)]));
        assert_eq!(r.merged_value(1, w).unwrap(), 1.0);
        assert_eq!(
            r.with_reducer(Reducer::Sum).merged_value(1, w).unwrap(),
            2.0
        );
    }

    #[test]
    fn details_nested() {
        let r = RatioIndicator::new(
            "r",
            fixed("n", YearSeries::from([(2021, 4.0)])),
            fixed("d", YearSeries::from([(2021, 2.0)])),
        );
        let c = r.values_per_year(1, YearWindow::single(2021)).unwrap();
        let names: Vec<&str> = c.details.names().collect();
        assert_eq!(names, vec!["denominator.fixed", "numerator.fixed", "ratio"]);
    }

    #[test]
    fn parallel_years() {
        let years = (1900..2100_u16).map(|y| (y, f64::from(y)));
        let r = RatioIndicator::new(
            "r",
            fixed("n", years.clone().collect()),
            fixed("d", years.filter(|(y, _)| y % 2 == 0).collect()),
        )
        .with_para(ParaSettings {
            threshold: 0,
            threads: Some(3),
        });
        let c = r.values_per_year(1, YearWindow::new(1900, 2099)).unwrap();
        assert_eq!(c.series.len(), 200);
        assert_eq!(c.series.get(1950), Some(&1.0));
        assert_eq!(c.series.get(1951), Some(&0.0));
    }

    #[test]
    fn nested_ratio_boxed() {
        let inner: Box<dyn AnnualIndicator> = Box::new(RatioIndicator::new(
            "inner",
            fixed("n", YearSeries::from([(2020, 8.0)])),
            fixed("d", YearSeries::from([(2020, 2.0)])),
        ));
        let outer: RatioIndicator = RatioIndicator::new(
            "outer",
            inner,
            Box::new(fixed("d2", YearSeries::from([(2020, 2.0)]))) as Box<dyn AnnualIndicator>,
        );
        let c = outer.values_per_year(1, YearWindow::single(2020)).unwrap();
        assert_eq!(c.series.get(2020), Some(&2.0));
        assert!(c.details.get("numerator.numerator.fixed").is_some());
    }
}
