use std::io::{self, Write};

use annual::{Reducer, Year, YearSeries, YearWindow};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    error::Result,
    indicators::{AnnualIndicator, ComputationDetails},
    labels::MessageResolver,
    structs::OrgId,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub key: String,
    pub name: String,
    pub label: String,
    pub reducer: Reducer,
    pub merged: f64,
    pub series: YearSeries<f64>,
    pub details: ComputationDetails,
}

/// Indicators evaluated over one organization and one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorReport {
    pub organization: OrgId,
    pub window: YearWindow,
    pub locale: String,
    pub entries: Vec<ReportEntry>,
}

#[derive(Serialize)]
struct ReportRow<'a> {
    key: &'a str,
    name: &'a str,
    year: Year,
    value: f64,
    merged: f64,
}

impl IndicatorReport {
    pub fn compute<I>(
        indicators: &[I],
        org: OrgId,
        window: YearWindow,
        resolver: &dyn MessageResolver,
        locale: &str,
    ) -> Result<Self>
    where
        I: AnnualIndicator,
    {
        let start = window.start.to_string();
        let end = window.end.to_string();
        let mut entries = Vec::with_capacity(indicators.len());
        for ind in indicators {
            let computation = ind.values_per_year(org, window)?;
            let reducer = ind.reducer();
            let merged = reducer.apply(&computation.series);
            debug!(key = ind.key(), merged, "report entry");
            entries.push(ReportEntry {
                key: ind.key().to_owned(),
                name: ind.name(resolver, locale),
                label: ind.label(resolver, locale, &[&start, &end]),
                reducer,
                merged,
                series: computation.series,
                details: computation.details,
            });
        }
        Ok(Self {
            organization: org,
            window,
            locale: locale.to_owned(),
            entries,
        })
    }

    pub fn entry(&self, key: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn write_json<W: Write>(&self, w: W) -> Result<()> {
        serde_json::to_writer_pretty(w, self).map_err(io::Error::from)?;
        info!(
            org = self.organization,
            entries = self.entries.len(),
            "json report written"
        );
        Ok(())
    }

    /// One row per indicator and year, indicators without years get no rows.
    pub fn write_csv<W: Write>(&self, w: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(w);
        for entry in &self.entries {
            for (year, value) in &entry.series {
                wtr.serialize(ReportRow {
                    key: &entry.key,
                    name: &entry.name,
                    year: *year,
                    value: *value,
                    merged: entry.merged,
                })?;
            }
        }
        wtr.flush()?;
        info!(
            org = self.organization,
            entries = self.entries.len(),
            "csv report written"
        );
        Ok(())
    }
}
