use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::YearSeries;

/// Collapses a series into one number, absent years never contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    #[default]
    Sum,
    #[serde(alias = "avg", alias = "mean")]
    Average,
    Min,
    Max,
}

impl Reducer {
    pub fn apply<V>(&self, series: &YearSeries<V>) -> f64
    where
        V: Copy + Into<f64>,
    {
        let vals = series.values().map(|v| (*v).into());
        match self {
            Self::Sum => vals.sum(),
            Self::Average => {
                if series.is_empty() {
                    return 0.0;
                }
                vals.sum::<f64>() / series.len() as f64
            }
            Self::Min => vals.reduce(f64::min).unwrap_or(0.0),
            Self::Max => vals.reduce(f64::max).unwrap_or(0.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Average => "average",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Reducer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "average" | "avg" | "mean" => Ok(Self::Average),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(format!("unknown reducer: {other}")),
        }
    }
}
