use std::{borrow::Cow, sync::Arc};

use annual::{Reducer, Year, YearSeries, YearWindow};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::Result,
    indicators::{AnnualIndicator, Computation, ComputationDetails},
    source::MembershipSource,
    structs::{MemberStatus, Membership, OrgId},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "statuses", rename_all = "snake_case")]
pub enum StatusSelector {
    Permanent,
    PermanentResearchers,
    Researchers,
    PhdStudents,
    Postdocs,
    Statuses(Cow<'static, [MemberStatus]>),
}

impl StatusSelector {
    pub fn accepts(&self, status: MemberStatus) -> bool {
        match self {
            Self::Permanent => status.is_permanent_position(),
            Self::PermanentResearchers => status.is_permanent_position() && status.is_researcher(),
            Self::Researchers => status.is_researcher(),
            Self::PhdStudents => status == MemberStatus::PhdStudent,
            Self::Postdocs => status == MemberStatus::Postdoc,
            Self::Statuses(set) => set.contains(&status),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FteMode {
    #[default]
    Fte,
    Headcount,
}

impl FteMode {
    fn detail_name(&self) -> &'static str {
        match self {
            Self::Fte => "fte",
            Self::Headcount => "headcount",
        }
    }
}

/// Staff presence per year, usually a ratio denominator.
pub struct FteIndicator {
    key: String,
    source: Arc<dyn MembershipSource>,
    selector: StatusSelector,
    mode: FteMode,
    include_sub_organizations: bool,
    reducer: Reducer,
}

impl FteIndicator {
    pub fn new(
        key: &str,
        source: Arc<dyn MembershipSource>,
        selector: StatusSelector,
        mode: FteMode,
    ) -> Self {
        Self {
            key: key.to_owned(),
            source,
            selector,
            mode,
            include_sub_organizations: false,
            reducer: Reducer::Average,
        }
    }

    pub fn include_sub_organizations(mut self, include: bool) -> Self {
        self.include_sub_organizations = include;
        self
    }

    pub fn with_reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    fn year_value(&self, members: &[&Membership], year: Year) -> f64 {
        match self.mode {
            FteMode::Fte => members.iter().map(|m| m.fte_in(year)).sum(),
            FteMode::Headcount => members
                .iter()
                .filter(|m| m.is_active_in(year))
                .map(|m| m.person_id)
                .collect::<HashSet<_>>()
                .len() as f64,
        }
    }
}

impl AnnualIndicator for FteIndicator {
    fn key(&self) -> &str {
        &self.key
    }

    fn values_per_year(&self, org: OrgId, window: YearWindow) -> Result<Computation> {
        let memberships = self
            .source
            .memberships_by_organization(org, self.include_sub_organizations)?;
        let selected: Vec<&Membership> = memberships
            .iter()
            .filter(|m| self.selector.accepts(m.status))
            .collect();

        let series: YearSeries<f64> = window
            .years()
            .map(|y| (y, self.year_value(&selected, y)))
            .filter(|(_, v)| *v > 0.0)
            .collect();
        debug!(
            key = %self.key,
            org,
            members = selected.len(),
            years = series.len(),
            "computed staff series"
        );
        Ok(Computation {
            details: ComputationDetails::single(self.mode.detail_name(), series.clone()),
            series,
        })
    }

    fn reducer(&self) -> Reducer {
        self.reducer
    }
}
