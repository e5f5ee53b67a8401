use std::{borrow::Cow, sync::Arc};

use annual::{in_window, tally_years, ParaSettings, Reducer, Year, YearSeries, YearWindow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{IndicatorError, Result},
    indicators::{AnnualIndicator, Computation, ComputationDetails},
    source::PublicationSource,
    structs::{OrgId, Publication, PublicationType, RankingSystem},
};

/// Which publications an indicator counts at all.
#[derive(Debug, Clone, PartialEq)]
pub enum Category {
    Types(Cow<'static, [PublicationType]>),
    RankedJournal(RankingSystem),
    UnrankedJournal,
    Any,
}

impl Category {
    pub const CONFERENCE_PAPERS: Self =
        Self::Types(Cow::Borrowed(&PublicationType::CONFERENCE_PAPERS));
    pub const JOURNAL_PAPERS: Self = Self::Types(Cow::Borrowed(&PublicationType::JOURNAL_PAPERS));

    pub fn accepts(&self, p: &Publication) -> bool {
        match self {
            Self::Types(kinds) => kinds.contains(&p.kind),
            Self::RankedJournal(system) => {
                p.kind.is_journal_paper() && p.quartile(*system).is_ranked()
            }
            Self::UnrankedJournal => p.kind.is_journal_paper() && !p.is_ranked(),
            Self::Any => true,
        }
    }

    fn fetch(
        &self,
        source: &dyn PublicationSource,
        org: OrgId,
        include_sub: bool,
    ) -> Result<Vec<Publication>> {
        match self {
            Self::Types(kinds) if kinds.iter().all(PublicationType::is_conference_paper) => {
                source.conference_papers_by_organization(org, include_sub)
            }
            Self::RankedJournal(_) | Self::UnrankedJournal => {
                source.journal_papers_by_organization(org, include_sub, true)
            }
            _ => source.publications_by_organization(org, include_sub),
        }
    }
}

/// Config side of [`Category`], ranking systems stay strings until resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CategorySpec {
    Types { types: Vec<PublicationType> },
    RankedJournal { ranking: String },
    UnrankedJournal,
    Any,
}

impl CategorySpec {
    pub fn resolve(&self) -> Result<Category> {
        Ok(match self {
            Self::Types { types } => Category::Types(Cow::Owned(types.clone())),
            Self::RankedJournal { ranking } => Category::RankedJournal(ranking.parse()?),
            Self::UnrankedJournal => Category::UnrankedJournal,
            Self::Any => Category::Any,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorRole {
    PhdStudent,
    Postdoc,
    Engineer,
}

impl AuthorRole {
    pub fn accepts(&self, p: &Publication) -> bool {
        match self {
            Self::PhdStudent => p.has_phd_student_author,
            Self::Postdoc => p.has_postdoc_author,
            Self::Engineer => p.has_engineer_author,
        }
    }
}

/// Counts an organization's publications per year.
///
/// Every publication of the organization is fetched, then windowed on its
/// year, matched against the category and the optional author role, and
/// tallied by year. Years without a match are absent from the series.
pub struct CountIndicator {
    key: String,
    source: Arc<dyn PublicationSource>,
    category: Category,
    author_role: Option<AuthorRole>,
    include_sub_organizations: bool,
    para: ParaSettings,
    reducer: Reducer,
}

pub struct CountIndicatorBuilder {
    key: String,
    source: Arc<dyn PublicationSource>,
    category: Option<Category>,
    author_role: Option<AuthorRole>,
    include_sub_organizations: bool,
    para: ParaSettings,
    reducer: Reducer,
}

impl CountIndicatorBuilder {
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn author_role(mut self, role: Option<AuthorRole>) -> Self {
        self.author_role = role;
        self
    }

    pub fn include_sub_organizations(mut self, include: bool) -> Self {
        self.include_sub_organizations = include;
        self
    }

    pub fn para(mut self, para: ParaSettings) -> Self {
        self.para = para;
        self
    }

    pub fn reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn build(self) -> Result<CountIndicator> {
        let category = self
            .category
            .ok_or_else(|| IndicatorError::MissingCategory(self.key.clone()))?;
        Ok(CountIndicator {
            key: self.key,
            source: self.source,
            category,
            author_role: self.author_role,
            include_sub_organizations: self.include_sub_organizations,
            para: self.para,
            reducer: self.reducer,
        })
    }
}

impl CountIndicator {
    pub fn builder(key: &str, source: Arc<dyn PublicationSource>) -> CountIndicatorBuilder {
        CountIndicatorBuilder {
            key: key.to_owned(),
            source,
            category: None,
            author_role: None,
            include_sub_organizations: false,
            para: ParaSettings::default(),
            reducer: Reducer::Sum,
        }
    }

    pub fn count_per_year(&self, org: OrgId, window: YearWindow) -> Result<YearSeries<u32>> {
        let candidates = self
            .category
            .fetch(self.source.as_ref(), org, self.include_sub_organizations)?;
        let years: Vec<Year> = in_window(&candidates, window, |p| p.publication_year)
            .filter(|p| self.category.accepts(p))
            .filter(|p| self.author_role.map_or(true, |r| r.accepts(p)))
            .filter_map(|p| p.publication_year)
            .collect();
        debug!(
            key = %self.key,
            org,
            candidates = candidates.len(),
            matched = years.len(),
            "counted publications"
        );
        Ok(tally_years(years, &self.para)?)
    }
}

impl AnnualIndicator for CountIndicator {
    fn key(&self) -> &str {
        &self.key
    }

    fn values_per_year(&self, org: OrgId, window: YearWindow) -> Result<Computation> {
        let series = self.count_per_year(org, window)?.to_f64();
        Ok(Computation {
            details: ComputationDetails::single("count", series.clone()),
            series,
        })
    }

    fn reducer(&self) -> Reducer {
        self.reducer
    }
}
