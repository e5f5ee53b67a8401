use std::{borrow::Cow, sync::Arc};

use annual::{ParaSettings, Reducer};
use serde::{Deserialize, Serialize};

use crate::{
    error::{IndicatorError, Result},
    indicators::{
        AnnualIndicator, AuthorRole, Category, CategorySpec, CountIndicator, FteIndicator, FteMode,
        RatioIndicator, StatusSelector,
    },
    source::{MembershipSource, PublicationSource, Store},
    structs::{PublicationType, RankingSystem},
};

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesDefinition {
    Count {
        category: Category,
        author_role: Option<AuthorRole>,
    },
    Staff {
        selector: StatusSelector,
        mode: FteMode,
    },
}

/// Wiring of one indicator: a series, or a series over another one.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorDefinition {
    pub key: Cow<'static, str>,
    pub numerator: SeriesDefinition,
    pub denominator: Option<SeriesDefinition>,
    pub reducer: Option<Reducer>,
}

#[derive(Clone)]
pub struct Collaborators {
    pub publications: Arc<dyn PublicationSource>,
    pub memberships: Arc<dyn MembershipSource>,
    pub include_sub_organizations: bool,
    pub para: ParaSettings,
}

impl Collaborators {
    pub fn from_store(
        store: Arc<Store>,
        include_sub_organizations: bool,
        para: ParaSettings,
    ) -> Self {
        Self {
            publications: store.clone(),
            memberships: store,
            include_sub_organizations,
            para,
        }
    }
}

impl SeriesDefinition {
    fn build(
        &self,
        key: &str,
        collab: &Collaborators,
        reducer: Option<Reducer>,
    ) -> Result<Box<dyn AnnualIndicator>> {
        Ok(match self {
            Self::Count {
                category,
                author_role,
            } => {
                let mut builder = CountIndicator::builder(key, collab.publications.clone())
                    .category(category.clone())
                    .author_role(*author_role)
                    .include_sub_organizations(collab.include_sub_organizations)
                    .para(collab.para);
                if let Some(r) = reducer {
                    builder = builder.reducer(r);
                }
                Box::new(builder.build()?)
            }
            Self::Staff { selector, mode } => {
                let mut ind =
                    FteIndicator::new(key, collab.memberships.clone(), selector.clone(), *mode)
                        .include_sub_organizations(collab.include_sub_organizations);
                if let Some(r) = reducer {
                    ind = ind.with_reducer(r);
                }
                Box::new(ind)
            }
        })
    }
}

impl IndicatorDefinition {
    pub fn is_ratio(&self) -> bool {
        self.denominator.is_some()
    }

    pub fn build(&self, collab: &Collaborators) -> Result<Box<dyn AnnualIndicator>> {
        let den_def = match &self.denominator {
            None => return self.numerator.build(&self.key, collab, self.reducer),
            Some(d) => d,
        };
        let num = self
            .numerator
            .build(&format!("{}.numerator", self.key), collab, None)?;
        let den = den_def.build(&format!("{}.denominator", self.key), collab, None)?;
        let mut ratio = RatioIndicator::new(&self.key, num, den).with_para(collab.para);
        if let Some(r) = self.reducer {
            ratio = ratio.with_reducer(r);
        }
        Ok(Box::new(ratio))
    }
}

const CONFERENCES: SeriesDefinition = SeriesDefinition::Count {
    category: Category::CONFERENCE_PAPERS,
    author_role: None,
};
const RANKED_SCIMAGO: SeriesDefinition = SeriesDefinition::Count {
    category: Category::RankedJournal(RankingSystem::Scimago),
    author_role: None,
};
const RANKED_WOS: SeriesDefinition = SeriesDefinition::Count {
    category: Category::RankedJournal(RankingSystem::WebOfScience),
    author_role: None,
};
const PERMANENT_FTE: SeriesDefinition = SeriesDefinition::Staff {
    selector: StatusSelector::PermanentResearchers,
    mode: FteMode::Fte,
};
const POSTDOC_FTE: SeriesDefinition = SeriesDefinition::Staff {
    selector: StatusSelector::Postdocs,
    mode: FteMode::Fte,
};
const PHD_HEADCOUNT: SeriesDefinition = SeriesDefinition::Staff {
    selector: StatusSelector::PhdStudents,
    mode: FteMode::Headcount,
};

const UNRANKED: SeriesDefinition = SeriesDefinition::Count {
    category: Category::UnrankedJournal,
    author_role: None,
};

const fn only(
    kinds: &'static [PublicationType],
    author_role: Option<AuthorRole>,
) -> SeriesDefinition {
    SeriesDefinition::Count {
        category: Category::Types(Cow::Borrowed(kinds)),
        author_role,
    }
}

macro_rules! catalog {
    ($($kind:ident => $key:literal, $num:expr, $den:expr, $reducer:expr;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum IndicatorKind {
            $($kind,)*
        }

        impl IndicatorKind {
            pub const ALL: &'static [IndicatorKind] = &[$(IndicatorKind::$kind,)*];

            pub fn key(&self) -> &'static str {
                match self {
                    $(Self::$kind => $key,)*
                }
            }
        }

        static CATALOG: &[IndicatorDefinition] = &[
            $(
                IndicatorDefinition {
                    key: Cow::Borrowed($key),
                    numerator: $num,
                    denominator: $den,
                    reducer: $reducer,
                },
            )*
        ];
    };
}

catalog!(
    ConferencePapers => "conference_papers", CONFERENCES, None, None;
    InternationalConferencePapers => "international_conference_papers",
        only(&[PublicationType::InternationalConferencePaper], None), None, None;
    NationalConferencePapers => "national_conference_papers",
        only(&[PublicationType::NationalConferencePaper], None), None, None;
    RankedJournalPapersScimago => "ranked_journal_papers_scimago", RANKED_SCIMAGO, None, None;
    RankedJournalPapersWos => "ranked_journal_papers_wos", RANKED_WOS, None, None;
    UnrankedJournalPapers => "unranked_journal_papers", UNRANKED, None, None;
    PhdConferencePapers => "phd_conference_papers",
        only(&PublicationType::CONFERENCE_PAPERS, Some(AuthorRole::PhdStudent)), None, None;
    PostdocConferencePapers => "postdoc_conference_papers",
        only(&PublicationType::CONFERENCE_PAPERS, Some(AuthorRole::Postdoc)), None, None;
    PhdJournalPapers => "phd_journal_papers",
        only(&PublicationType::JOURNAL_PAPERS, Some(AuthorRole::PhdStudent)), None, None;
    PostdocJournalPapers => "postdoc_journal_papers",
        only(&PublicationType::JOURNAL_PAPERS, Some(AuthorRole::Postdoc)), None, None;
    PermanentResearcherFte => "permanent_researcher_fte", PERMANENT_FTE, None, None;
    PostdocFte => "postdoc_fte", POSTDOC_FTE, None, None;
    PhdStudentHeadcount => "phd_student_headcount", PHD_HEADCOUNT, None, None;
    RankedJournalPapersScimagoPerPermanentFte => "ranked_journal_papers_scimago_per_permanent_fte",
        RANKED_SCIMAGO, Some(PERMANENT_FTE), None;
    RankedJournalPapersWosPerPermanentFte => "ranked_journal_papers_wos_per_permanent_fte",
        RANKED_WOS, Some(PERMANENT_FTE), None;
    ConferencePapersPerPermanentFte => "conference_papers_per_permanent_fte",
        CONFERENCES, Some(PERMANENT_FTE), None;
    ConferencePapersPerPostdocFte => "conference_papers_per_postdoc_fte",
        CONFERENCES, Some(POSTDOC_FTE), None;
    PhdStudentsPerPermanentFte => "phd_students_per_permanent_fte",
        PHD_HEADCOUNT, Some(PERMANENT_FTE), None;
);

impl IndicatorKind {
    pub fn definition(&self) -> &'static IndicatorDefinition {
        &CATALOG[*self as usize]
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.key() == key)
    }
}

/// Config side of [`SeriesDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SeriesSpec {
    Publications {
        #[serde(default)]
        category: Option<CategorySpec>,
        #[serde(default)]
        author_role: Option<AuthorRole>,
    },
    Staff {
        selector: StatusSelector,
        #[serde(default)]
        mode: FteMode,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    pub key: String,
    pub numerator: SeriesSpec,
    #[serde(default)]
    pub denominator: Option<SeriesSpec>,
    #[serde(default)]
    pub reducer: Option<Reducer>,
}

impl SeriesSpec {
    fn resolve(&self, key: &str) -> Result<SeriesDefinition> {
        Ok(match self {
            Self::Publications {
                category,
                author_role,
            } => SeriesDefinition::Count {
                category: category
                    .as_ref()
                    .ok_or_else(|| IndicatorError::MissingCategory(key.to_owned()))?
                    .resolve()?,
                author_role: *author_role,
            },
            Self::Staff { selector, mode } => SeriesDefinition::Staff {
                selector: selector.clone(),
                mode: *mode,
            },
        })
    }
}

impl IndicatorSpec {
    pub fn resolve(&self) -> Result<IndicatorDefinition> {
        Ok(IndicatorDefinition {
            key: Cow::Owned(self.key.clone()),
            numerator: self.numerator.resolve(&self.key)?,
            denominator: self
                .denominator
                .as_ref()
                .map(|d| d.resolve(&self.key))
                .transpose()?,
            reducer: self.reducer,
        })
    }
}

/// Builtin definitions plus the configured ones, a configured key replaces a builtin one.
#[derive(Debug, Clone)]
pub struct Catalog {
    definitions: Vec<IndicatorDefinition>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            definitions: CATALOG.to_vec(),
        }
    }
}

impl Catalog {
    pub fn with_custom(specs: &[IndicatorSpec]) -> Result<Self> {
        let mut catalog = Self::default();
        for spec in specs {
            let def = spec.resolve()?;
            match catalog.definitions.iter_mut().find(|d| d.key == def.key) {
                Some(existing) => *existing = def,
                None => catalog.definitions.push(def),
            }
        }
        Ok(catalog)
    }

    pub fn definitions(&self) -> &[IndicatorDefinition] {
        &self.definitions
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.key.as_ref())
    }

    pub fn get(&self, key: &str) -> Result<&IndicatorDefinition> {
        self.definitions
            .iter()
            .find(|d| d.key == key)
            .ok_or_else(|| IndicatorError::UnknownIndicator(key.to_owned()))
    }

    pub fn build(&self, key: &str, collab: &Collaborators) -> Result<Box<dyn AnnualIndicator>> {
        self.get(key)?.build(collab)
    }

    pub fn build_all(&self, collab: &Collaborators) -> Result<Vec<Box<dyn AnnualIndicator>>> {
        self.definitions.iter().map(|d| d.build(collab)).collect()
    }
}

#[cfg(test)]
mod tests {
    use annual::{YearSeries, YearWindow};

    use super::*;
    use crate::structs::{Organization, Publication};

    #[test]
    fn table_aligned() {
        assert_eq!(IndicatorKind::ALL.len(), CATALOG.len());
        for (i, kind) in IndicatorKind::ALL.iter().enumerate() {
            assert_eq!(*kind as usize, i);
            assert_eq!(IndicatorKind::from_key(kind.key()), Some(*kind));
            assert_eq!(kind.definition().key, kind.key());
        }
        let per_postdoc = IndicatorKind::ConferencePapersPerPostdocFte;
        assert_eq!(per_postdoc.key(), "conference_papers_per_postdoc_fte");
        assert!(per_postdoc.definition().is_ratio());
        assert!(!IndicatorKind::PostdocFte.definition().is_ratio());
    }

    #[test]
    fn builtin_keys_have_names() {
        use crate::labels::{MessageBundle, MessageResolver};
        let bundle = MessageBundle::builtin();
        for kind in IndicatorKind::ALL {
            for locale in ["en", "fr"] {
                let key = format!("{}.name", kind.key());
                assert!(bundle.lookup(locale, &key, &[]).is_some(), "{locale} {key}");
            }
        }
    }

    fn collab() -> Collaborators {
        let mut store = Store::default();
        store.add_organization(Organization {
            id: 1,
            acronym: "L".to_owned(),
            name: "lab".to_owned(),
            parent: None,
        });
        let mut p = Publication::new(1, PublicationType::InternationalConferencePaper, Some(2020));
        p.organizations = vec![1];
        store.add_publication(p);
        Collaborators::from_store(Arc::new(store), false, ParaSettings::default())
    }

    #[test]
    fn builds_everything() {
        let c = collab();
        let all = Catalog::default().build_all(&c).unwrap();
        assert_eq!(all.len(), IndicatorKind::ALL.len());
        let w = YearWindow::single(2020);
        for ind in &all {
            ind.values_per_year(1, w).unwrap();
        }
        let confs = Catalog::default().build("conference_papers", &c).unwrap();
        assert_eq!(
            confs.values_per_year(1, w).unwrap().series,
            YearSeries::from([(2020, 1.0)])
        );
        //no permanent staff at all
        let per_fte = Catalog::default()
            .build("conference_papers_per_permanent_fte", &c)
            .unwrap();
        assert_eq!(
            per_fte.values_per_year(1, w).unwrap().series,
            YearSeries::from([(2020, 0.0)])
        );
        assert_eq!(per_fte.reducer(), Reducer::Average);
    }

    #[test]
    fn custom_specs() {
        let js = r#"[
            {
                "key": "books",
                "numerator": {
                    "source": "publications",
                    "category": {"type": "types", "types": ["BOOK", "BOOK_CHAPTER"]}
                }
            },
            {
                "key": "conference_papers",
                "numerator": {"source": "publications", "category": {"type": "any"}},
                "reducer": "max"
            },
            {
                "key": "wos_per_engineer",
                "numerator": {
                    "source": "publications",
                    "category": {"type": "ranked_journal", "ranking": "wos"}
                },
                "denominator": {
                    "source": "staff",
                    "selector": {"type": "statuses", "statuses": ["ENGINEER", "RESEARCH_ENGINEER"]},
                    "mode": "headcount"
                }
            }
        ]"#;
        let specs: Vec<IndicatorSpec> = serde_json::from_str(js).unwrap();
        let catalog = Catalog::with_custom(&specs).unwrap();
        assert_eq!(catalog.definitions().len(), IndicatorKind::ALL.len() + 2);
        assert_eq!(
            catalog.get("conference_papers").unwrap().reducer,
            Some(Reducer::Max)
        );
        assert!(catalog.get("wos_per_engineer").unwrap().is_ratio());
        assert!(matches!(
            catalog.get("nope"),
            Err(IndicatorError::UnknownIndicator(_))
        ));
    }

    #[test]
    fn bad_specs_fail_early() {
        let bad_ranking: IndicatorSpec = serde_json::from_str(
            r#"{
                "key": "k",
                "numerator": {
                    "source": "publications",
                    "category": {"type": "ranked_journal", "ranking": "core"}
                }
            }"#,
        )
        .unwrap();
        assert!(matches!(
            Catalog::with_custom(&[bad_ranking]),
            Err(IndicatorError::UnsupportedRankingSystem(r)) if r == "core"
        ));

        let no_category: IndicatorSpec =
            serde_json::from_str(r#"{"key": "k2", "numerator": {"source": "publications"}}"#)
                .unwrap();
        assert!(matches!(
            Catalog::with_custom(&[no_category]),
            Err(IndicatorError::MissingCategory(k)) if k == "k2"
        ));
    }
}
