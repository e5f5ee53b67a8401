use std::{fmt, str::FromStr};

use annual::Year;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;

pub type OrgId = u32;
pub type PersonId = u32;
pub type PublicationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationType {
    InternationalConferencePaper,
    NationalConferencePaper,
    InternationalJournalPaper,
    NationalJournalPaper,
    Book,
    BookChapter,
    Thesis,
    Patent,
    Other,
}

impl PublicationType {
    pub const CONFERENCE_PAPERS: [Self; 2] = [
        Self::InternationalConferencePaper,
        Self::NationalConferencePaper,
    ];
    pub const JOURNAL_PAPERS: [Self; 2] =
        [Self::InternationalJournalPaper, Self::NationalJournalPaper];

    pub fn is_conference_paper(&self) -> bool {
        Self::CONFERENCE_PAPERS.contains(self)
    }

    pub fn is_journal_paper(&self) -> bool {
        Self::JOURNAL_PAPERS.contains(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quartile {
    Q1,
    Q2,
    Q3,
    Q4,
    #[default]
    NotRanked,
}

impl Quartile {
    pub fn is_ranked(&self) -> bool {
        *self != Self::NotRanked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingSystem {
    Scimago,
    #[serde(rename = "wos")]
    WebOfScience,
}

impl RankingSystem {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scimago => "scimago",
            Self::WebOfScience => "wos",
        }
    }
}

impl fmt::Display for RankingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RankingSystem {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scimago" => Ok(Self::Scimago),
            "wos" | "webofscience" | "web_of_science" => Ok(Self::WebOfScience),
            _ => Err(IndicatorError::UnsupportedRankingSystem(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub id: PublicationId,
    pub title: String,
    pub publication_year: Option<Year>,
    pub kind: PublicationType,
    pub scimago_q_index: Quartile,
    pub wos_q_index: Quartile,
    pub has_phd_student_author: bool,
    pub has_postdoc_author: bool,
    pub has_engineer_author: bool,
    pub organizations: Vec<OrgId>,
}

impl Publication {
    pub fn new(id: PublicationId, kind: PublicationType, publication_year: Option<Year>) -> Self {
        Self {
            id,
            title: String::new(),
            publication_year,
            kind,
            scimago_q_index: Quartile::NotRanked,
            wos_q_index: Quartile::NotRanked,
            has_phd_student_author: false,
            has_postdoc_author: false,
            has_engineer_author: false,
            organizations: Vec::new(),
        }
    }

    pub fn quartile(&self, system: RankingSystem) -> Quartile {
        match system {
            RankingSystem::Scimago => self.scimago_q_index,
            RankingSystem::WebOfScience => self.wos_q_index,
        }
    }

    pub fn is_ranked(&self) -> bool {
        self.scimago_q_index.is_ranked() || self.wos_q_index.is_ranked()
    }

    pub fn strip_ranking(&mut self) {
        self.scimago_q_index = Quartile::NotRanked;
        self.wos_q_index = Quartile::NotRanked;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub acronym: String,
    pub name: String,
    pub parent: Option<OrgId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    FullProfessor,
    AssociateProfessor,
    Researcher,
    PhdStudent,
    Postdoc,
    ResearchEngineer,
    Engineer,
    AdministrativeStaff,
    MasterStudent,
    Other,
}

#[derive(Debug, PartialEq, Eq)]
pub struct StatusAttributes {
    pub status: MemberStatus,
    pub permanent_position: bool,
    pub researcher: bool,
}

macro_rules! status_table {
    ($($status:ident => $perm:literal, $res:literal),*,) => {
        const STATUS_TABLE: &[StatusAttributes] = &[
            $(
                StatusAttributes {
                    status: MemberStatus::$status,
                    permanent_position: $perm,
                    researcher: $res,
                },
            )*
        ];
    };
}

status_table!(
    FullProfessor => true, true,
    AssociateProfessor => true, true,
    Researcher => true, true,
    PhdStudent => false, true,
    Postdoc => false, true,
    ResearchEngineer => true, false,
    Engineer => false, false,
    AdministrativeStaff => true, false,
    MasterStudent => false, false,
    Other => false, false,
);

impl MemberStatus {
    pub fn attributes(&self) -> &'static StatusAttributes {
        &STATUS_TABLE[*self as usize]
    }

    pub fn is_permanent_position(&self) -> bool {
        self.attributes().permanent_position
    }

    pub fn is_researcher(&self) -> bool {
        self.attributes().researcher
    }

    pub fn all() -> impl Iterator<Item = Self> {
        STATUS_TABLE.iter().map(|a| a.status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub person_id: PersonId,
    pub organization_id: OrgId,
    pub since: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: MemberStatus,
    pub fte_ratio: f64,
}

impl Membership {
    /// Days of `year` inside the membership period, open bounds never cut.
    pub fn covered_days(&self, year: Year) -> i64 {
        let (first, last) = match year_bounds(year) {
            Some(b) => b,
            None => return 0,
        };
        let start = self.since.map_or(first, |s| s.max(first));
        let end = self.to.map_or(last, |t| t.min(last));
        if end < start {
            return 0;
        }
        (end - start).num_days() + 1
    }

    pub fn is_active_in(&self, year: Year) -> bool {
        self.covered_days(year) > 0
    }

    pub fn fte_in(&self, year: Year) -> f64 {
        let days = self.covered_days(year);
        if days == 0 {
            return 0.0;
        }
        self.fte_ratio * days as f64 / days_in_year(year) as f64
    }
}

fn year_bounds(year: Year) -> Option<(NaiveDate, NaiveDate)> {
    let y = i32::from(year);
    Some((
        NaiveDate::from_ymd_opt(y, 1, 1)?,
        NaiveDate::from_ymd_opt(y, 12, 31)?,
    ))
}

pub fn days_in_year(year: Year) -> i64 {
    match year_bounds(year) {
        Some((_, last)) => i64::from(last.ordinal()),
        None => 365,
    }
}
