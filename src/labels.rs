use std::{fs::File, io::BufReader, path::Path};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_LOCALE: &str = "en";

/// Resolves human readable texts, never touches numbers.
pub trait MessageResolver: Send + Sync {
    fn lookup(&self, locale: &str, key: &str, args: &[&str]) -> Option<String>;

    fn message(&self, locale: &str, key: &str, args: &[&str]) -> String {
        self.lookup(locale, key, args)
            .unwrap_or_else(|| key.to_owned())
    }
}

type Templates = HashMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBundle {
    default_locale: String,
    locales: HashMap<String, Templates>,
}

const BUILTIN: &[(&str, &str, &str)] = &[
    ("en", "indicator.label", "{0} ({1}-{2})"),
    ("fr", "indicator.label", "{0} ({1}-{2})"),
    ("en", "conference_papers.name", "Conference papers"),
    ("fr", "conference_papers.name", "Articles de conférence"),
    (
        "en",
        "international_conference_papers.name",
        "International conference papers",
    ),
    (
        "fr",
        "international_conference_papers.name",
        "Articles de conférence internationale",
    ),
    (
        "en",
        "national_conference_papers.name",
        "National conference papers",
    ),
    (
        "fr",
        "national_conference_papers.name",
        "Articles de conférence nationale",
    ),
    (
        "en",
        "ranked_journal_papers_scimago.name",
        "Ranked journal papers (SCImago)",
    ),
    (
        "fr",
        "ranked_journal_papers_scimago.name",
        "Articles de revue classée (SCImago)",
    ),
    (
        "en",
        "ranked_journal_papers_wos.name",
        "Ranked journal papers (WoS)",
    ),
    (
        "fr",
        "ranked_journal_papers_wos.name",
        "Articles de revue classée (WoS)",
    ),
    (
        "en",
        "unranked_journal_papers.name",
        "Unranked journal papers",
    ),
    (
        "fr",
        "unranked_journal_papers.name",
        "Articles de revue non classée",
    ),
    (
        "en",
        "phd_conference_papers.name",
        "Conference papers with a PhD student author",
    ),
    (
        "fr",
        "phd_conference_papers.name",
        "Articles de conférence avec un doctorant",
    ),
    (
        "en",
        "postdoc_conference_papers.name",
        "Conference papers with a postdoc author",
    ),
    (
        "fr",
        "postdoc_conference_papers.name",
        "Articles de conférence avec un post-doctorant",
    ),
    (
        "en",
        "phd_journal_papers.name",
        "Journal papers with a PhD student author",
    ),
    (
        "fr",
        "phd_journal_papers.name",
        "Articles de revue avec un doctorant",
    ),
    (
        "en",
        "postdoc_journal_papers.name",
        "Journal papers with a postdoc author",
    ),
    (
        "fr",
        "postdoc_journal_papers.name",
        "Articles de revue avec un post-doctorant",
    ),
    (
        "en",
        "permanent_researcher_fte.name",
        "Permanent researchers (FTE)",
    ),
    (
        "fr",
        "permanent_researcher_fte.name",
        "Chercheurs permanents (ETP)",
    ),
    ("en", "postdoc_fte.name", "Postdocs (FTE)"),
    ("fr", "postdoc_fte.name", "Post-doctorants (ETP)"),
    ("en", "phd_student_headcount.name", "PhD students"),
    ("fr", "phd_student_headcount.name", "Doctorants"),
    (
        "en",
        "ranked_journal_papers_scimago_per_permanent_fte.name",
        "Ranked journal papers (SCImago) per permanent researcher FTE",
    ),
    (
        "fr",
        "ranked_journal_papers_scimago_per_permanent_fte.name",
        "Articles de revue classée (SCImago) par ETP de chercheur permanent",
    ),
    (
        "en",
        "ranked_journal_papers_wos_per_permanent_fte.name",
        "Ranked journal papers (WoS) per permanent researcher FTE",
    ),
    (
        "fr",
        "ranked_journal_papers_wos_per_permanent_fte.name",
        "Articles de revue classée (WoS) par ETP de chercheur permanent",
    ),
    (
        "en",
        "conference_papers_per_permanent_fte.name",
        "Conference papers per permanent researcher FTE",
    ),
    (
        "fr",
        "conference_papers_per_permanent_fte.name",
        "Articles de conférence par ETP de chercheur permanent",
    ),
    (
        "en",
        "conference_papers_per_postdoc_fte.name",
        "Conference papers per postdoc FTE",
    ),
    (
        "fr",
        "conference_papers_per_postdoc_fte.name",
        "Articles de conférence par ETP de post-doctorant",
    ),
    (
        "en",
        "phd_students_per_permanent_fte.name",
        "PhD students per permanent researcher FTE",
    ),
    (
        "fr",
        "phd_students_per_permanent_fte.name",
        "Doctorants par ETP de chercheur permanent",
    ),
];

impl Default for MessageBundle {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MessageBundle {
    pub fn empty(default_locale: &str) -> Self {
        Self {
            default_locale: default_locale.to_owned(),
            locales: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut bundle = Self::empty(DEFAULT_LOCALE);
        for (locale, key, template) in BUILTIN {
            bundle.insert(locale, key, template);
        }
        bundle
    }

    /// Reads `{locale: {key: template}}` json, entries override the builtin ones.
    pub fn from_path<P: AsRef<Path>>(path: P, default_locale: &str) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut de = serde_json::Deserializer::from_reader(reader);
        let locales: HashMap<String, Templates> = serde_path_to_error::deserialize(&mut de)?;
        let mut bundle = Self::builtin();
        bundle.default_locale = default_locale.to_owned();
        for (locale, templates) in locales {
            bundle.locales.entry(locale).or_default().extend(templates);
        }
        Ok(bundle)
    }

    pub fn insert(&mut self, locale: &str, key: &str, template: &str) {
        self.locales
            .entry(locale.to_owned())
            .or_default()
            .insert(key.to_owned(), template.to_owned());
    }

    pub fn set_default_locale(&mut self, locale: &str) {
        self.default_locale = locale.to_owned();
    }

    fn template(&self, locale: &str, key: &str) -> Option<&str> {
        let language = locale.split(['-', '_']).next().unwrap_or(locale);
        [locale, language, self.default_locale.as_str()]
            .into_iter()
            .filter_map(|l| self.locales.get(l))
            .find_map(|templates| templates.get(key))
            .map(String::as_str)
    }
}

impl MessageResolver for MessageBundle {
    fn lookup(&self, locale: &str, key: &str, args: &[&str]) -> Option<String> {
        self.template(locale, key).map(|t| fill(t, args))
    }
}

/// Single pass over the template, so placeholders inside arguments stay literal.
fn fill(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let digits = tail
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(tail.len());
        let arg = if digits > 0 && tail[digits..].starts_with('}') {
            tail[..digits]
                .parse::<usize>()
                .ok()
                .and_then(|i| args.get(i))
        } else {
            None
        };
        match arg {
            Some(arg) => {
                out.push_str(arg);
                rest = &tail[digits + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names() {
        let b = MessageBundle::builtin();
        assert_eq!(
            b.message("fr", "postdoc_fte.name", &[]),
            "Post-doctorants (ETP)"
        );
        assert_eq!(
            b.message("en-GB", "postdoc_fte.name", &[]),
            "Postdocs (FTE)"
        );
    }

    #[test]
    fn fallback_chain() {
        let mut b = MessageBundle::empty("en");
        b.insert("en", "k", "english");
        b.insert("fr", "only.fr", "french");
        assert_eq!(b.message("fr_CA", "only.fr", &[]), "french");
        assert_eq!(b.message("de", "k", &[]), "english");
        assert_eq!(b.message("de", "nothing", &[]), "nothing");
        assert_eq!(b.lookup("de", "nothing", &[]), None);
    }

    #[test]
    fn placeholders() {
        let b = MessageBundle::builtin();
        assert_eq!(
            b.message("en", "indicator.label", &["Books", "2019", "2021"]),
            "Books (2019-2021)"
        );
        assert_eq!(fill("{1}{0}{1}", &["a", "b"]), "bab");
    }

    #[test]
    fn arguments_are_not_rescanned() {
        assert_eq!(fill("{0} then {1}", &["{1}", "b"]), "{1} then b");
        assert_eq!(fill("{0}", &["{0}{0}"]), "{0}{0}");
    }

    #[test]
    fn unmatched_braces_kept() {
        assert_eq!(fill("{2} {x} {", &["a"]), "{2} {x} {");
        assert_eq!(fill("{}{0}", &["a"]), "{}a");
        assert_eq!(fill("é{0}é", &["ü"]), "éüé");
    }
}
