use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use annual::ParaSettings;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::Result,
    indicators::{Catalog, Collaborators, IndicatorSpec},
    labels::{MessageBundle, DEFAULT_LOCALE},
    source::Store,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_locale: String,
    pub include_sub_organizations: bool,
    pub parallel: ParaSettings,
    pub labels: Option<PathBuf>,
    pub custom_indicators: Vec<IndicatorSpec>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_locale: DEFAULT_LOCALE.to_owned(),
            include_sub_organizations: false,
            parallel: ParaSettings::default(),
            labels: None,
            custom_indicators: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// A missing file is the default config, a malformed one is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let mut de = serde_json::Deserializer::from_reader(BufReader::new(File::open(path)?));
        Ok(serde_path_to_error::deserialize(&mut de)?)
    }

    pub fn catalog(&self) -> Result<Catalog> {
        Catalog::with_custom(&self.custom_indicators)
    }

    pub fn messages(&self) -> Result<MessageBundle> {
        match &self.labels {
            Some(path) => MessageBundle::from_path(path, &self.default_locale),
            None => {
                let mut bundle = MessageBundle::builtin();
                bundle.set_default_locale(&self.default_locale);
                Ok(bundle)
            }
        }
    }

    pub fn collaborators(&self, store: Arc<Store>) -> Collaborators {
        Collaborators::from_store(store, self.include_sub_organizations, self.parallel)
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Write};

    use super::*;
    use crate::{error::IndicatorError, labels::MessageResolver};

    fn tmp_dir(name: &str) -> PathBuf {
        let id = std::process::id();
        let dir = std::env::temp_dir().join(format!("lab-indicators-config-{name}-{id}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_file_defaults() {
        let conf = EngineConfig::load(tmp_dir("missing").join("nope.json")).unwrap();
        assert_eq!(conf, EngineConfig::default());
        assert_eq!(conf.catalog().unwrap().definitions().len(), 18);
    }

    #[test]
    fn partial_file() {
        let path = tmp_dir("partial").join("conf.json");
        let json = br#"{"default_locale": "fr", "parallel": {"threshold": 10}}"#;
        let mut f = File::create(&path).unwrap();
        f.write_all(json).unwrap();
        let conf = EngineConfig::load(&path).unwrap();
        assert_eq!(conf.default_locale, "fr");
        assert_eq!(conf.parallel.threshold, 10);
        assert_eq!(conf.parallel.threads, None);
        assert!(!conf.include_sub_organizations);
        let bundle = conf.messages().unwrap();
        assert_eq!(
            bundle.message("de", "postdoc_fte.name", &[]),
            "Post-doctorants (ETP)"
        );
    }

    #[test]
    fn error_path_reported() {
        let path = tmp_dir("bad").join("conf.json");
        fs::write(
            &path,
            r#"{
                "custom_indicators": [
                    {"key": "k", "numerator": {"source": "staff", "selector": {"type": "everyone"}}}
                ]
            }"#,
        )
        .unwrap();
        match EngineConfig::load(&path) {
            Err(IndicatorError::Json(e)) => {
                assert!(e.path().to_string().starts_with("custom_indicators"))
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn bad_ranking_fails_at_catalog() {
        let conf: EngineConfig = serde_json::from_str(
            r#"{
                "custom_indicators": [{
                    "key": "k",
                    "numerator": {
                        "source": "publications",
                        "category": {"type": "ranked_journal", "ranking": "core"}
                    }
                }]
            }"#,
        )
        .unwrap();
        assert!(conf.catalog().unwrap_err().is_configuration());
    }
}
