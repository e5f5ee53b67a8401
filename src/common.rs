use std::{
    fs::{self, create_dir_all, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use annual::Year;
use chrono::NaiveDate;
use csv::{Reader, ReaderBuilder, Writer};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tqdm::Iter;
use tracing::{info, warn};

use crate::{
    error::Result,
    source::Store,
    structs::{
        MemberStatus, Membership, OrgId, Organization, PersonId, Publication, PublicationId,
        PublicationType, Quartile,
    },
};

pub type StowReader = Reader<BufReader<GzDecoder<File>>>;
type GzWriter = Writer<GzEncoder<BufWriter<File>>>;

pub const PUBLICATIONS: &str = "publications";
pub const MEMBERSHIPS: &str = "memberships";
pub const ORGANIZATIONS: &str = "organizations";

const ENTITIES: [&str; 3] = [ORGANIZATIONS, PUBLICATIONS, MEMBERSHIPS];
const STORE_CACHE: &str = "store.bin";
const CONFIG: &str = "config.json";
const MULTI_SEP: char = ';';

macro_rules! pathfields_fn {
    ($($k:ident => $v:literal),*,) => {

        pub fn new<P: AsRef<Path>>(root_path: P) -> Result<Self> {
            let root = root_path.as_ref().to_path_buf();
            $(
                let $k = root.join($v);
                create_dir_all(&$k)?;
            )*

            Ok(Self {
                root,
                $(
                    $k,
                )*
            })
        }
    };
}

/// Root directory of the file backed store.
pub struct Stowage {
    pub root: PathBuf,
    pub entity_csvs: PathBuf,
    pub cache: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct PublicationRow {
    id: PublicationId,
    #[serde(default)]
    title: String,
    year: Option<String>,
    kind: PublicationType,
    scimago_q_index: Option<Quartile>,
    wos_q_index: Option<Quartile>,
    #[serde(default)]
    phd_student_author: bool,
    #[serde(default)]
    postdoc_author: bool,
    #[serde(default)]
    engineer_author: bool,
    organizations: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct MembershipRow {
    person_id: PersonId,
    organization_id: OrgId,
    since: Option<NaiveDate>,
    to: Option<NaiveDate>,
    status: MemberStatus,
    fte_ratio: Option<f64>,
}

impl PublicationRow {
    fn into_publication(self) -> Publication {
        let publication_year = self.year.as_deref().map(str::trim).and_then(|y| {
            if y.is_empty() {
                return None;
            }
            let parsed = y.parse::<Year>().ok();
            if parsed.is_none() {
                warn!(
                    id = self.id,
                    year = y,
                    "unparsable publication year, treated as missing"
                );
            }
            parsed
        });
        let organizations = self
            .organizations
            .split(MULTI_SEP)
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|o| match o.parse::<OrgId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(id = self.id, org = o, "unparsable organization id");
                    None
                }
            })
            .collect();
        Publication {
            id: self.id,
            title: self.title,
            publication_year,
            kind: self.kind,
            scimago_q_index: self.scimago_q_index.unwrap_or_default(),
            wos_q_index: self.wos_q_index.unwrap_or_default(),
            has_phd_student_author: self.phd_student_author,
            has_postdoc_author: self.postdoc_author,
            has_engineer_author: self.engineer_author,
            organizations,
        }
    }
}

impl From<&Publication> for PublicationRow {
    fn from(p: &Publication) -> Self {
        Self {
            id: p.id,
            title: p.title.clone(),
            year: p.publication_year.map(|y| y.to_string()),
            kind: p.kind,
            scimago_q_index: Some(p.scimago_q_index),
            wos_q_index: Some(p.wos_q_index),
            phd_student_author: p.has_phd_student_author,
            postdoc_author: p.has_postdoc_author,
            engineer_author: p.has_engineer_author,
            organizations: p
                .organizations
                .iter()
                .map(OrgId::to_string)
                .collect::<Vec<_>>()
                .join(&MULTI_SEP.to_string()),
        }
    }
}

impl From<MembershipRow> for Membership {
    fn from(row: MembershipRow) -> Self {
        Self {
            person_id: row.person_id,
            organization_id: row.organization_id,
            since: row.since,
            to: row.to,
            status: row.status,
            fte_ratio: row.fte_ratio.unwrap_or(1.0),
        }
    }
}

impl From<&Membership> for MembershipRow {
    fn from(m: &Membership) -> Self {
        Self {
            person_id: m.person_id,
            organization_id: m.organization_id,
            since: m.since,
            to: m.to,
            status: m.status,
            fte_ratio: Some(m.fte_ratio),
        }
    }
}

impl Stowage {
    pathfields_fn!(
        entity_csvs => "entity-csvs",
        cache => "cache",
    );

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG)
    }

    fn csv_path(&self, entity: &str) -> PathBuf {
        self.entity_csvs.join(entity).with_extension("csv.gz")
    }

    fn cache_path(&self) -> PathBuf {
        self.cache.join(STORE_CACHE)
    }

    pub fn get_reader(&self, entity: &str) -> Result<StowReader> {
        let reader = get_gz_buf(&self.csv_path(entity))?;
        Ok(ReaderBuilder::new().from_reader(reader))
    }

    fn get_writer(&self, entity: &str) -> Result<GzWriter> {
        let file_csv = File::create(self.csv_path(entity))?;
        let gz_encoder = GzEncoder::new(BufWriter::new(file_csv), Compression::default());
        Ok(Writer::from_writer(gz_encoder))
    }

    /// Malformed rows are logged and skipped, io failures stop the read.
    fn read_rows<T: DeserializeOwned>(&self, entity: &str) -> Result<Vec<T>> {
        let mut rdr = self.get_reader(entity)?;
        let mut rows = Vec::new();
        for (i, rec) in rdr.deserialize::<T>().tqdm().desc(Some(entity)).enumerate() {
            match rec {
                Ok(row) => rows.push(row),
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => warn!(entity, row = i, error = %e, "skipping malformed row"),
            }
        }
        Ok(rows)
    }

    pub fn read_store(&self) -> Result<Store> {
        let organizations: Vec<Organization> = self.read_rows(ORGANIZATIONS)?;
        let publications = self
            .read_rows::<PublicationRow>(PUBLICATIONS)?
            .into_iter()
            .map(PublicationRow::into_publication)
            .collect();
        let memberships = self
            .read_rows::<MembershipRow>(MEMBERSHIPS)?
            .into_iter()
            .map(Membership::from)
            .collect();
        Ok(Store::new(organizations, publications, memberships))
    }

    /// Parsed store from the cache when no csv is newer than it.
    ///
    /// A cache that does not deserialize is ignored and the csvs are parsed
    /// again. Failing to write the cache afterwards is logged, the parsed
    /// store is still returned.
    pub fn load_store(&self) -> Result<Store> {
        let cache_path = self.cache_path();
        if self.cache_is_fresh(&cache_path) {
            match read_cache(&cache_path) {
                Ok(store) => {
                    info!(
                        publications = store.publication_count(),
                        memberships = store.membership_count(),
                        "store loaded from cache"
                    );
                    return Ok(store);
                }
                Err(e) => warn!(path = %cache_path.display(), "unreadable store cache: {e}"),
            }
        }
        let store = self.read_store()?;
        info!(
            organizations = store.organizations().len(),
            publications = store.publication_count(),
            memberships = store.membership_count(),
            "store parsed from csvs"
        );
        if let Err(e) = self.write_cache(&store) {
            warn!(path = %cache_path.display(), "store cache not written: {e}");
        }
        Ok(store)
    }

    fn cache_is_fresh(&self, cache_path: &Path) -> bool {
        let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
        let cached = match modified(cache_path) {
            Some(t) => t,
            None => return false,
        };
        ENTITIES
            .iter()
            .all(|e| modified(&self.csv_path(e)).map_or(false, |t| t <= cached))
    }

    /// Serializes into a sibling file, then renames it over the cache.
    pub fn write_cache(&self, store: &Store) -> Result<()> {
        let cache_path = self.cache_path();
        let tmp_path = cache_path.with_extension("bin.tmp");
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        bincode::serialize_into(&mut writer, store)?;
        writer.flush()?;
        drop(writer);
        if let Err(e) = fs::rename(&tmp_path, &cache_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    pub fn dump_store(&self, store: &Store) -> Result<()> {
        let mut orgs = self.get_writer(ORGANIZATIONS)?;
        for org in store.organizations() {
            orgs.serialize(org)?;
        }
        finish(orgs)?;

        let mut pubs = self.get_writer(PUBLICATIONS)?;
        for p in store.publications() {
            pubs.serialize(PublicationRow::from(p))?;
        }
        finish(pubs)?;

        let mut members = self.get_writer(MEMBERSHIPS)?;
        for m in store.memberships() {
            members.serialize(MembershipRow::from(m))?;
        }
        finish(members)?;
        info!(root = %self.entity_csvs.display(), "store written");
        Ok(())
    }
}

fn read_cache(path: &Path) -> Result<Store> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

fn finish(writer: GzWriter) -> Result<()> {
    let gz = writer.into_inner().map_err(|e| e.into_error())?;
    gz.finish()?.flush()?;
    Ok(())
}

pub fn get_gz_buf(path: &Path) -> Result<BufReader<GzDecoder<File>>> {
    let file = File::open(path)?;
    Ok(BufReader::new(GzDecoder::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PublicationSource;

    fn tmp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "lab-indicators-stowage-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn write_gz_text(path: &Path, text: &str) {
        let mut gz = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        gz.write_all(text.as_bytes()).unwrap();
        gz.finish().unwrap();
    }

    fn sample() -> Store {
        let mut store = Store::default();
        store.add_organization(Organization {
            id: 1,
            acronym: "LAB".to_owned(),
            name: "Laboratory".to_owned(),
            parent: None,
        });
        store.add_organization(Organization {
            id: 2,
            acronym: "TEAM".to_owned(),
            name: "Team".to_owned(),
            parent: Some(1),
        });
        let mut p = Publication::new(10, PublicationType::InternationalJournalPaper, Some(2021));
        p.title = "on things; and others".to_owned();
        p.wos_q_index = Quartile::Q2;
        p.has_postdoc_author = true;
        p.organizations = vec![1, 2];
        store.add_publication(p);
        store.add_publication(Publication::new(11, PublicationType::Thesis, None));
        store.add_membership(Membership {
            person_id: 5,
            organization_id: 2,
            since: NaiveDate::from_ymd_opt(2020, 9, 1),
            to: None,
            status: MemberStatus::PhdStudent,
            fte_ratio: 0.8,
        });
        store
    }

    #[test]
    fn csv_round_trip() {
        let stowage = Stowage::new(tmp_root("round")).unwrap();
        let store = sample();
        stowage.dump_store(&store).unwrap();
        let back = stowage.read_store().unwrap();
        assert_eq!(back.organizations(), store.organizations());
        assert_eq!(back.publications(), store.publications());
        assert_eq!(back.memberships(), store.memberships());
    }

    #[test]
    fn cache_after_first_load() {
        let stowage = Stowage::new(tmp_root("cache")).unwrap();
        stowage.dump_store(&sample()).unwrap();
        assert!(!stowage.cache_path().exists());
        let first = stowage.load_store().unwrap();
        assert!(stowage.cache_path().exists());
        let second = stowage.load_store().unwrap();
        assert_eq!(first.publications(), second.publications());
        assert_eq!(
            second.publications_by_organization(1, true).unwrap().len(),
            1
        );
    }

    #[test]
    fn corrupt_cache_is_reparsed() {
        let stowage = Stowage::new(tmp_root("corrupt")).unwrap();
        let store = sample();
        stowage.dump_store(&store).unwrap();
        stowage.load_store().unwrap();
        fs::write(stowage.cache_path(), [1_u8, 0, 0]).unwrap();
        assert!(read_cache(&stowage.cache_path()).is_err());

        let loaded = stowage.load_store().unwrap();
        assert_eq!(loaded.publications(), store.publications());
        //the broken cache got replaced
        let cached = read_cache(&stowage.cache_path()).unwrap();
        assert_eq!(cached.memberships(), store.memberships());
    }

    #[test]
    fn failed_cache_write_still_loads() {
        let stowage = Stowage::new(tmp_root("unwritable")).unwrap();
        let store = sample();
        stowage.dump_store(&store).unwrap();
        //a directory in place of the cache file can be neither read nor replaced
        create_dir_all(stowage.cache_path()).unwrap();
        assert!(stowage.write_cache(&store).is_err());

        let loaded = stowage.load_store().unwrap();
        assert_eq!(loaded.organizations(), store.organizations());
        assert!(stowage.cache_path().is_dir());
        assert!(!stowage.cache_path().with_extension("bin.tmp").exists());
    }

    #[test]
    fn lenient_rows() {
        let stowage = Stowage::new(tmp_root("lenient")).unwrap();
        write_gz_text(
            &stowage.csv_path(ORGANIZATIONS),
            "id,acronym,name,parent\n1,L,Lab,\n",
        );
        write_gz_text(
            &stowage.csv_path(PUBLICATIONS),
            "id,title,year,kind,scimago_q_index,wos_q_index,\
             phd_student_author,postdoc_author,engineer_author,organizations\n\
             1,a,2021,NATIONAL_CONFERENCE_PAPER,,,false,false,false,1\n\
             2,b,twenty,NATIONAL_CONFERENCE_PAPER,Q1,,false,false,false,1;x\n\
             3,c,2021,POSTER,,,false,false,false,1\n",
        );
        write_gz_text(
            &stowage.csv_path(MEMBERSHIPS),
            "person_id,organization_id,since,to,status,fte_ratio\n7,1,2019-01-01,,RESEARCHER,\n",
        );
        let store = stowage.read_store().unwrap();
        //unknown kind skipped, bad year kept without a year
        assert_eq!(store.publication_count(), 2);
        let second = &store.publications()[1];
        assert_eq!(second.publication_year, None);
        assert_eq!(second.scimago_q_index, Quartile::Q1);
        assert_eq!(second.organizations, vec![1]);
        assert_eq!(store.memberships()[0].fte_ratio, 1.0);
    }

    #[test]
    fn missing_file_is_io() {
        let stowage = Stowage::new(tmp_root("missing")).unwrap();
        assert!(matches!(
            stowage.read_store(),
            Err(crate::error::IndicatorError::Io(_))
        ));
    }
}
