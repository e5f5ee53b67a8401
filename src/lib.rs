use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use annual::{Year, YearWindow};
use clap::{Subcommand, ValueEnum};
use tracing::info;

pub mod common;
pub mod config;
pub mod error;
pub mod indicators;
pub mod labels;
pub mod report;
pub mod source;
pub mod structs;

pub use common::Stowage;
pub use config::EngineConfig;
pub use error::{IndicatorError, Result};
pub use indicators::{AnnualIndicator, Catalog, Collaborators, Computation, IndicatorKind};
pub use labels::{MessageBundle, MessageResolver};
pub use report::IndicatorReport;
pub use source::{MembershipSource, OrganizationSource, PublicationSource, Store};
pub use structs::OrgId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Catalog indicators with their names
    List,
    /// Yearly values of one indicator
    Compute {
        #[arg(long)]
        org: OrgId,
        #[arg(long)]
        start: Year,
        #[arg(long)]
        end: Year,
        #[arg(short, long)]
        indicator: String,
        /// Print the reduced value only
        #[arg(long)]
        merged: bool,
    },
    /// Every catalog indicator for one organization
    Report {
        #[arg(long)]
        org: OrgId,
        #[arg(long)]
        start: Year,
        #[arg(long)]
        end: Year,
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

pub fn runner<W: Write>(
    root: &Path,
    config_path: Option<&Path>,
    locale: Option<&str>,
    command: Command,
    out: &mut W,
) -> Result<()> {
    let stowage = Stowage::new(root)?;
    let config_path = config_path.map_or_else(|| stowage.config_path(), Path::to_path_buf);
    let config = EngineConfig::load(config_path)?;
    let catalog = config.catalog()?;
    let messages = config.messages()?;
    let locale = locale.unwrap_or(&config.default_locale);

    match command {
        Command::List => {
            for def in catalog.definitions() {
                let name = messages.message(locale, &format!("{}.name", def.key), &[]);
                writeln!(out, "{}\t{}", def.key, name)?;
            }
        }
        Command::Compute {
            org,
            start,
            end,
            indicator,
            merged,
        } => {
            let collab = config.collaborators(Arc::new(stowage.load_store()?));
            let ind = catalog.build(&indicator, &collab)?;
            let window = YearWindow::new(start, end);
            if merged {
                writeln!(out, "{}", ind.merged_value(org, window)?)?;
            } else {
                for (year, value) in &ind.values_per_year(org, window)?.series {
                    writeln!(out, "{year}\t{value}")?;
                }
            }
        }
        Command::Report {
            org,
            start,
            end,
            format,
            out: out_path,
        } => {
            let store = Arc::new(stowage.load_store()?);
            let organization = store.organization(org)?;
            info!(org, name = %organization.name, "building report");
            let indicators = catalog.build_all(&config.collaborators(store))?;
            let report = IndicatorReport::compute(
                &indicators,
                org,
                YearWindow::new(start, end),
                &messages,
                locale,
            )?;
            match out_path {
                Some(path) => {
                    info!(path = %path.display(), "writing report");
                    let mut file = BufWriter::new(File::create(path)?);
                    write_report(&report, format, &mut file)?;
                    file.flush()?;
                }
                None => write_report(&report, format, out)?,
            }
        }
    }
    Ok(())
}

fn write_report<W: Write>(report: &IndicatorReport, format: ReportFormat, w: W) -> Result<()> {
    match format {
        ReportFormat::Json => report.write_json(w),
        ReportFormat::Csv => report.write_csv(w),
    }
}
