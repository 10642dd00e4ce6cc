use clap::Args;
use miette::{Context, Result};
use raven_rpk::ContentSource;
use std::{path::PathBuf, str::FromStr};
use tracing::info;

/// One `--entry` argument, `LOGICAL[=SOURCE]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySpec {
    logical: String,
    source: Option<PathBuf>,
}

impl FromStr for EntrySpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (logical, source) = match s.split_once('=') {
            Some((logical, source)) if !source.is_empty() => {
                (logical, Some(PathBuf::from(source)))
            }
            Some(_) => return Err(format!("entry '{s}' has an empty source")),
            None => (s, None),
        };

        if logical.trim_matches(|c: char| c == '/' || c == '\\').is_empty() {
            return Err(format!("entry '{s}' has no logical path"));
        }

        Ok(EntrySpec {
            logical: logical.to_owned(),
            source,
        })
    }
}

#[derive(Args)]
pub struct CreateArgs {
    /// A target RPK file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// An input directory
    #[arg(short, long, value_name = "DIR", required_unless_present = "entry")]
    directory: Option<PathBuf>,

    /// A file (`LOGICAL=SOURCE`) or empty directory (`LOGICAL`) to add
    #[arg(short, long, value_name = "LOGICAL[=SOURCE]", conflicts_with = "directory")]
    entry: Vec<EntrySpec>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl CreateArgs {
    pub fn handle(&self) -> Result<()> {
        if let Some(directory) = &self.directory {
            info!("archiving {}", directory.display());
            return raven_rpk::create_archive_from_directory(directory, &self.file, self.overwrite)
                .context(format!("creating {}", self.file.display()));
        }

        let entries = self.entry.iter().map(|entry| {
            (
                entry.logical.as_str(),
                entry.source.clone().map(ContentSource::Path),
            )
        });

        raven_rpk::create_archive_from_entries(entries, &self.file, self.overwrite)
            .context(format!("creating {}", self.file.display()))
    }
}
