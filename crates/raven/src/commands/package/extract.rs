use clap::Args;
use miette::{Context, Result};
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input RPK file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The logical path of the file inside the package
    #[arg(short, long, value_name = "PATH")]
    path: String,

    /// A target file, defaults to the entry's name in the working directory
    #[arg(short, long, value_name = "TARGET")]
    output: Option<PathBuf>,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let written = raven_rpk::extract_file(&self.file, &self.path, self.output.as_deref())
            .context(format!("extracting {} from {}", self.path, self.file.display()))?;

        info!("extracted {}", written.display());
        Ok(())
    }
}
