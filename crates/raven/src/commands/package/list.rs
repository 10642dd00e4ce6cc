use clap::Args;
use miette::{Context, Result};
use owo_colors::{OwoColorize, Stream::Stdout};
use raven_rpk::EntryMeta;
use std::path::PathBuf;

#[derive(Args)]
pub struct ListArgs {
    /// An input RPK file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The directory inside the package, defaults to the root
    #[arg(short, long, value_name = "PATH", default_value = "")]
    path: String,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let entries = raven_rpk::list_entries(&self.file, &self.path)
            .context(format!("listing {} in {}", self.path, self.file.display()))?;

        for entry in &entries {
            println!("{}", render(entry));
        }

        Ok(())
    }
}

pub(crate) fn render(entry: &EntryMeta) -> String {
    match (entry.size, entry.human_size()) {
        (Some(size), Some(human)) => format!("file  {:>12}  {:>8}  {}", size, human, entry.name),
        _ => format!(
            "dir   {:>12}  {:>8}  {}",
            "-",
            "-",
            format!("{}/", entry.name).if_supports_color(Stdout, |t| t.bright_blue())
        ),
    }
}
