pub mod create;
pub mod extract;
pub mod list;

#[derive(clap::Subcommand)]
pub enum PackageCommands {
    /// Create a package from a directory or a list of entries
    Create(create::CreateArgs),
    /// Extract a single file from a package
    Extract(extract::ExtractArgs),
    /// List the contents of a directory inside a package
    List(list::ListArgs),
}

impl PackageCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            PackageCommands::Create(create) => create.handle(),
            PackageCommands::Extract(extract) => extract.handle(),
            PackageCommands::List(list) => list.handle(),
        }
    }
}
