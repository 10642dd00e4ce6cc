pub mod package;
pub mod shell;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle RPK packages
    Package {
        #[command(subcommand)]
        command: package::PackageCommands,
    },
    /// Start an interactive prompt for creating and extracting packages
    Shell(shell::ShellArgs),
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Package { command } => command.handle(),
            Commands::Shell(shell) => shell.handle(),
        }
    }
}
