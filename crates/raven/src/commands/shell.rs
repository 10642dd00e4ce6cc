//! Interactive prompt for working with packages without remembering any flags.
//!
//! Every question can be answered with `?exit` to leave. Failed operations are reported and
//! the prompt carries on.

use clap::Args;
use miette::{IntoDiagnostic, Result};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::debug;

use super::package::list::render;

const EXIT: &str = "?exit";

#[derive(Args)]
pub struct ShellArgs {}

impl ShellArgs {
    pub fn handle(&self) -> Result<()> {
        let stdin = io::stdin();
        Shell::new(stdin.lock(), io::stdout()).run().into_diagnostic()
    }
}

enum Step {
    Continue,
    Exit,
}

pub(crate) struct Shell<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub(crate) fn new(input: R, output: W) -> Self {
        Shell { input, output }
    }

    pub(crate) fn run(&mut self) -> io::Result<()> {
        writeln!(self.output, "Raven package console interface")?;
        writeln!(self.output, "Type {EXIT} to exit.")?;

        loop {
            let Some(choice) = self.prompt("Command (archive/extract/extractto/list)")? else {
                return Ok(());
            };

            let step = match choice.as_str() {
                "" => Step::Continue,
                "archive" => self.archive()?,
                "extract" => self.extract(false)?,
                "extractto" => self.extract(true)?,
                "list" => self.list()?,
                other => {
                    writeln!(self.output, "Invalid choice '{other}'")?;
                    Step::Continue
                }
            };

            if let Step::Exit = step {
                return Ok(());
            }
        }
    }

    /// Ask for one line, `None` on `?exit` or end of input
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{label} > ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let line = line.trim_end_matches(&['\r', '\n'][..]).to_owned();
        debug!(line, "read answer");
        Ok((line != EXIT).then_some(line))
    }

    fn archive(&mut self) -> io::Result<Step> {
        let Some(directory) = self.prompt("Enter directory path")? else {
            return Ok(Step::Exit);
        };
        let Some(archive) = self.prompt("Enter archive path")? else {
            return Ok(Step::Exit);
        };

        let result = raven_rpk::create_archive_from_directory(&directory, &archive, true)
            .map(|()| vec![format!("Created {archive}")]);
        self.report(result)?;

        Ok(Step::Continue)
    }

    fn extract(&mut self, ask_target: bool) -> io::Result<Step> {
        let Some(archive) = self.prompt("Enter archive path")? else {
            return Ok(Step::Exit);
        };
        let Some(path) = self.prompt("Enter file path")? else {
            return Ok(Step::Exit);
        };
        let target = if ask_target {
            match self.prompt("Enter target path")? {
                Some(target) => Some(target),
                None => return Ok(Step::Exit),
            }
        } else {
            None
        };

        let result = raven_rpk::extract_file(&archive, &path, target.as_deref().map(Path::new))
            .map(|written| vec![format!("Extracted {}", written.display())]);
        self.report(result)?;

        Ok(Step::Continue)
    }

    fn list(&mut self) -> io::Result<Step> {
        let Some(archive) = self.prompt("Enter archive path")? else {
            return Ok(Step::Exit);
        };
        let Some(path) = self.prompt("Enter directory path")? else {
            return Ok(Step::Exit);
        };

        let result = raven_rpk::list_entries(&archive, &path)
            .map(|entries| entries.iter().map(render).collect());
        self.report(result)?;

        Ok(Step::Continue)
    }

    fn report(&mut self, result: raven_rpk::error::Result<Vec<String>>) -> io::Result<()> {
        match result {
            Ok(lines) => {
                for line in lines {
                    writeln!(self.output, "{line}")?;
                }
            }
            Err(e) => writeln!(self.output, "Error ({:?}): {}", e.status(), e)?,
        }
        Ok(())
    }
}
