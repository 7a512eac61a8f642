//! Print the composed instructions without touching the network

use eyre::Result;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::config::Config;

pub fn run(file: Option<PathBuf>, config: &Config) -> Result<()> {
    let (_, composition) = super::compose(config, file.as_deref())?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", composition.instructions)?;
    stdout.flush()?;
    Ok(())
}
