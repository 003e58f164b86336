//! Init command - initialize configuration file.

use std::path::Path;

use aquanav::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
///
/// An existing file is loaded and written back so missing keys are filled
/// in with defaults; `force` discards it instead.
pub fn run(path: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };

    let existed = write_config(&path, force)?;

    if existed && !force {
        println!("Updated configuration file: {}", path.display());
    } else {
        println!("Created configuration file: {}", path.display());
    }
    println!();
    println!("Edit this file to set the routing service and sensor feed.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

/// Writes the config file, returning whether one already existed.
fn write_config(path: &Path, force: bool) -> Result<bool, CliError> {
    let existed = path.exists();
    let config = if existed && !force {
        ConfigFile::load_from(path)?
    } else {
        ConfigFile::default()
    };
    config.save_to(path)?;
    Ok(existed)
}
