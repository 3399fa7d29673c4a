//! Seeding the package list
//!
//! Names come either from a line-oriented reader (the `add` command reads
//! standard input) or from the output of the local `pkg info` command, whose
//! lines look like `curl-8.4.0   Command line tool and library`. Version
//! suffixes and comments are dropped by name normalization.

use crate::index::PackageIndex;
use crate::{MirrorError, Result};
use std::io::BufRead;
use std::process::Command;

/// Adds one package name per line until an empty line or end of input
///
/// # Returns
///
/// * `Ok(usize)` - Number of non-empty lines read
/// * `Err(MirrorError)` - The reader failed or the index could not grow
pub fn add_from_reader<R: BufRead>(reader: R, index: &mut PackageIndex) -> Result<usize> {
    let mut count = 0;

    for line in reader.lines() {
        let line = line.map_err(|e| MirrorError::Read {
            resource: "package names".to_string(),
            message: e.to_string(),
        })?;

        let name = line.trim_end_matches(['\r', '\n']);
        if name.is_empty() {
            break;
        }

        index.add(name)?;
        count += 1;
    }

    Ok(count)
}

/// Adds every package installed on this host, as reported by `pkg info`
pub fn add_from_pkg_info(index: &mut PackageIndex) -> Result<usize> {
    let mut command = Command::new("pkg");
    command.arg("info");
    add_from_command(&mut command, index)
}

fn add_from_command(command: &mut Command, index: &mut PackageIndex) -> Result<usize> {
    tracing::debug!("Running {:?}", command);

    let output = command
        .output()
        .map_err(|e| MirrorError::PackageTool(e.to_string()))?;

    if !output.status.success() {
        return Err(MirrorError::PackageTool(format!(
            "{:?} exited with {}",
            command, output.status
        )));
    }

    let mut count = 0;
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if line.is_empty() {
            continue;
        }
        index.add(line)?;
        count += 1;
    }

    tracing::info!("{} installed packages listed", count);
    Ok(count)
}
