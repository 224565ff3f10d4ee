// logsift - platform/fs.rs
//
// Input helpers for the one-shot subcommands.

use crate::util::error::{LogSiftError, Result};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Read the full content of a file as a string.
///
/// For files with invalid UTF-8, uses lossy conversion.
pub fn read_file_lossy(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Read a whole input: the named file, or stdin when no path is given.
///
/// Worker output is not guaranteed to be valid UTF-8, so both sources are
/// decoded lossily.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => read_file_lossy(path).map_err(|source| LogSiftError::Io {
            path: path.to_path_buf(),
            operation: "read input file",
            source,
        }),
        None => {
            let mut bytes = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut bytes)
                .map_err(|source| LogSiftError::Io {
                    path: PathBuf::from("<stdin>"),
                    operation: "read standard input",
                    source,
                })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}
