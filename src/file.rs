/*
    tierql - hierarchical annotation query compiler
        by the tierql developers

        Licensed under the GNU General Public License v3
*/

//! This module contains some common helper functions for dealing with file I/O

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::error::QueryError;

/// Get a file for reading or writing, this resolves relative files against the configured working directory
pub(crate) fn get_filepath(filename: &str, workdir: Option<&Path>) -> Result<PathBuf, QueryError> {
    if filename == "-" {
        //designates stdin or stdout
        return Ok(filename.into());
    }
    let path = if let Some(stripped) = filename.strip_prefix("file://") {
        PathBuf::from(stripped)
    } else {
        PathBuf::from(filename)
    };
    if path.is_absolute() {
        Ok(path)
    } else {
        //check whether we can find one in our workdir first
        if let Some(workdir) = workdir {
            let path = workdir.join(&path);
            if path.is_file() {
                return Ok(path);
            }
        }

        // we don't test for existence here
        Ok(path)
    }
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Auxiliary function to help open files
pub(crate) fn open_file(filename: &str, config: &Config) -> Result<File, QueryError> {
    let found_filename = get_filepath(filename, config.workdir())?;
    debug!(path = ?found_filename, "open_file");
    File::open(found_filename.as_path()).map_err(|e| {
        QueryError::IOError(
            e,
            path_to_string(&found_filename),
            "Opening file for reading failed",
        )
    })
}

/// Auxiliary function to help open files
pub(crate) fn create_file(filename: &str, config: &Config) -> Result<File, QueryError> {
    let found_filename = get_filepath(filename, config.workdir())?;
    debug!(path = ?found_filename, "create_file");
    File::create(found_filename.as_path()).map_err(|e| {
        QueryError::IOError(
            e,
            path_to_string(&found_filename),
            "Opening file for writing failed",
        )
    })
}

/// Auxiliary function to help open files
pub(crate) fn open_file_reader(
    filename: &str,
    config: &Config,
) -> Result<Box<dyn BufRead>, QueryError> {
    if filename == "-" {
        //read from stdin
        Ok(Box::new(std::io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(open_file(filename, config)?)))
    }
}

/// Auxiliary function to help open files
pub(crate) fn open_file_writer(
    filename: &str,
    config: &Config,
) -> Result<Box<dyn Write>, QueryError> {
    if filename == "-" {
        Ok(Box::new(std::io::stdout()))
    } else {
        Ok(Box::new(BufWriter::new(create_file(filename, config)?)))
    }
}

/// Deserializes any JSON file, reporting the path to the offending field on failure
pub(crate) fn from_json_file<T>(
    filename: &str,
    config: &Config,
    context: &'static str,
) -> Result<T, QueryError>
where
    T: serde::de::DeserializeOwned,
{
    let reader = open_file_reader(filename, config)?;
    let deserializer = &mut serde_json::Deserializer::from_reader(reader);
    serde_path_to_error::deserialize(deserializer)
        .map_err(|e| QueryError::JsonError(e, filename.to_string(), context))
}
