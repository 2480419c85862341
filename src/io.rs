//! File boundaries: textual integer matrices/vectors and bincode
//! persistence for every serialized object.

use crate::error::{IpfeError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

/// Reads a whitespace- or comma-separated integer matrix, one row per
/// line; blank lines are ignored.
pub fn read_matrix(path: &Path) -> Result<Vec<Vec<i64>>> {
    let file = File::open(path)?;
    let mut rows = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let row = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|tok| !tok.is_empty())
            .map(|tok| {
                tok.parse::<i64>().map_err(|e| IpfeError::Parse {
                    line: idx + 1,
                    msg: format!("{tok:?}: {e}"),
                })
            })
            .collect::<Result<Vec<i64>>>()?;
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Reads a vector: the flattened integer stream of the file.
pub fn read_vector(path: &Path) -> Result<Vec<i64>> {
    Ok(read_matrix(path)?.into_iter().flatten().collect())
}

/// Persists any serializable object with bincode.
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    bincode::serialize_into(file, value)?;
    Ok(())
}

/// Loads a previously saved object.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(file)?)
}
