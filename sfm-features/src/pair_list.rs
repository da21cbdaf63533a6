//! Reading and writing of image pair lists.
//!
//! A pair list is a text file with one pair per line, the two image names separated by whitespace.

use crate::{Error, Result};
use std::io::Write;
use std::path::Path;

pub type Pair = (String, String);

pub fn parse_pairs(path: &Path) -> Result<Vec<Pair>> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(ix, line)| {
            let mut names = line.split_whitespace();
            match (names.next(), names.next(), names.next()) {
                (Some(a), Some(b), None) => Ok((a.to_owned(), b.to_owned())),
                _ => Err(Error::MalformedPair {
                    path: path.to_path_buf(),
                    line: ix + 1,
                }),
            }
        })
        .collect()
}

pub fn write_pairs(path: &Path, pairs: &[Pair]) -> Result<()> {
    let io_error = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::io::BufWriter::new(std::fs::File::create(path).map_err(io_error)?);
    for (a, b) in pairs {
        writeln!(file, "{} {}", a, b).map_err(io_error)?;
    }
    file.flush().map_err(io_error)
}
