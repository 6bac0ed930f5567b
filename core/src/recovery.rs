//! Append-only crash log and replay

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

const DATA_PREFIX: &str = "Data:";

/// Appends `Data: <data>` to the log.
pub fn record(log_file: &Path, data: &str) -> io::Result<()> {
    let mut log = OpenOptions::new().create(true).append(true).open(log_file)?;
    writeln!(log, "{} {}", DATA_PREFIX, data)?;
    log.sync_all()
}

/// Last data recorded in the log, if any.
pub fn last_entry(log_file: &Path) -> io::Result<Option<String>> {
    let content = match fs::read_to_string(log_file) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let last = content
        .lines()
        .filter_map(|line| line.find(DATA_PREFIX).map(|pos| &line[pos + DATA_PREFIX.len()..]))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest).to_string())
        .last();
    Ok(last.filter(|data| !data.is_empty()))
}

/// Writes the last logged data into `data_file`. Returns what was restored.
pub fn recover(log_file: &Path, data_file: &Path) -> io::Result<Option<String>> {
    let Some(data) = last_entry(log_file)? else {
        return Ok(None);
    };
    fs::write(data_file, &data)?;
    Ok(Some(data))
}
