// src/services/lists.rs
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::Reader;
use log::info;

use crate::BoxError;

/// Read one named column out of a CSV list file, preserving row order.
pub fn load_id_list(path: &Path, column: &str) -> Result<Vec<String>, BoxError> {
    let file = File::open(path)
        .map_err(|e| format!("cannot open identifier list {}: {}", path.display(), e))?;
    let ids = read_id_column(file, column)?;
    info!("Loaded {} identifiers from {}", ids.len(), path.display());
    Ok(ids)
}

/// Locate `column` in the header row and collect its non-empty cells.
/// Blank cells are skipped so trailing empty rows in an exported sheet do
/// not turn into empty identifiers.
pub fn read_id_column<R: Read>(reader: R, column: &str) -> Result<Vec<String>, BoxError> {
    let mut rdr = Reader::from_reader(reader);

    let headers = rdr.headers()?.clone();
    let idx = headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| format!("no '{}' column in identifier list", column))?;

    let mut ids = Vec::new();
    for record in rdr.records() {
        let row = record?;
        let cell = row.get(idx).unwrap_or("").trim();
        if !cell.is_empty() {
            ids.push(cell.to_string());
        }
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_named_column_in_order() {
        let csv = "Project,API pool id,Notes\n\
                   first, aaaa-1111 ,x\n\
                   second,bbbb-2222,y\n\
                   third,cccc-3333,z\n";
        let ids = read_id_column(csv.as_bytes(), "API pool id").unwrap();
        assert_eq!(ids, vec!["aaaa-1111", "bbbb-2222", "cccc-3333"]);
    }

    #[test]
    fn skips_blank_cells() {
        let csv = "API Protocol Name\ncurve-dex\n\n  \nconvex-finance\n";
        let ids = read_id_column(csv.as_bytes(), "API Protocol Name").unwrap();
        assert_eq!(ids, vec!["curve-dex", "convex-finance"]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let csv = "Project,Notes\nfirst,x\n";
        let err = read_id_column(csv.as_bytes(), "API pool id").unwrap_err();
        assert!(err.to_string().contains("API pool id"));
    }
}
