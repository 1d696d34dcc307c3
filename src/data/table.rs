// ============================================================
// Layer 4 — Delimited Table
// ============================================================
// A header row plus string cells, read and written with the
// `csv` crate. Cells stay as text; each consumer decides how
// to interpret them.
//
// Writes are all-or-nothing: the table is written to a temp
// file in the destination directory and renamed into place
// only after every row was flushed. Runs that produce several
// files stage all of them first and rename them together with
// `commit_all`.
//
// Reference: csv crate documentation
//            tempfile crate documentation (NamedTempFile::persist)

use csv::{ReaderBuilder, WriterBuilder};
use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

use crate::domain::errors::FoldError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    headers: Vec<String>,
    rows:    Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    /// Read a CSV file with a header row.
    pub fn read_csv(path: &Path) -> Result<Self, FoldError> {
        let file = fs::File::open(path).map_err(|e| FoldError::io(path, e))?;
        let table = Self::from_reader(file)?;
        tracing::debug!(
            "Read {} rows x {} columns from '{}'",
            table.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FoldError> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(FoldError::invalid("table has no header row"));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] { &self.headers }

    pub fn rows(&self) -> &[Vec<String>] { &self.rows }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Position of a column, `InvalidInput` when absent.
    pub fn column_index(&self, name: &str) -> Result<usize, FoldError> {
        self.headers.iter().position(|h| h == name).ok_or_else(|| {
            FoldError::invalid(format!(
                "column '{name}' not found (available: {})",
                self.headers.join(", ")
            ))
        })
    }

    /// All cells of one column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&str>, FoldError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), FoldError> {
        if row.len() != self.headers.len() {
            return Err(FoldError::invalid(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.headers.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Add a column, or overwrite it when a column of that name exists.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<(), FoldError> {
        if values.len() != self.rows.len() {
            return Err(FoldError::invalid(format!(
                "column '{name}' has {} values, table has {} rows",
                values.len(),
                self.rows.len()
            )));
        }

        match self.headers.iter().position(|h| h == name) {
            Some(idx) => {
                tracing::warn!("Overwriting existing column '{}'", name);
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(())
    }

    /// Stable sort of the rows by one column's text.
    pub fn sort_by_column(&mut self, name: &str) -> Result<(), FoldError> {
        let idx = self.column_index(name)?;
        self.rows.sort_by(|a, b| a[idx].cmp(&b[idx]));
        Ok(())
    }

    pub fn write_to<W: Write>(&self, writer: W) -> io::Result<()> {
        let mut w = WriterBuilder::new().from_writer(writer);
        w.write_record(&self.headers)?;
        for row in &self.rows {
            w.write_record(row)?;
        }
        w.flush()
    }

    /// Encode the table into a temp file beside `path` without
    /// touching `path` itself.
    pub fn stage_csv(&self, path: &Path) -> Result<StagedFile, FoldError> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes).map_err(|e| FoldError::io(path, e))?;
        StagedFile::write(path, &bytes)
    }

    /// Write the table to `path`, replacing it only on full success.
    pub fn write_csv(&self, path: &Path) -> Result<(), FoldError> {
        self.stage_csv(path)?.commit()?;
        tracing::debug!("Wrote {} rows to '{}'", self.len(), path.display());
        Ok(())
    }
}

// ─── Staged Writes ────────────────────────────────────────────────────────────

/// Bytes sitting in a temp file next to their destination. Dropping
/// it without `commit` removes the temp file and leaves `path` alone.
#[derive(Debug)]
pub struct StagedFile {
    tmp:  NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    pub fn write(path: &Path, bytes: &[u8]) -> Result<Self, FoldError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| FoldError::io(dir, e))?;
        tmp.write_all(bytes).map_err(|e| FoldError::io(tmp.path(), e))?;
        tmp.as_file().sync_all().map_err(|e| FoldError::io(tmp.path(), e))?;
        Ok(Self { tmp, path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Rename the temp file over `path`.
    pub fn commit(self) -> Result<PathBuf, FoldError> {
        let Self { tmp, path } = self;
        tmp.persist(&path).map_err(|e| FoldError::io(&path, e.error))?;
        Ok(path)
    }
}

/// Commit every staged file in order. If a rename fails, the files
/// this call already placed are removed and the rest are dropped.
pub fn commit_all(staged: Vec<StagedFile>) -> Result<Vec<PathBuf>, FoldError> {
    let mut placed: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for file in staged {
        match file.commit() {
            Ok(path) => placed.push(path),
            Err(e) => {
                for path in &placed {
                    if let Err(rm) = fs::remove_file(path) {
                        tracing::warn!("Cannot remove '{}' after a failed write: {}", path.display(), rm);
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(placed)
}

/// Write bytes to a sibling temp file, then rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), FoldError> {
    StagedFile::write(path, bytes)?.commit()?;
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_reader("patient,site,feature\np1,S1,A\np2,S2,B\n".as_bytes()).unwrap()
    }

    #[test]
    fn test_reads_headers_and_rows() {
        let t = sample();
        assert_eq!(t.headers(), &["patient", "site", "feature"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.column("site").unwrap(), vec!["S1", "S2"]);
    }

    #[test]
    fn test_missing_column_is_invalid_input() {
        let err = sample().column("tss").unwrap_err();
        assert!(matches!(err, FoldError::InvalidInput(_)));
        assert!(err.to_string().contains("tss"));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let err = Table::from_reader("a,b\n1,2\n3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, FoldError::Csv(_)));
    }

    #[test]
    fn test_set_column_appends_then_overwrites() {
        let mut t = sample();
        t.set_column("CV3", vec!["1".into(), "2".into()]).unwrap();
        assert_eq!(t.headers().last().map(String::as_str), Some("CV3"));

        t.set_column("CV3", vec!["2".into(), "1".into()]).unwrap();
        assert_eq!(t.headers().len(), 4);
        assert_eq!(t.column("CV3").unwrap(), vec!["2", "1"]);
    }

    #[test]
    fn test_set_column_length_mismatch() {
        let mut t = sample();
        assert!(t.set_column("CV3", vec!["1".into()]).is_err());
    }

    #[test]
    fn test_write_then_read_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut t = sample();
        t.set_column("note", vec!["has,comma".into(), "plain".into()]).unwrap();
        t.write_csv(&path).unwrap();

        let back = Table::read_csv(&path).unwrap();
        assert_eq!(back, t);
        // only the final file remains in the directory
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_into_missing_directory_fails_cleanly() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("out.csv");
        let err  = sample().write_csv(&path).unwrap_err();
        assert!(matches!(err, FoldError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_staged_file_is_invisible_until_commit() {
        let dir    = tempfile::tempdir().unwrap();
        let path   = dir.path().join("out.csv");
        let staged = sample().stage_csv(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(staged.path(), path.as_path());

        staged.commit().unwrap();
        assert_eq!(Table::read_csv(&path).unwrap(), sample());
    }

    #[test]
    fn test_dropped_stage_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        drop(sample().stage_csv(&dir.path().join("out.csv")).unwrap());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_commit_all_removes_placed_files_on_failure() {
        let dir   = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.csv");
        // a directory in the way makes the second rename fail
        let blocked = dir.path().join("b.csv");
        fs::create_dir(&blocked).unwrap();

        let staged = vec![
            sample().stage_csv(&first).unwrap(),
            sample().stage_csv(&blocked).unwrap(),
        ];
        let err = commit_all(staged).unwrap_err();

        assert!(matches!(err, FoldError::Io { ref path, .. } if *path == blocked));
        assert!(!first.exists());
        assert!(blocked.is_dir());
    }

    #[test]
    fn test_write_to_surfaces_sink_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> io::Result<()> { Ok(()) }
        }
        let err = sample().write_to(Broken).unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_sort_by_column() {
        let mut t = Table::from_reader("id,v\nb,1\na,2\n".as_bytes()).unwrap();
        t.sort_by_column("id").unwrap();
        assert_eq!(t.column("v").unwrap(), vec!["2", "1"]);
    }
}
