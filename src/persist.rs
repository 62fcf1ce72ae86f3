//! Writing collected results to disk.
//!
//! One file per batch in the results directory, named
//! `<backend>-<UTC timestamp>.json` (or `.jsonl`). Unavailable items are
//! written as `null` so positions still line up with the input.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::error::DispatchResult;
use crate::result::ResultRecord;

/// On-disk layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultFormat {
    /// A single JSON array.
    #[default]
    Array,
    /// One JSON value per line.
    Lines,
}

impl ResultFormat {
    fn extension(self) -> &'static str {
        match self {
            ResultFormat::Array => "json",
            ResultFormat::Lines => "jsonl",
        }
    }
}

/// Writes result files into a directory.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    dir: PathBuf,
    format: ResultFormat,
}

impl ResultWriter {
    /// Writer into `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            format: ResultFormat::default(),
        }
    }

    /// Choose the file layout.
    pub fn with_format(mut self, format: ResultFormat) -> Self {
        self.format = format;
        self
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `records` for a batch run on `backend`. Returns the file path.
    pub fn write(&self, backend: &str, records: &[ResultRecord]) -> DispatchResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.unique_path(backend, self.format.extension());

        let mut file = fs::File::create(&path)?;
        match self.format {
            ResultFormat::Array => serde_json::to_writer(&mut file, records)?,
            ResultFormat::Lines => {
                for record in records {
                    serde_json::to_writer(&mut file, record)?;
                    file.write_all(b"\n")?;
                }
            }
        }
        file.flush()?;

        info!(path = %path.display(), items = records.len(), "results written");
        Ok(path)
    }

    /// Write one text diagram per work item next to the results file.
    pub fn write_diagrams<D: std::fmt::Display>(
        &self,
        results_path: &Path,
        items: &[D],
    ) -> DispatchResult<PathBuf> {
        let path = results_path.with_extension("circuits.txt");
        let mut file = fs::File::create(&path)?;
        for (index, item) in items.iter().enumerate() {
            writeln!(file, "[{index}]\n{item}")?;
        }
        Ok(path)
    }

    fn unique_path(&self, backend: &str, extension: &str) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let stem = format!("{}-{stamp}", sanitize(backend));
        let mut path = self.dir.join(format!("{stem}.{extension}"));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{stem}-{n}.{extension}"));
            n += 1;
        }
        path
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Counts;

    fn records() -> Vec<ResultRecord> {
        vec![
            Counts::from_pairs([("00", 500), ("11", 500)]).into(),
            ResultRecord::Unavailable,
            Counts::from_pairs([("11", 1000)]).into(),
        ]
    }

    #[test]
    fn test_write_array() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(dir.path().join("results"));

        let path = writer.write("ibm/kyiv", &records()).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("ibm_kyiv-"));
        assert_eq!(path.extension().unwrap(), "json");

        let back: Vec<ResultRecord> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, records());
    }

    #[test]
    fn test_write_lines() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(dir.path()).with_format(ResultFormat::Lines);

        let path = writer.write("sim", &records()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "null");
        assert_eq!(lines[2], r#"{"11":1000}"#);
    }

    #[test]
    fn test_repeated_writes_do_not_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(dir.path());
        let a = writer.write("sim", &records()).unwrap();
        let b = writer.write("sim", &records()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_write_diagrams() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(dir.path());
        let path = writer.write("sim", &records()).unwrap();

        let diagrams = writer.write_diagrams(&path, &["first", "second"]).unwrap();
        let text = fs::read_to_string(diagrams).unwrap();
        assert!(text.starts_with("[0]\nfirst\n[1]\nsecond"));
    }
}
