use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::spectrum::pipeline::SpectrumSink;

/// Writes the per-chunk time series as CSV. Nothing appears at the
/// destination until `commit` succeeds.
pub struct CsvSeriesWriter {
    writer: BufWriter<NamedTempFile>,
    dest: PathBuf,
    columns: usize,
}

impl CsvSeriesWriter {
    pub fn create(dest: &Path) -> Result<Self> {
        let dir = parent_dir(dest);
        let tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        Ok(Self {
            writer: BufWriter::new(tmp),
            dest: dest.to_path_buf(),
            columns: 0,
        })
    }

    /// Flushes and atomically moves the file into place.
    pub fn commit(self) -> Result<()> {
        let tmp = self
            .writer
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("Failed to flush {}", self.dest.display()))?;
        tmp.persist(&self.dest)
            .with_context(|| format!("Failed to write {}", self.dest.display()))?;
        Ok(())
    }
}

impl SpectrumSink for CsvSeriesWriter {
    fn begin(&mut self, labels: &[String]) -> Result<()> {
        self.columns = labels.len();
        writeln!(self.writer, "{}", labels.join(","))?;
        Ok(())
    }

    fn write_row(&mut self, row: &[f64]) -> Result<()> {
        debug_assert_eq!(row.len(), self.columns);
        let mut first = true;
        for value in row {
            if !first {
                self.writer.write_all(b",")?;
            }
            write!(self.writer, "{}", value)?;
            first = false;
        }
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

/// A time-series file read back for playback.
#[derive(Debug)]
pub struct Series {
    pub labels: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

pub fn read_series(path: &Path) -> Result<Series> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open time series: {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next()
        .transpose()?
        .with_context(|| format!("Empty time series: {}", path.display()))?;
    let labels: Vec<String> = header.split(',').map(str::to_string).collect();

    let mut rows = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Bad value on line {} of {}", idx + 2, path.display()))?;
        if row.len() != labels.len() {
            anyhow::bail!(
                "Line {} of {} has {} values, header has {}",
                idx + 2,
                path.display(),
                row.len(),
                labels.len()
            );
        }
        rows.push(row);
    }

    Ok(Series { labels, rows })
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("track.csv");

        let mut writer = CsvSeriesWriter::create(&dest).unwrap();
        writer
            .begin(&["Left 25.0 Hz".to_string(), "Left 80.0 Hz".to_string()])
            .unwrap();
        writer.write_row(&[-100.0, 42.5]).unwrap();
        writer.write_row(&[1.25, 0.0]).unwrap();
        assert!(!dest.exists());
        writer.commit().unwrap();

        let text = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(text, "Left 25.0 Hz,Left 80.0 Hz\n-100,42.5\n1.25,0\n");

        let series = read_series(&dest).unwrap();
        assert_eq!(series.labels.len(), 2);
        assert_eq!(series.rows, vec![vec![-100.0, 42.5], vec![1.25, 0.0]]);
    }

    #[test]
    fn abandoned_writer_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("track.csv");
        {
            let mut writer = CsvSeriesWriter::create(&dest).unwrap();
            writer.begin(&["a".to_string()]).unwrap();
            writer.write_row(&[1.0]).unwrap();
        }
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn rejects_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a,b\n1,2\n3\n").unwrap();
        let err = read_series(&path).unwrap_err();
        assert!(err.to_string().contains("Line 3"));
    }
}
