use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::config::LightsConfig;
use crate::export::metadata::TrackMetadata;
use crate::export::series::{read_series, Series};
use crate::export::{metadata_path, series_path};
use crate::lights::board::LightBoard;
use crate::lights::controller::LightController;
use crate::lights::protocol::{encode_line, parse_line};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    /// Redraw the light board after every row.
    Board,
    /// Print the protocol lines sent to the controller.
    Commands,
}

pub struct Replay<'a> {
    pub series: &'a Series,
    pub thresholds: Vec<f64>,
    pub ms_per_line: f64,
    pub hold_off_ms: f64,
    pub output: Output,
    pub realtime: bool,
}

/// Loads `<track>.csv` / `<track>.json` and plays them back on stdout.
pub fn simulate_track(track: &Path, lights: &LightsConfig, output: Output, realtime: bool) -> Result<()> {
    let series = read_series(&series_path(track))?;
    let meta = TrackMetadata::load(&metadata_path(track))?;

    let ms_per_line = meta
        .ms_per_line
        .with_context(|| format!("{} has no msPerLine; analyse the track first", track.display()))?;
    let thresholds = match meta.thresholds {
        Some(t) => t,
        None => {
            log::warn!(
                "No thresholds for {}, using {} for every channel",
                track.display(),
                lights.default_threshold
            );
            vec![lights.default_threshold; series.labels.len()]
        }
    };

    log::info!(
        "Replaying {} rows of {} at {:.2} ms per row",
        series.rows.len(),
        track.display(),
        ms_per_line
    );

    let replay = Replay {
        series: &series,
        thresholds,
        ms_per_line,
        hold_off_ms: lights.hold_off_ms,
        output,
        realtime,
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let sent = replay.run(&mut out)?;
    writeln!(out)?;
    log::info!("Song ended, {} command lines sent", sent);
    Ok(())
}

impl Replay<'_> {
    /// Feeds every row through controller, wire encoding, parser and board.
    /// Returns the number of command lines produced.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<usize> {
        let columns = self.series.labels.len();
        if self.thresholds.len() != columns {
            anyhow::bail!(
                "{} thresholds for {} time-series columns",
                self.thresholds.len(),
                columns
            );
        }

        let mut controller = LightController::new(self.thresholds.clone(), self.hold_off_ms);
        let mut board = LightBoard::new(columns);
        let start = Instant::now();
        let mut sent = 0;

        for (idx, row) in self.series.rows.iter().enumerate() {
            let now_ms = idx as f64 * self.ms_per_line;
            let commands = controller.update(row, now_ms);

            if let Some(line) = encode_line(&commands) {
                sent += 1;
                if self.output == Output::Commands {
                    out.write_all(line.as_bytes())?;
                }
                for command in parse_line(&line) {
                    if let Err(err) = board.apply(command) {
                        log::error!("{}", err);
                    }
                }
            }

            if self.output == Output::Board {
                write!(out, "\r{}", board.render())?;
                out.flush()?;
            }

            if self.realtime {
                let due = start + Duration::from_secs_f64((idx + 1) as f64 * self.ms_per_line / 1000.0);
                if let Some(wait) = due.checked_duration_since(Instant::now()) {
                    std::thread::sleep(wait);
                }
            }
        }

        Ok(sent)
    }
}
