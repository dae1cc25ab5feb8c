//! Logging setup and result files

use crate::postprocess::FieldBundle;
use color_eyre::eyre::{eyre, Result, WrapErr};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::{
    fmt::format::Writer, fmt::layer, fmt::time::FormatTime, layer::SubscriberExt,
    util::SubscriberInitExt, Registry,
};

/// Wall-clock time of day, whole seconds (UTC)
struct WallClockSeconds;

impl FormatTime for WallClockSeconds {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        write!(w, "{:02}:{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60, secs % 60)
    }
}

/// Route tracing output to a log file, or to stdout when no path is given.
///
/// Returns an error if the log file cannot be created or a global
/// subscriber is already installed.
pub fn setup_output(log_path: Option<&String>) -> Result<()> {
    match log_path {
        Some(path) => {
            let log = File::create(path).wrap_err_with(|| format!("Could not create log file: {path}"))?;
            let file_layer = layer()
                .with_writer(log)
                .with_timer(WallClockSeconds)
                .with_ansi(false);
            Registry::default()
                .with(file_layer)
                .try_init()
                .map_err(|e| eyre!("Could not install the log subscriber: {e}"))?;
            info!("Log written to: {}", path);
        }
        None => {
            let stdout_layer = layer()
                .with_writer(std::io::stdout)
                .with_timer(WallClockSeconds)
                .with_ansi(true);
            Registry::default()
                .with(stdout_layer)
                .try_init()
                .map_err(|e| eyre!("Could not install the log subscriber: {e}"))?;
        }
    }
    Ok(())
}

/// One line, space separated, ascending, full precision.
pub fn write_eigenvalues<W: Write>(writer: &mut W, eigenvalues: &[f64]) -> Result<()> {
    let line = eigenvalues
        .iter()
        .map(|v| format!("{v}"))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{line}")?;
    Ok(())
}

/// Column table: optional `x`, then every field of the bundle in order.
pub fn write_field_table<W: Write>(writer: &mut W, bundle: &FieldBundle) -> Result<()> {
    let fields: Vec<_> = bundle.fields().collect();
    let rows = bundle.density.values.len();
    if let Some(bad) = fields.iter().find(|f| f.values.len() != rows) {
        return Err(eyre!(
            "field {} has {} entries, expected {}",
            bad.name,
            bad.values.len(),
            rows
        ));
    }
    if let Some(x) = &bundle.coordinates {
        if x.len() != rows {
            return Err(eyre!("{} coordinates for {} rows", x.len(), rows));
        }
    }

    let mut header = vec!["#"];
    if bundle.coordinates.is_some() {
        header.push("x");
    }
    header.extend(fields.iter().map(|f| f.name.as_str()));
    writeln!(writer, "{}", header.join(" "))?;

    for row in 0..rows {
        let mut cells = Vec::with_capacity(fields.len() + 1);
        if let Some(x) = &bundle.coordinates {
            cells.push(format!("{:.12e}", x[row]));
        }
        cells.extend(fields.iter().map(|f| format!("{:.12e}", f.values[row])));
        writeln!(writer, "{}", cells.join(" "))?;
    }
    Ok(())
}

/// Write `<trunk>.dat` and `<trunk>_eigs.txt`. Returns both paths.
pub fn save_bundle(trunk: &str, bundle: &FieldBundle) -> Result<(PathBuf, PathBuf)> {
    let table_path = PathBuf::from(format!("{trunk}.dat"));
    let eigs_path = PathBuf::from(format!("{trunk}_eigs.txt"));

    let mut table = BufWriter::new(create(&table_path)?);
    write_field_table(&mut table, bundle)?;
    table.flush()?;

    let mut eigs = BufWriter::new(create(&eigs_path)?);
    write_eigenvalues(&mut eigs, &bundle.eigenvalues)?;
    eigs.flush()?;

    info!("Fields written to {}", table_path.display());
    info!("Eigenvalues written to {}", eigs_path.display());
    Ok((table_path, eigs_path))
}

fn create(path: &Path) -> Result<File> {
    File::create(path).wrap_err_with(|| format!("Unable to create output file: {}", path.display()))
}
