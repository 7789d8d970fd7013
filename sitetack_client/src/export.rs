// src/export.rs

use crate::error::ExportError;
use crate::models::PredictionResponse;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const JSON_FILE_NAME: &str = "predictionResults.json";
pub const CSV_FILE_NAME: &str = "predictionResults.csv";
pub const CSV_HEADER: [&str; 4] = ["sequence name", "site", "amino acid", "probability"];

/// Pretty JSON of the whole response, two-space indented.
pub fn to_json(model: &PredictionResponse) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(model)?)
}

/// One header line, then one row per site prediction in model order.
///
/// Rows are separated by `\n` with no newline after the last one. Fields are
/// written as-is: a sequence name containing a comma yields a malformed row.
pub fn to_csv(model: &PredictionResponse) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .has_headers(false)
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    let mut rows = 0usize;
    for seq in &model.sequence_predictions {
        for site in &seq.site_predictions {
            let position = site.site.to_string();
            let probability = to_fixed(site.probability, 4);
            writer.write_record([
                seq.sequence_name.as_str(),
                position.as_str(),
                site.amino_acid.as_str(),
                probability.as_str(),
            ])?;
            rows += 1;
        }
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    let mut text = String::from_utf8(bytes)?;
    if rows > 0 {
        text.pop();
    }
    debug!("CSV export has {} data rows", rows);
    Ok(text)
}

/// Fixed-point text with `places` decimals, rounding halves away from zero.
///
/// `format!("{:.4}")` rounds exact binary ties such as 0.03125 to even; the
/// browser client's `toFixed` rounds them up, so the decision is made on the
/// exact decimal expansion instead.
pub fn to_fixed(value: f64, places: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        return text.to_string();
    }

    // 60 extra digits keep every double near a tie exact at the decision digit.
    let exact = format!("{:.*}", places + 60, value.abs());
    let (whole, fraction) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let fraction = fraction.as_bytes();

    let mut digits: Vec<u8> = whole.bytes().chain(fraction[..places].iter().copied()).collect();
    if fraction[places] >= b'5' {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }

    let split = digits.len() - places;
    let mut out = String::with_capacity(digits.len() + 2);
    if value < 0.0 {
        out.push('-');
    }
    out.extend(digits[..split].iter().map(|&d| d as char));
    if places > 0 {
        out.push('.');
        out.extend(digits[split..].iter().map(|&d| d as char));
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    Json,
    Csv,
}

impl DownloadKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            DownloadKind::Json => JSON_FILE_NAME,
            DownloadKind::Csv => CSV_FILE_NAME,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DownloadKind::Json => "application/json",
            DownloadKind::Csv => "text/csv",
        }
    }
}

/// A generated file offered for download.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub kind: DownloadKind,
    pub contents: String,
}

impl Download {
    pub fn json(model: &PredictionResponse) -> Result<Self, ExportError> {
        Ok(Self { kind: DownloadKind::Json, contents: to_json(model)? })
    }

    pub fn csv(model: &PredictionResponse) -> Result<Self, ExportError> {
        Ok(Self { kind: DownloadKind::Csv, contents: to_csv(model)? })
    }

    pub fn file_name(&self) -> &'static str {
        self.kind.file_name()
    }
}

/// The live downloads: at most one per kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadShelf {
    json: Option<Download>,
    csv: Option<Download>,
}

impl DownloadShelf {
    /// Replaces whichever download of the same kind is currently offered.
    pub fn offer(&mut self, download: Download) -> Option<Download> {
        let slot = match download.kind {
            DownloadKind::Json => &mut self.json,
            DownloadKind::Csv => &mut self.csv,
        };
        slot.replace(download)
    }

    /// Regenerates both downloads from `model`.
    pub fn offer_all(&mut self, model: &PredictionResponse) -> Result<(), ExportError> {
        self.offer(Download::json(model)?);
        self.offer(Download::csv(model)?);
        Ok(())
    }

    pub fn get(&self, kind: DownloadKind) -> Option<&Download> {
        match kind {
            DownloadKind::Json => self.json.as_ref(),
            DownloadKind::Csv => self.csv.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.json.is_none() && self.csv.is_none()
    }

    /// Writes every offered download into `dir`, overwriting files of the same name.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for download in [&self.json, &self.csv].into_iter().flatten() {
            let path = dir.join(download.file_name());
            fs::write(&path, download.contents.as_bytes())?;
            info!("Wrote {} ({})", path.display(), download.kind.mime_type());
            written.push(path);
        }
        Ok(written)
    }
}
