//! CSV parsing for the attribution input format (§6, component B "Input Model").
//!
//! One CSV row is one user. Each row holds bracketed, comma-separated inner arrays for the
//! touchpoint and conversion columns (`timestamps`, `is_click`, `ad_ids`, ...); this module turns
//! that row shape into fixed-width [`crate::touchpoint::Touchpoint`]/[`crate::conversion::Conversion`]
//! vectors. Raw field extraction (splitting on commas, stripping brackets) is the "straightforward
//! glue" §1 calls out as out of scope for the core engineering; padding to fixed width and
//! preserving sort order is not, and lives in [`crate::touchpoint`]/[`crate::conversion`].

use std::path::Path;

use crate::{
    MeasurementError, Result,
    conversion::{Conversion, pad_conversions},
    touchpoint::{Touchpoint, pad_touchpoints},
};

const REQUIRED_COLUMNS: &[&str] = &["timestamps", "is_click"];

/// One user's raw CSV row, each column already split into its inner array.
///
/// Fields carry `u64` even where the plaintext meaning is a `bool` or narrower integer, because
/// under XOR input-encryption modes the column holds an opaque share rather than a meaningful
/// value (§3: "the partner's sensitive fields ... arrive as additive/XOR shares already").
#[derive(Debug, Clone, Default)]
pub struct RawUserRow {
    /// Touchpoint timestamps.
    pub timestamps: Vec<u64>,
    /// Touchpoint click bits (`0`/`1` in plaintext mode, an opaque share otherwise).
    pub is_click: Vec<u64>,
    /// Optional per-touchpoint target id column.
    pub target_id: Vec<u64>,
    /// Optional per-touchpoint `(targetId, actionType)` column, packed as `targetId` here with
    /// `action_type` split out by the caller; kept as a single raw column to mirror the CSV
    /// header `targetid_actiontype`.
    pub target_id_action_type: Vec<u64>,
    /// Original 64-bit ad ids.
    pub ad_ids: Vec<u64>,
    /// Opaque campaign metadata.
    pub campaign_metadata: Vec<u64>,
    /// Conversion timestamps.
    pub conversion_timestamps: Vec<u64>,
    /// Conversion values.
    pub conversion_values: Vec<u64>,
    /// Opaque conversion metadata.
    pub conversion_metadata: Vec<u64>,
}

impl RawUserRow {
    /// Builds the padded, plaintext [`Touchpoint`] row for this user.
    ///
    /// Only meaningful when the governing [`crate::InputEncryption`] is `Plaintext`; for XOR
    /// modes the raw `u64` columns are shares and must instead be fed directly to the secure
    /// value layer's share constructors (see `measure-core`), not interpreted here.
    pub fn to_plaintext_touchpoints(&self, max_tp: usize) -> Result<Vec<Touchpoint>> {
        let n = self.timestamps.len();
        if self.is_click.len() != n || self.ad_ids.len() != n {
            return Err(MeasurementError::InputFormat {
                path: Path::new("<row>").to_path_buf(),
                reason: "timestamps/is_click/ad_ids column length mismatch".to_string(),
            });
        }
        let mut rows = Vec::with_capacity(n);
        for i in 0..n {
            rows.push(Touchpoint {
                id: i as u32,
                is_click: self.is_click[i] != 0,
                ts: self.timestamps[i] as u32,
                ad_id: self.ad_ids[i],
                ad_id_compressed: 0,
                target_id: self.target_id.get(i).copied().unwrap_or(0),
                action_type: self
                    .target_id_action_type
                    .get(i)
                    .copied()
                    .unwrap_or(0) as u16,
                campaign_metadata: self.campaign_metadata.get(i).copied().unwrap_or(0),
            });
        }
        pad_touchpoints(rows, max_tp, false)
    }

    /// Builds the padded, plaintext [`Conversion`] row for this user. See
    /// [`RawUserRow::to_plaintext_touchpoints`] for the XOR-mode caveat.
    pub fn to_plaintext_conversions(&self, max_conv: usize) -> Result<Vec<Conversion>> {
        let n = self.conversion_timestamps.len();
        if self.conversion_values.len() != n {
            return Err(MeasurementError::InputFormat {
                path: Path::new("<row>").to_path_buf(),
                reason: "conversion_timestamps/conversion_values column length mismatch"
                    .to_string(),
            });
        }
        let mut rows = Vec::with_capacity(n);
        for i in 0..n {
            rows.push(Conversion {
                ts: self.conversion_timestamps[i] as u32,
                conv_value: self.conversion_values[i] as u32,
                target_id: 0,
                action_type: 0,
                conv_metadata: self.conversion_metadata.get(i).copied().unwrap_or(0),
            });
        }
        pad_conversions(rows, max_conv, false)
    }
}

/// Strips a bracketed, comma-separated list (e.g. `"[1, 2, 3]"`) into its `u64` elements.
/// Whitespace is stripped per §6. An empty `"[]"` yields an empty vector. Booleans (`true`/
/// `false`) parse to `1`/`0`.
fn parse_bracket_list(raw: &str, path: &Path, column: &str) -> Result<Vec<u64>> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| {
            MeasurementError::input_format(path, format!("column '{column}' is not bracketed"))
        })?;
    let inner = inner.trim();
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|tok| {
            let tok = tok.trim();
            match tok {
                "true" => Ok(1),
                "false" => Ok(0),
                other => other.parse::<u64>().map_err(|e| {
                    MeasurementError::input_format(
                        path,
                        format!("column '{column}' has non-numeric entry '{other}': {e}"),
                    )
                }),
            }
        })
        .collect()
}

/// Parses an attribution input CSV (§6) into one [`RawUserRow`] per data row.
///
/// A header row is required. Extra columns are tolerated (with a `tracing::warn!`); missing
/// required columns (`timestamps`, `is_click`) are fatal.
pub fn parse_attribution_csv(path: impl AsRef<Path>) -> Result<Vec<RawUserRow>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| MeasurementError::input_format(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| MeasurementError::input_format(path, e))?
        .clone();

    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == *required) {
            return Err(MeasurementError::input_format(
                path,
                format!("missing required column '{required}'"),
            ));
        }
    }
    for header in headers.iter() {
        if !KNOWN_COLUMNS.contains(&header) {
            tracing::warn!(column = header, "unrecognized column in attribution CSV");
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| MeasurementError::input_format(path, e))?;
        let mut row = RawUserRow::default();
        for (name, value) in headers.iter().zip(record.iter()) {
            let parsed = || parse_bracket_list(value, path, name);
            match name {
                "timestamps" => row.timestamps = parsed()?,
                "is_click" => row.is_click = parsed()?,
                "targetid" => row.target_id = parsed()?,
                "targetid_actiontype" => row.target_id_action_type = parsed()?,
                "ad_ids" => row.ad_ids = parsed()?,
                "campaign_metadata" => row.campaign_metadata = parsed()?,
                "conversion_timestamps" => row.conversion_timestamps = parsed()?,
                "conversion_values" => row.conversion_values = parsed()?,
                "conversion_metadata" => row.conversion_metadata = parsed()?,
                _ => {}
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

const KNOWN_COLUMNS: &[&str] = &[
    "timestamps",
    "is_click",
    "targetid",
    "targetid_actiontype",
    "ad_ids",
    "campaign_metadata",
    "conversion_timestamps",
    "conversion_values",
    "conversion_metadata",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(contents: &str) -> tempfile_path::TempCsv {
        tempfile_path::TempCsv::new(contents)
    }

    mod tempfile_path {
        use std::{fs::File, io::Write, path::PathBuf};

        pub struct TempCsv {
            pub path: PathBuf,
        }

        impl TempCsv {
            pub fn new(contents: &str) -> Self {
                let mut path = std::env::temp_dir();
                path.push(format!("measure_types_csv_test_{}.csv", uuid::Uuid::new_v4()));
                let mut file = File::create(&path).unwrap();
                file.write_all(contents.as_bytes()).unwrap();
                Self { path }
            }
        }

        impl Drop for TempCsv {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.path);
            }
        }
    }

    #[test]
    fn parses_bracketed_columns_into_touchpoints_and_conversions() {
        let csv = "timestamps,is_click,ad_ids,conversion_timestamps,conversion_values\n\
                   \"[100, 200]\",\"[false, true]\",\"[7, 9]\",\"[250]\",\"[500]\"\n";
        let file = write_csv(csv);
        let rows = parse_attribution_csv(&file.path).unwrap();
        assert_eq!(rows.len(), 1);
        let tps = rows[0].to_plaintext_touchpoints(4).unwrap();
        assert_eq!(tps[0].ts, 100);
        assert!(!tps[0].is_click);
        assert_eq!(tps[1].ad_id, 9);
        let convs = rows[0].to_plaintext_conversions(4).unwrap();
        assert_eq!(convs[0].ts, 250);
        assert_eq!(convs[0].conv_value, 500);
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let csv = "ad_ids\n\"[1]\"\n";
        let file = write_csv(csv);
        assert!(matches!(
            parse_attribution_csv(&file.path),
            Err(MeasurementError::InputFormat { .. })
        ));
    }

    #[test]
    fn empty_bracket_list_parses_to_empty_vec() {
        let path = Path::new("unused");
        assert_eq!(parse_bracket_list("[]", path, "timestamps").unwrap(), Vec::<u64>::new());
        assert_eq!(
            parse_bracket_list("[ 1 , 2 ,3]", path, "timestamps").unwrap(),
            vec![1, 2, 3]
        );
    }
}
