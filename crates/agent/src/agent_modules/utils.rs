use tracing::warn;

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Hostname used to tag every sample. Resolution failures degrade to an empty string.
pub fn host_name() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!(error = %e, "Failed to resolve hostname.");
            String::new()
        }
    }
}

/// Rounds `value` half away from zero to `places` decimal digits.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Whole megabytes rendered without a fractional part, e.g. `"36236"`.
pub fn format_megabytes(bytes: u64) -> String {
    let megabytes = (bytes as f64 / BYTES_PER_MEGABYTE).round();
    format!("{}", megabytes as u64)
}

/// Percentage of `part` in `whole` with two decimals, or `None` when either is zero.
pub fn used_percent(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 || part == 0 {
        return None;
    }
    Some(round_to(part as f64 / whole as f64 * 100.0, 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_used_percent_from_raw_bytes() {
        assert_eq!(used_percent(50, 200), Some(25.0));
        assert_eq!(used_percent(1, 3), Some(33.33));
        assert_eq!(used_percent(2, 3), Some(66.67));
    }

    #[test]
    fn test_used_percent_requires_both_counts() {
        assert_eq!(used_percent(0, 200), None);
        assert_eq!(used_percent(50, 0), None);
    }

    #[test]
    fn test_format_megabytes_rounds_to_whole_number() {
        assert_eq!(format_megabytes(0), "0");
        assert_eq!(format_megabytes(1024 * 1024), "1");
        assert_eq!(format_megabytes(1024 * 1024 + 600 * 1024), "2");
        assert_eq!(format_megabytes(37_996_249_088), "36236");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(84.004, 2), 84.0);
        assert_eq!(round_to(84.005_1, 2), 84.01);
        assert_eq!(round_to(12.6, 0), 13.0);
    }

    #[test]
    fn test_host_name_matches_system() {
        let expected = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_default();
        assert_eq!(host_name(), expected);
    }
}
