//! Download progress: parsing extractor output and rendering status text.

/// Progress snapshot parsed from one extractor line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressInfo {
    pub percent: u8,
    pub speed_mbs: Option<f64>,
    pub eta_seconds: Option<u64>,
    pub current_size: Option<u64>,
    pub total_size: Option<u64>,
}

/// Parses progress from a yt-dlp `--newline` output line.
///
/// Example: `[download]  45.2% of 10.00MiB at 500.00KiB/s ETA 00:10`
pub fn parse_progress(line: &str) -> Option<ProgressInfo> {
    if !line.contains("[download]") {
        return None;
    }
    if !line.contains('%') {
        // "[download] Destination: ..." and similar
        log::trace!("Download line without percent: {}", line);
        return None;
    }

    let mut percent = None;
    let mut speed_mbs = None;
    let mut eta_seconds = None;
    let mut total_size = None;

    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if let Some(raw) = part.strip_suffix('%') {
            if let Ok(p) = raw.parse::<f32>() {
                percent = Some(p.clamp(0.0, 100.0) as u8);
            }
        }
        let next = parts.get(i + 1).copied();
        match (*part, next) {
            // "of ~10.00MiB" when the size is an estimate
            ("of", Some(size)) => total_size = parse_size(size.trim_start_matches('~')).or(total_size),
            ("at", Some(speed)) => {
                speed_mbs = parse_size(speed).map(|b| b as f64 / (1024.0 * 1024.0)).or(speed_mbs)
            }
            ("ETA", Some(eta)) => eta_seconds = parse_eta(eta).or(eta_seconds),
            _ => {}
        }
    }

    let p = percent?;
    let current_size = total_size.map(|total| (total as f64 * (p as f64 / 100.0)) as u64);
    log::trace!(
        "Progress parsed: {}% (speed: {:?} MB/s, eta: {:?}s)",
        p,
        speed_mbs,
        eta_seconds
    );
    Some(ProgressInfo {
        percent: p,
        speed_mbs,
        eta_seconds,
        current_size,
        total_size,
    })
}

/// Parses sizes like `10.00MiB`, `500.00KiB/s` or `1.2GiB` into bytes.
pub(crate) fn parse_size(size_str: &str) -> Option<u64> {
    let size_str = size_str.trim_end_matches("/s");
    let (number, multiplier) = if let Some(n) = size_str.strip_suffix("GiB") {
        (n, 1024.0 * 1024.0 * 1024.0)
    } else if let Some(n) = size_str.strip_suffix("MiB") {
        (n, 1024.0 * 1024.0)
    } else if let Some(n) = size_str.strip_suffix("KiB") {
        (n, 1024.0)
    } else if let Some(n) = size_str.strip_suffix('B') {
        (n, 1.0)
    } else {
        return None;
    };
    number.parse::<f64>().ok().map(|v| (v * multiplier) as u64)
}

/// Parses `MM:SS` or `H:MM:SS`
pub(crate) fn parse_eta(eta_str: &str) -> Option<u64> {
    let parts: Vec<u64> = eta_str
        .split(':')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [m, s] => Some(m * 60 + s),
        [h, m, s] => Some(h * 3600 + m * 60 + s),
        _ => None,
    }
}

/// Status text shown while a download runs
pub fn render_progress(info: &ProgressInfo) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    match (info.current_size, info.total_size) {
        (Some(done), Some(total)) => format!(
            "📥 Downloading... {}%\n💾 {:.1} MB / {:.1} MB",
            info.percent,
            done as f64 / MB,
            total as f64 / MB
        ),
        _ => format!("📥 Downloading... {}%", info.percent),
    }
}

/// Remembers the last percentage shown so identical edits are skipped.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last_percent: Option<u8>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the text to show if the percentage changed since the last call.
    pub fn next_text(&mut self, info: &ProgressInfo) -> Option<String> {
        if self.last_percent == Some(info.percent) {
            return None;
        }
        self.last_percent = Some(info.percent);
        Some(render_progress(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress_full_line() {
        let info = parse_progress("[download]  45.2% of 10.00MiB at 500.00KiB/s ETA 00:10").unwrap();
        assert_eq!(info.percent, 45);
        assert_eq!(info.total_size, Some(10 * 1024 * 1024));
        assert_eq!(info.eta_seconds, Some(10));
        assert!((info.speed_mbs.unwrap() - 0.488).abs() < 0.01);
        assert_eq!(info.current_size, Some((10.0 * 1024.0 * 1024.0 * 0.45) as u64));
    }

    #[test]
    fn test_parse_progress_estimated_size() {
        let info = parse_progress("[download]   3.0% of ~ 120.50MiB at 1.00MiB/s ETA 1:02:03").unwrap();
        assert_eq!(info.percent, 3);
        assert_eq!(info.eta_seconds, Some(3723));
    }

    #[test]
    fn test_parse_progress_ignores_other_lines() {
        assert!(parse_progress("[youtube] abc: Downloading webpage").is_none());
        assert!(parse_progress("[download] Destination: x.webm").is_none());
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("1.5KiB"), Some(1536));
        assert_eq!(parse_size("2GiB"), Some(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_size("12B"), Some(12));
        assert_eq!(parse_size("Unknown"), None);
    }

    #[test]
    fn test_render_progress() {
        let info = ProgressInfo {
            percent: 50,
            current_size: Some(5 * 1024 * 1024),
            total_size: Some(10 * 1024 * 1024),
            ..Default::default()
        };
        assert_eq!(render_progress(&info), "📥 Downloading... 50%\n💾 5.0 MB / 10.0 MB");

        let bare = ProgressInfo {
            percent: 7,
            ..Default::default()
        };
        assert_eq!(render_progress(&bare), "📥 Downloading... 7%");
    }

    #[test]
    fn test_tracker_skips_repeated_percent() {
        let mut tracker = ProgressTracker::new();
        let info = ProgressInfo {
            percent: 10,
            ..Default::default()
        };
        assert!(tracker.next_text(&info).is_some());
        assert!(tracker.next_text(&info).is_none());
        let next = ProgressInfo {
            percent: 11,
            ..Default::default()
        };
        assert!(tracker.next_text(&next).is_some());
    }
}
