//! Time formatting for ffmpeg arguments and console output

/// Seconds as passed to ffmpeg options (`-t`, `-ss`, filter arguments)
pub fn ffmpeg_seconds(seconds: f64) -> String {
    format!("{:.6}", seconds.max(0.0))
}

/// Whole milliseconds, as used by the `adelay` filter
pub fn millis(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

/// Format seconds as MM:SS.mmm, or HH:MM:SS.mmm past the hour
pub fn format_clock(seconds: f64) -> String {
    let total_millis = millis(seconds);
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let ms = total_millis % 1000;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_seconds() {
        assert_eq!(ffmpeg_seconds(2.5), "2.500000");
        assert_eq!(ffmpeg_seconds(-1.0), "0.000000");
    }

    #[test]
    fn test_millis() {
        assert_eq!(millis(0.15), 150);
        assert_eq!(millis(-0.2), 0);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(65.5), "01:05.500");
        assert_eq!(format_clock(3725.25), "01:02:05.250");
        assert_eq!(format_clock(0.0), "00:00.000");
    }
}
