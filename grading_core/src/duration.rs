// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Duration formatting shared by the compiler driver, test runner, and leak probe.

use std::time::Duration;

/// Formats a duration the way the report's `time`/`elapsed` string fields expect:
/// milliseconds below one second, seconds with millisecond precision above it.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{:.3}ms", secs * 1000.0)
    } else {
        format!("{secs:.3}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_second_durations_format_as_milliseconds() {
        assert_eq!(format_duration(Duration::from_millis(5)), "5.000ms");
    }

    #[test]
    fn second_scale_durations_format_as_seconds() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.500s");
    }
}
