//! Property-based invariants for recording file names.
//!
//! 1. Sanitized titles never contain spaces or periods.
//! 2. Sanitization preserves character count.
//! 3. Sanitization is idempotent.
//! 4. Destination always sits directly under the reports path with `.mp4`.
//! 5. Trailing slashes on the capture path do not change the temp path.

use std::path::PathBuf;

use proptest::prelude::*;
use scenario_capture::CaptureConfig;
use scenario_capture::config::sanitize_title;

// ── Strategies ────────────────────────────────────────────────────────────

/// Titles mixing words, spaces, periods and punctuation, never a path separator.
fn scenario_title() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ._,:()-]{0,48}"
}

fn display_name() -> impl Strategy<Value = String> {
    ":[0-9]{1,3}(\\.[0-9])?"
}

proptest! {
    #[test]
    fn sanitized_titles_have_no_spaces_or_periods(title in scenario_title()) {
        let sanitized = sanitize_title(&title);
        prop_assert!(!sanitized.contains(' '));
        prop_assert!(!sanitized.contains('.'));
        prop_assert_eq!(sanitized.chars().count(), title.chars().count());
    }

    #[test]
    fn sanitization_is_idempotent(title in scenario_title()) {
        let once = sanitize_title(&title);
        prop_assert_eq!(sanitize_title(&once), once);
    }

    #[test]
    fn destination_is_direct_child_of_reports_path(
        title in scenario_title(),
        trailing in 0usize..3,
    ) {
        let reports = format!("reports/capture{}", "/".repeat(trailing));
        let cfg = CaptureConfig::defaults().with_reports_path(reports);
        let destination = cfg.destination_path(&title);

        prop_assert_eq!(destination.parent(), Some(std::path::Path::new("reports/capture")));
        let expected = format!("{}.mp4", sanitize_title(&title));
        let file_name = destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        prop_assert_eq!(file_name, Some(expected));
    }

    #[test]
    fn capture_path_trailing_slashes_are_ignored(
        display in display_name(),
        trailing in 0usize..4,
    ) {
        let plain = CaptureConfig::defaults()
            .with_display(display.clone())
            .with_capture_path("/var/tmp");
        let slashed = CaptureConfig::defaults()
            .with_display(display.clone())
            .with_capture_path(format!("/var/tmp{}", "/".repeat(trailing)));

        prop_assert_eq!(plain.temp_path(), slashed.temp_path());
        let expected = PathBuf::from(format!("/var/tmp/.behat_ffmpeg_{}.mp4", &display[1..]));
        prop_assert_eq!(plain.temp_path(), expected);
    }
}
