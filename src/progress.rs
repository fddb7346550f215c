// src/progress.rs

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_CHARS: &str = "█▓░";

/// Progress bar over a known number of animation frames.
pub fn frame_progress_bar(label: impl Into<String>, total_frames: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_frames);
    pb.set_style(
        ProgressStyle::with_template(
            "{prefix:.bold.dim} {spinner:.green} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} frames ({eta}) {msg}",
        )
        .unwrap()
        .progress_chars(BAR_CHARS),
    );
    pb.set_prefix(label.into());
    pb.enable_steady_tick(Duration::from_millis(75));
    pb
}

/// Spinner for stages without a known length (layout fold, GIF encoding).
pub fn spinner(label: impl Into<String>, message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold.dim} {spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap(),
    );
    pb.set_prefix(label.into());
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(75));
    pb
}
