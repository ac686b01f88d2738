// src/utils/progress.rs

//! Run-progress formatting on top of the `log` facade.
//!
//! Library code logs through `log::info!` and friends; these helpers only
//! give multi-step runs a consistent shape.

/// Log a banner for the start of a run.
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a step in a multi-step run.
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a summary section.
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
