use crate::output::{format_interval, print_json, print_table};
use chirp_core::cadence::CadenceTracker;
use chirp_core::config::Config;

pub fn run(config: &Config, json: bool) -> anyhow::Result<()> {
    let tracker = CadenceTracker::from_config(config);

    if json {
        return print_json(&tracker.specs());
    }

    let rows = tracker
        .specs()
        .iter()
        .map(|spec| {
            vec![
                spec.kind.to_string(),
                if spec.enabled { "yes" } else { "no" }.to_string(),
                format_interval(spec.min_interval),
            ]
        })
        .collect();
    print_table(&["ACTION", "ENABLED", "INTERVAL"], rows);
    println!();
    println!(
        "Cycle every {}, backoff {}..{} after failures, stop after {} failed cycles.",
        format_interval(config.schedule.steady_interval()),
        format_interval(std::time::Duration::from_secs(config.backoff.base_secs)),
        format_interval(std::time::Duration::from_secs(config.backoff.cap_secs)),
        config.backoff.fatal_threshold
    );
    Ok(())
}
