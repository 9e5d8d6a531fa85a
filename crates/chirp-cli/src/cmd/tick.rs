use super::{client, ensure_valid, runtime};
use crate::output::{print_json, print_table};
use chirp_core::config::Config;
use chirp_core::scheduler::{Scheduler, TickReport};
use tokio_util::sync::CancellationToken;

pub fn run(config: &Config, api_base_url: Option<&str>, json: bool) -> anyhow::Result<()> {
    ensure_valid(config)?;
    let client = client(api_base_url)?;

    let rt = runtime()?;
    let report = rt.block_on(async {
        Scheduler::new(&client, config, CancellationToken::new())
            .run_once()
            .await
    })?;

    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    let failed = report.outcome.failures.len();
    if failed > 0 {
        anyhow::bail!("{failed} action(s) failed");
    }
    Ok(())
}

fn print_report(report: &TickReport) {
    if report.runs.is_empty() {
        println!("No actions were due.");
        return;
    }
    let rows = report
        .runs
        .iter()
        .map(|r| {
            let (status, detail) = match (&r.report, &r.failure) {
                (_, Some(failure)) => (failure.kind.to_string(), failure.message.clone()),
                (Some(ok), None) => ("ok".to_string(), ok.to_string()),
                (None, None) => ("ok".to_string(), String::new()),
            };
            vec![r.kind.to_string(), status, detail]
        })
        .collect();
    print_table(&["ACTION", "STATUS", "DETAIL"], rows);
}
