use super::{client, runtime};
use crate::output::print_json;
use chirp_core::platform::Platform;
use chirp_core::ChirpError;

pub fn run(api_base_url: Option<&str>, json: bool) -> anyhow::Result<()> {
    let client = client(api_base_url)?;
    let rt = runtime()?;
    let me = rt
        .block_on(client.verify_credentials())
        .map_err(ChirpError::Authentication)?;

    if json {
        print_json(&me)?;
    } else {
        println!("@{} ({}) id={}", me.username, me.name, me.id);
    }
    Ok(())
}
