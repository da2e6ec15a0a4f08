use std::path::Path;

use super::resolve_config;

/// Load and validate the configuration, then print the effective settings.
pub fn run(path: Option<&Path>) -> anyhow::Result<()> {
    let config = resolve_config(path)?;

    println!("configuration OK");
    println!("  terminal_url:  {}", config.terminal_url);
    println!("  assistant_url: {}", config.assistant_url);
    println!(
        "  reconnect:     {} attempts, {}ms..{}ms backoff",
        config.reconnect.max_attempts,
        config.reconnect.base_delay_ms,
        config.reconnect.max_delay_ms
    );
    println!("  keepalive:     every {}s", config.keepalive_interval_secs);
    Ok(())
}
