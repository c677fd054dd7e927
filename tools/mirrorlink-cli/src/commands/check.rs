//! Show effective configuration and stored settings.

use mirrorlink_common::config::AppConfig;
use mirrorlink_platform_core::SettingsStore;
use mirrorlink_settings::JsonSettingsStore;

pub fn run() -> anyhow::Result<()> {
    let config = AppConfig::load();

    println!("MirrorLink Configuration");
    println!("{}", "=".repeat(50));
    println!("Watcher:");
    println!("  Settle delay: {} ms", config.watcher.settle_delay_ms);
    println!("  Poll interval: {} ms", config.watcher.poll_interval_ms);
    println!("Logging:");
    println!("  Level: {}", config.logging.level);
    println!("  JSON output: {}", config.logging.json);

    let store = JsonSettingsStore::at_default_location();
    println!();
    println!("Stored settings:");
    match store.preferred_mode() {
        Ok(Some(mode)) => println!("  Preferred mode: {mode}"),
        Ok(None) => println!("  Preferred mode: (none)"),
        Err(e) => println!("  Preferred mode: unreadable ({e})"),
    }
    match store.last_active() {
        Ok(active) => println!("  Last session active: {active}"),
        Err(e) => println!("  Last session active: unreadable ({e})"),
    }

    Ok(())
}
