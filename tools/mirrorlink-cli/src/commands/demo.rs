//! Run a scripted hotplug-and-mirror scenario on the simulated platform.

use std::sync::Arc;
use std::time::Duration;

use mirrorlink_common::config::AppConfig;
use mirrorlink_engine::{EngineConfig, MirrorEngine};
use mirrorlink_platform_core::{DisplayHost, Mode, OutputId, SessionBinder, SettingsStore};
use mirrorlink_platform_sim::{
    hdmi_output, usb_adapter, MemorySettings, SimBinder, SimConsent, SimHost,
};

pub async fn run(settle_ms: Option<u64>, poll_ms: Option<u64>, deny_consent: bool) -> anyhow::Result<()> {
    let host = SimHost::new();
    let consent = if deny_consent {
        SimConsent::denying()
    } else {
        SimConsent::granting()
    };
    let binder = SimBinder::new();
    let settings = MemorySettings::new();

    // Configured timings, with command-line overrides on top.
    let mut config = EngineConfig::from_app(&AppConfig::load());
    if let Some(ms) = settle_ms {
        config.settle_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = poll_ms {
        config.poll_interval = Duration::from_millis(ms);
    }
    let settle_delay = config.settle_delay;
    let engine = Arc::new(MirrorEngine::new(
        config,
        Arc::clone(&host) as Arc<dyn DisplayHost>,
        consent,
        Arc::clone(&binder) as Arc<dyn SessionBinder>,
        Arc::clone(&settings) as Arc<dyn SettingsStore>,
    ));

    // Print every status transition as it happens.
    let mut status_rx = engine.watch_status();
    let status_task = tokio::spawn(async move {
        loop {
            println!("  status: {}", *status_rx.borrow_and_update());
            if status_rx.changed().await.is_err() {
                break;
            }
        }
    });

    // And every advisory error event.
    let error_engine = Arc::clone(&engine);
    let error_task = tokio::spawn(async move {
        loop {
            let event = error_engine.next_error().await;
            println!("  event: {:?}: {}", event.kind, event.message);
        }
    });

    engine.start()?;
    pause().await;

    let fhd = Mode::new(1920, 1080, 60);
    let uhd = Mode::new(3840, 2160, 30);

    println!("Plugging in the USB adapter");
    host.attach_adapter(usb_adapter("usb-c-dongle"));
    tokio::time::sleep(settle_delay + Duration::from_millis(300)).await;

    println!("Connecting the HDMI display");
    host.connect_output(hdmi_output(2, &[fhd, uhd]));
    pause().await;

    println!("Available modes:");
    for mode in engine.available_modes() {
        println!("  {mode}");
    }

    println!("Starting mirroring");
    engine.start_mirroring().await?;
    pause().await;

    if !deny_consent {
        println!("Selecting {uhd}");
        engine.select_mode(uhd).await;
        pause().await;

        println!("Restarting mirroring at the new mode");
        engine.start_mirroring().await?;
        pause().await;
    }

    println!("Unplugging the HDMI display");
    host.disconnect_output(OutputId(2));
    pause().await;

    println!("Detaching the adapter");
    host.detach_adapter("usb-c-dongle");
    pause().await;

    engine.shutdown().await;
    status_task.abort();
    error_task.abort();

    println!("Done.");
    Ok(())
}

async fn pause() {
    tokio::time::sleep(Duration::from_millis(300)).await;
}
