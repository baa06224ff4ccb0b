use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use filakiosk::config::Config;
use filakiosk::metrics;
use filakiosk::models::DisplayView;
use filakiosk::session::{Key, KioskHandle, KioskSession, KioskSnapshot};
use filakiosk::utils::kiosk_flag_from_url;

pub struct RunParams {
    pub page_url: Option<String>,
    pub kiosk: bool,
    pub metrics: bool,
}

const HELP: &str = "commands: enter | exit | queue | tap | esc | refresh | status | help";

pub async fn run(config: &Config, params: RunParams) -> Result<()> {
    if params.metrics {
        if let Err(e) = metrics::init_metrics() {
            tracing::warn!(error = %e, "Metrics initialization failed");
        }
    }

    let deps = config
        .kiosk_deps()
        .context("Failed to wire kiosk dependencies")?;
    let handle = KioskSession::spawn(config.session_config(), deps);
    let printer = tokio::spawn(print_views(handle.subscribe()));

    let from_url = params
        .page_url
        .as_deref()
        .is_some_and(kiosk_flag_from_url);
    if params.kiosk || from_url {
        handle.enter_kiosk_mode().await?;
    }

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                dispatch(&handle, line.trim()).await?;
            }
        }
    }

    handle.shutdown().await?;
    printer.await.context("View printer panicked")?;

    if params.metrics {
        match metrics::gather_metrics() {
            Ok(text) => println!("{text}"),
            Err(e) => tracing::warn!(error = %e, "Failed to encode metrics"),
        }
    }
    Ok(())
}

async fn dispatch(handle: &KioskHandle, command: &str) -> Result<()> {
    match command {
        "" => {}
        "enter" => handle.enter_kiosk_mode().await?,
        "exit" => handle.exit_kiosk_mode().await?,
        "queue" => handle.show_queue_view().await?,
        "tap" => handle.user_interaction().await?,
        "esc" => handle.key_pressed(Key::Escape).await?,
        "refresh" => handle.ads_updated().await?,
        "status" => print_status(&handle.snapshot()),
        "help" => println!("{HELP}"),
        other => println!("unknown command: {other} ({HELP})"),
    }
    Ok(())
}

/// Print a line whenever the displayed view or kiosk state changes
async fn print_views(mut rx: tokio::sync::watch::Receiver<KioskSnapshot>) {
    let mut last: Option<(bool, DisplayView)> = None;

    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        let current = (snapshot.kiosk_active, snapshot.view.clone());
        if last.as_ref() == Some(&current) {
            continue;
        }

        if !snapshot.kiosk_active {
            println!("[{}] kiosk mode off", snapshot.changed_at.format("%H:%M:%S"));
        } else {
            let asset = snapshot
                .view
                .ad()
                .map(|slot| format!("  {}", slot.render_url()))
                .unwrap_or_default();
            println!(
                "[{}] {}{asset}",
                snapshot.changed_at.format("%H:%M:%S"),
                snapshot.view
            );
        }
        last = Some(current);
    }
}

fn print_status(snapshot: &KioskSnapshot) {
    println!("kiosk active:  {}", snapshot.kiosk_active);
    println!("view:          {}", snapshot.view);
    println!("in rotation:   {}", snapshot.in_rotation);
    println!("cursor:        {}", snapshot.cursor);
    println!("fullscreen:    {}", snapshot.fullscreen);
    println!("manifest ads:  {}", snapshot.manifest_len);
    println!(
        "timers:        rotation={} idle={}",
        snapshot.pending_rotation_timers, snapshot.pending_idle_timers
    );
}
