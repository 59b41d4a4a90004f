use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{ResultScreen, ScreenEvent, ScreenOptions, UploadScreen};
use storage::Storage;
use tracing::info;

mod config;

use config::load_settings;

/// Two-screen showcase flow: upload a photo, then render the ranked matches.
#[derive(Parser, Debug)]
struct Args {
    /// Photo to submit for analysis.
    #[arg(long)]
    image: PathBuf,
    /// Analysis endpoint base URL (overrides configuration).
    #[arg(long)]
    analyze_base_url: Option<String>,
    /// Member resource URL (overrides configuration).
    #[arg(long)]
    members_url: Option<String>,
    /// Result store location (overrides configuration).
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(v) = args.analyze_base_url {
        settings.analyze_base_url = v;
    }
    if let Some(v) = args.members_url {
        settings.members_url = v;
    }
    if let Some(v) = args.database_url {
        settings.database_url = v;
    }

    let store = Storage::new(&settings.database_url)
        .await
        .with_context(|| format!("failed to open result store '{}'", settings.database_url))?;
    store.health_check().await?;

    let options = ScreenOptions {
        analyze_base_url: settings.analyze_base_url.clone(),
        members_url: settings.members_url.clone(),
        probe_timeout: Duration::from_millis(settings.probe_timeout_ms),
        probe_max_check: settings.probe_max_check,
        rotation_interval: Duration::from_millis(settings.rotation_interval_ms),
    };

    let upload = UploadScreen::new(options.clone(), store.clone());
    let mut events = upload.subscribe_events();
    upload.mount().await;

    // Give the showcase a chance to come up so the panes have something to
    // show; the submission itself does not depend on it.
    match tokio::time::timeout(Duration::from_secs(30), events.recv()).await {
        Ok(Ok(ScreenEvent::ShowcaseReady { count })) => info!(count, "showcase ready"),
        _ => info!("showcase not ready yet, continuing"),
    }
    if let (Some(left), Some(right)) = (upload.left_image().await, upload.right_image().await) {
        println!("showcase panes: left={left} right={right}");
    }

    let filename = args
        .image
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.jpg")
        .to_string();
    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("failed to read photo '{}'", args.image.display()))?;

    let results = match upload.submit(&filename, bytes).await {
        Ok(results) => results,
        Err(err) => {
            // The surface shows the status and stays on the upload screen.
            eprintln!("診断に失敗しました（{}）。", err.status_label());
            upload.teardown().await;
            return Ok(());
        }
    };
    upload.teardown().await;

    let result_screen = ResultScreen::new(options, store, settings.upload_page_url.clone());
    result_screen.mount(Some(results)).await;

    if result_screen.is_empty().await {
        println!("結果がありません。アップロード画面から診断してください。");
    } else {
        let cards = result_screen.cards().await;
        println!("{}", serde_json::to_string_pretty(&cards)?);
        let share = result_screen.share_links().await;
        println!("share X:    {}", share.x_url);
        println!("share LINE: {}", share.line_url);
    }
    result_screen.teardown().await;

    Ok(())
}
