use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vmeter_media::{EngineConfig, FfmpegEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = EngineConfig::from_env();
    println!(
        "vmeter-selfcheck: starting with ffmpeg={} work_dir={}",
        config
            .ffmpeg_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<PATH>".to_string()),
        config
            .work_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<tmp>".to_string()),
    );

    if let Some(dir) = &config.work_dir {
        tokio::fs::create_dir_all(dir).await?;
    }

    let engine = FfmpegEngine::load(&config)
        .await
        .map_err(|e| anyhow::anyhow!("engine not available: {}", e))?;
    println!("vmeter-selfcheck: {}", engine.version());

    if let Some(path) = std::env::args().nth(1).map(PathBuf::from) {
        let media = tokio::fs::read(&path).await?;
        let measurement = engine
            .analyze(&media)
            .await
            .map_err(|e| anyhow::anyhow!("analysis of {} failed: {}", path.display(), e))?;

        let show = |v: Option<f64>| v.map(|v| format!("{:.1} LUFS", v)).unwrap_or_else(|| "N/A".to_string());
        println!("vmeter-selfcheck: integrated={}", show(measurement.integrated()));
        println!("vmeter-selfcheck: short_term={}", show(measurement.short_term()));
    }

    println!("vmeter-selfcheck: ok");
    Ok(())
}
