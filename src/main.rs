use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use sr_zones::config::Config;
use sr_zones::indicators::{IndicatorContext, IndicatorOutput, IndicatorRegistry};
use sr_zones::models::CandleSeries;
use sr_zones::store::MemoryZoneStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    // sr-zones <bars.json> [qualifier]
    let args: Vec<String> = std::env::args().collect();
    let Some(bars_path) = args.get(1) else {
        bail!("usage: sr-zones <bars.json> [qualifier]");
    };
    let qualifier = args.get(2).cloned().or_else(|| cfg.qualifier.clone());

    let raw = fs::read_to_string(bars_path).with_context(|| format!("reading {bars_path}"))?;
    let bars: CandleSeries =
        serde_json::from_str(&raw).with_context(|| format!("parsing bars from {bars_path}"))?;

    let store = Arc::new(
        MemoryZoneStore::load(&cfg.store_path)
            .with_context(|| format!("loading snapshot {}", cfg.store_path))?,
    );

    let ctx = IndicatorContext {
        params: cfg.params()?,
        qualifier,
        symbol: cfg.symbol.clone(),
        timeframe: cfg.timeframe,
        store: store.clone(),
    };
    let indicator = IndicatorRegistry::with_defaults().build("srzones", ctx)?;

    let output = indicator.calculate(&bars).await?;
    match &output {
        IndicatorOutput::Zones(records) => {
            info!(zones = records.len(), "indicator finished");
            println!("{}", serde_json::to_string_pretty(records)?);
        }
        IndicatorOutput::Skipped { reason } => {
            info!(%reason, "nothing to do");
        }
    }

    store
        .save(&cfg.store_path)
        .await
        .with_context(|| format!("saving snapshot {}", cfg.store_path))?;

    Ok(())
}
