use dotenv::dotenv;
use log::{error, info};
use std::env;

use lp_landscape::services::history::aggregate_protocol_history;
use lp_landscape::services::llama::LlamaClient;
use lp_landscape::services::reconcile::{reconcile, ExclusionRules};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let slug = env::args().nth(1).unwrap_or_else(|| "curve-dex".to_string());
    info!("Fetching protocol '{}' from DeFiLlama...", slug);

    let client = LlamaClient::new();
    let rules = ExclusionRules::default();

    let reported = client.current_tvl(&slug).await?;
    info!("Reported current TVL: {:.0}", reported);

    match client.protocol(&slug).await {
        Ok(response) => {
            let (filtered, record) =
                reconcile(&response.name, &response.current_chain_tvls, reported, &rules);
            info!("✓ {} chains retained after filtering", filtered.len());
            info!("  Computed aggregate: {:.0}", record.computed_tvl);
            info!("  Reported by API:    {:.0}", record.reported_tvl);
            info!("  Relative drift:     {:.2}%", record.relative_drift() * 100.0);

            let series = aggregate_protocol_history(&response.name, &response.chain_tvls, &rules)?;
            if let Some(latest) = series.points.first() {
                info!(
                    "  History: {} dates, latest {} = {:.0}",
                    series.points.len(),
                    latest.date,
                    latest.value
                );
            }
        }
        Err(e) => {
            error!("✗ Failed to fetch protocol breakdown: {}", e);
        }
    }

    Ok(())
}
