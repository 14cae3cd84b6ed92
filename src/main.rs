use dotenv::dotenv;
use env_logger;
use log::{error, info};
use std::env;
use std::path::PathBuf;
use std::time::Instant;

use lp_landscape::services::llama::LlamaClient;
use lp_landscape::services::sheets::{SheetNames, SheetsConfig, SheetsStore};
use lp_landscape::services::table::AlignMode;
use lp_landscape::services::update::{
    run_update, PeerGroupMode, PeerGroupSpec, UpdateConfig,
};
use lp_landscape::BoxError;

// Reference pools pinned by id in the workbook.
const HYUSD_POOL_ID: &str = "3378bced-4bde-4ccf-b742-7d5c8ebb7720";
const MIM_3CRV_POOL_ID: &str = "8a20c472-142c-4442-b724-40f2183c073e";

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting landscape update...");

    let spreadsheet_id = env::var("GOOGLE_SHEETS_ID").expect("GOOGLE_SHEETS_ID must be set");
    let service_account_json =
        env::var("SERVICE_ACCOUNT_JSON").expect("SERVICE_ACCOUNT_JSON must be set");
    let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));

    let drift_tolerance: f64 = env::var("DRIFT_TOLERANCE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.05);

    // Positional alignment reproduces the workbook's historical layout;
    // date-keyed is the strict option.
    let align = match env::var("TABLE_ALIGN").as_deref() {
        Ok("date") => AlignMode::DateKeyed,
        _ => AlignMode::Positional,
    };

    let tabs = SheetNames::default();
    let config = UpdateConfig {
        protocols_list: data_dir.join("project_ratings.csv"),
        pools_list: data_dir.join("stables.csv"),
        peer_groups: vec![
            PeerGroupSpec {
                name: "eUSD Curve Comps".to_string(),
                list_path: data_dir.join("eusd_curve_comps.csv"),
                excluded_ids: vec![MIM_3CRV_POOL_ID.to_string()],
                mode: PeerGroupMode::Concat,
                tab: tabs.lp_update_historicals.to_string(),
            },
            PeerGroupSpec {
                name: "hyUSD Comps".to_string(),
                list_path: data_dir.join("hyusd_comps.csv"),
                excluded_ids: vec![HYUSD_POOL_ID.to_string()],
                mode: PeerGroupMode::Index,
                tab: tabs.hyusd_peer_index.to_string(),
            },
        ],
        chain_history_chain: "Ethereum".to_string(),
        drift_tolerance,
        align,
    };

    let client = LlamaClient::new();
    let store = SheetsStore::new(SheetsConfig {
        spreadsheet_id,
        service_account_json_path: service_account_json,
    });

    let started = Instant::now();
    if let Err(e) = run_update(&client, &store, &config).await {
        error!("Update run failed: {}", e);
        return Err(e);
    }
    info!(
        "Update run finished in {:.1}s",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
