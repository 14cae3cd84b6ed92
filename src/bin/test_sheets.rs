use dotenv::dotenv;
use log::{error, info};
use std::env;

use lp_landscape::services::sheets::{SheetsConfig, SheetsStore};
use lp_landscape::services::table::Table;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    info!("Testing Google Sheets connectivity and write access...");

    let spreadsheet_id = env::var("GOOGLE_SHEETS_ID").expect("GOOGLE_SHEETS_ID must be set");
    let service_account_json =
        env::var("SERVICE_ACCOUNT_JSON").expect("SERVICE_ACCOUNT_JSON must be set");

    let store = SheetsStore::new(SheetsConfig {
        spreadsheet_id,
        service_account_json_path: service_account_json,
    });

    let probe = Table {
        header: vec!["probe".to_string()],
        rows: vec![vec![chrono::Utc::now().to_rfc3339()]],
    };

    match store.write_table("Scratch", &probe).await {
        Ok(()) => info!("✓ Wrote connectivity probe to 'Scratch' tab"),
        Err(e) => error!("✗ Sheets write failed: {}", e),
    }

    Ok(())
}
