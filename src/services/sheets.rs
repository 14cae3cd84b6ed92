// src/services/sheets.rs
use log::info;
use reqwest::Client;
use serde_json::json;

use crate::services::google_oauth::fetch_access_token;
use crate::services::table::Table;
use crate::BoxError;

#[derive(Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub service_account_json_path: String,
}

/// Tab names in the landscape workbook.
pub struct SheetNames {
    pub project_ratings: &'static str,
    pub protocol_historicals: &'static str,
    pub pool_yields: &'static str,
    pub pool_historicals: &'static str,
    pub protocol_info: &'static str,
    pub historical_chain_tvl: &'static str,
    pub lp_update_historicals: &'static str,
    pub hyusd_peer_index: &'static str,
}

impl Default for SheetNames {
    fn default() -> Self {
        SheetNames {
            project_ratings: "Project Ratings",
            protocol_historicals: "Protocol Historicals",
            pool_yields: "Pool Yields",
            pool_historicals: "Pool Historicals",
            protocol_info: "Protocol Info",
            historical_chain_tvl: "Historical Chain TVL",
            lp_update_historicals: "LP Update Historicals",
            hyusd_peer_index: "hyUSD Comps Index",
        }
    }
}

/// Write-only Google Sheets client. The run only ever replaces whole tabs
/// or single columns; reads stay in the workbook's own formulas.
pub struct SheetsStore {
    pub config: SheetsConfig,
    client: Client,
}

impl SheetsStore {
    pub fn new(config: SheetsConfig) -> Self {
        SheetsStore {
            config,
            client: Client::new(),
        }
    }

    async fn auth_token(&self) -> Result<String, BoxError> {
        Ok(fetch_access_token(&self.config.service_account_json_path).await?)
    }

    /// Replace a tab's contents with a wide table, header row first.
    pub async fn write_table(&self, tab: &str, table: &Table) -> Result<(), BoxError> {
        let token = self.auth_token().await?;

        // Drop stale rows left over from a longer previous run.
        let clear_url = format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}:clear",
            self.config.spreadsheet_id, tab
        );
        self.client
            .post(&clear_url)
            .bearer_auth(&token)
            .json(&json!({}))
            .send()
            .await?
            .error_for_status()?;

        let mut values: Vec<Vec<String>> = Vec::with_capacity(table.rows.len() + 1);
        values.push(table.header.clone());
        values.extend(table.rows.iter().cloned());

        let range = format!(
            "{}!A1:{}{}",
            tab,
            column_letters(table.header.len().max(1)),
            values.len()
        );
        let url = format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}?valueInputOption=RAW",
            self.config.spreadsheet_id, range
        );

        let body = json!({
            "values": values,
            "majorDimension": "ROWS"
        });

        let response = self
            .client
            .put(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("failed to write tab '{}': {}", tab, error_text).into());
        }

        info!(
            "Wrote {} rows x {} columns to '{}'",
            table.rows.len(),
            table.header.len(),
            tab
        );
        Ok(())
    }

    /// Update a single column in place, starting at a cell like "C2".
    pub async fn write_column(
        &self,
        tab: &str,
        start_cell: &str,
        values: &[String],
    ) -> Result<(), BoxError> {
        if values.is_empty() {
            return Ok(());
        }
        let token = self.auth_token().await?;

        let (column, start_row) = split_cell(start_cell)?;
        let range = format!(
            "{}!{}{}:{}{}",
            tab,
            column,
            start_row,
            column,
            start_row + values.len() - 1
        );
        let url = format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}?valueInputOption=RAW",
            self.config.spreadsheet_id, range
        );

        let rows: Vec<Vec<String>> = values.iter().map(|v| vec![v.clone()]).collect();
        let body = json!({
            "values": rows,
        });

        self.client
            .put(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        info!("Wrote {} values to '{}'!{}", values.len(), tab, start_cell);
        Ok(())
    }
}

/// 1-based column count to A1 letters (1 -> A, 27 -> AA).
fn column_letters(mut n: usize) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn split_cell(cell: &str) -> Result<(String, usize), BoxError> {
    let digits = cell
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| format!("cell reference '{}' has no row number", cell))?;
    let (column, row) = cell.split_at(digits);
    if column.is_empty() {
        return Err(format!("cell reference '{}' has no column letters", cell).into());
    }
    let row: usize = row
        .parse()
        .map_err(|_| format!("cell reference '{}' has a bad row number", cell))?;
    Ok((column.to_string(), row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_wrap_past_z() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(52), "AZ");
        assert_eq!(column_letters(53), "BA");
    }

    #[test]
    fn cells_split_into_column_and_row() {
        assert_eq!(split_cell("C2").unwrap(), ("C".to_string(), 2));
        assert_eq!(split_cell("AA10").unwrap(), ("AA".to_string(), 10));
        assert!(split_cell("C").is_err());
        assert!(split_cell("12").is_err());
    }
}
