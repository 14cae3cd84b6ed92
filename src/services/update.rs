// src/services/update.rs
use std::collections::HashMap;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::error::LandscapeError;
use crate::models::{PoolSeries, ProtocolSeries};
use crate::services::history;
use crate::services::lists::load_id_list;
use crate::services::llama::{LlamaClient, PoolListing, ProtocolListing};
use crate::services::peer_index::{apply_exclusions, build_peer_index};
use crate::services::reconcile::{reconcile, ExclusionRules};
use crate::services::sheets::{SheetNames, SheetsStore};
use crate::services::table::{concat_wide, AlignMode, SeriesFrame, Table};
use crate::BoxError;

/// Column headers used by the identifier list files, matching the workbook
/// tabs they are exported from.
pub const PROTOCOL_SLUG_COLUMN: &str = "API Protocol Name";
pub const POOL_ID_COLUMN: &str = "API pool id";

/// How a peer group lands in the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerGroupMode {
    /// Member histories side by side, one block of columns per pool.
    Concat,
    /// One synthetic composite series averaging the members per date.
    Index,
}

#[derive(Debug, Clone)]
pub struct PeerGroupSpec {
    pub name: String,
    pub list_path: PathBuf,
    pub excluded_ids: Vec<String>,
    pub mode: PeerGroupMode,
    pub tab: String,
}

pub struct UpdateConfig {
    pub protocols_list: PathBuf,
    pub pools_list: PathBuf,
    pub peer_groups: Vec<PeerGroupSpec>,
    pub chain_history_chain: String,
    pub drift_tolerance: f64,
    pub align: AlignMode,
}

/// One full landscape refresh: fetch, reconcile, aggregate, write. Linear
/// and sequential; the first upstream or shape failure aborts the run.
pub async fn run_update(
    client: &LlamaClient,
    store: &SheetsStore,
    cfg: &UpdateConfig,
) -> Result<(), BoxError> {
    let tabs = SheetNames::default();
    let rules = ExclusionRules::default();

    let slugs = load_id_list(&cfg.protocols_list, PROTOCOL_SLUG_COLUMN)?;
    let pool_ids = load_id_list(&cfg.pools_list, POOL_ID_COLUMN)?;

    // Current TVLs, written as millions next to the project ratings.
    let mut current_tvls = Vec::with_capacity(slugs.len());
    for slug in &slugs {
        current_tvls.push(client.current_tvl(slug).await?);
    }
    let tvls_m: Vec<String> = current_tvls
        .iter()
        .map(|tvl| (tvl.trunc() / 1_000_000.0).to_string())
        .collect();
    store
        .write_column(tabs.project_ratings, "C2", &tvls_m)
        .await?;

    // Full historical breakdowns: check the current snapshot against the
    // reported figure, then collapse the per-chain histories into one
    // series per protocol.
    let mut protocol_series: Vec<ProtocolSeries> = Vec::with_capacity(slugs.len());
    for (slug, reported) in slugs.iter().zip(&current_tvls) {
        let response = client.protocol(slug).await?;

        let (_, record) = reconcile(&response.name, &response.current_chain_tvls, *reported, &rules);
        let drift = record.relative_drift();
        if drift > cfg.drift_tolerance {
            warn!(
                "TVL reconciliation drift for {}: computed {:.0} vs reported {:.0} ({:.1}%)",
                record.protocol,
                record.computed_tvl,
                record.reported_tvl,
                drift * 100.0
            );
        } else {
            debug!(
                "TVL reconciliation for {}: computed {:.0} vs reported {:.0}",
                record.protocol, record.computed_tvl, record.reported_tvl
            );
        }

        protocol_series.push(history::aggregate_protocol_history(
            &response.name,
            &response.chain_tvls,
            &rules,
        )?);
    }
    let frames: Vec<SeriesFrame> = protocol_series.iter().map(SeriesFrame::from_protocol).collect();
    store
        .write_table(tabs.protocol_historicals, &concat_wide(&frames, cfg.align))
        .await?;

    // Raw pool yields universe.
    let pools = client.pools().await?;
    store
        .write_table(tabs.pool_yields, &pool_yields_table(&pools))
        .await?;

    // Per-pool chart histories, kept around for the peer groups below.
    let mut all_pools: HashMap<String, PoolSeries> = HashMap::new();
    let mut pool_frames = Vec::with_capacity(pool_ids.len());
    for id in &pool_ids {
        let chart = client.pool_chart(id).await?;
        let series = history::normalize_pool_chart(id, &chart)?;
        pool_frames.push(SeriesFrame::from_pool(&series));
        all_pools.insert(id.clone(), series);
    }
    store
        .write_table(tabs.pool_historicals, &concat_wide(&pool_frames, cfg.align))
        .await?;

    // Protocol metadata universe.
    let listings = client.protocols().await?;
    store
        .write_table(tabs.protocol_info, &protocol_info_table(&listings))
        .await?;

    // Whole-chain TVL history.
    let chain_points = client.chain_tvl_history(&cfg.chain_history_chain).await?;
    let chain_series = history::normalize_chain_history(&chain_points)?;
    let chain_frame = SeriesFrame::from_chain(&cfg.chain_history_chain, &chain_series);
    store
        .write_table(
            tabs.historical_chain_tvl,
            &concat_wide(&[chain_frame], cfg.align),
        )
        .await?;

    // Peer groups over the already-fetched pool universe.
    for group in &cfg.peer_groups {
        let configured = load_id_list(&group.list_path, POOL_ID_COLUMN)?;
        let members = apply_exclusions(&configured, &group.excluded_ids);

        let table = match group.mode {
            PeerGroupMode::Concat => {
                let mut member_frames = Vec::with_capacity(members.len());
                for id in &members {
                    let series = all_pools
                        .get(id)
                        .ok_or_else(|| LandscapeError::UnknownIdentifier(id.clone()))?;
                    member_frames.push(SeriesFrame::from_pool(series));
                }
                concat_wide(&member_frames, cfg.align)
            }
            PeerGroupMode::Index => {
                let composite = build_peer_index(&group.name, &members, &all_pools)?;
                concat_wide(&[SeriesFrame::from_pool(&composite)], cfg.align)
            }
        };
        store.write_table(&group.tab, &table).await?;
    }

    info!(
        "Update run complete: {} protocols, {} pools, {} peer groups",
        slugs.len(),
        pool_ids.len(),
        cfg.peer_groups.len()
    );
    Ok(())
}

fn optional_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn pool_yields_table(pools: &[PoolListing]) -> Table {
    let header = ["chain", "project", "symbol", "tvlUsd", "apy", "apyBase", "apyReward", "pool"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let rows = pools
        .iter()
        .map(|p| {
            vec![
                p.chain.clone(),
                p.project.clone(),
                p.symbol.clone(),
                p.tvl_usd.to_string(),
                optional_cell(p.apy),
                optional_cell(p.apy_base),
                optional_cell(p.apy_reward),
                p.pool.clone(),
            ]
        })
        .collect();

    Table { header, rows }
}

fn protocol_info_table(listings: &[ProtocolListing]) -> Table {
    let header = ["name", "slug", "category", "chains", "tvl"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let rows = listings
        .iter()
        .map(|p| {
            vec![
                p.name.clone(),
                p.slug.clone().unwrap_or_default(),
                p.category.clone().unwrap_or_default(),
                p.chains.join(", "),
                optional_cell(p.tvl),
            ]
        })
        .collect();

    Table { header, rows }
}
