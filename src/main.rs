//! aqtraffic - terminal front end for the air-quality / traffic backend
//!
//! CLI commands:
//! - bands: Print a band table
//! - classify: Classify one index value
//! - color: Continuous color for one air-quality value
//! - map: Fetch locations and print the ones visible under the band switches
//! - ranking: Poll the leaderboard until Ctrl-C
//! - chart: Print hourly series for one location

use aqtraffic::chart;
use aqtraffic::client::ApiClient;
use aqtraffic::config::{Config, Secrets};
use aqtraffic::filter::MapFilter;
use aqtraffic::logging;
use aqtraffic::model::Metric;
use aqtraffic::quality::BandTable;
use aqtraffic::ranking::{PollerOptions, RankingBoard, RankingPoller};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aqtraffic")]
#[command(about = "Air quality and traffic map, rankings and charts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to aqtraffic.yaml config
    #[arg(short, long, default_value = "aqtraffic.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a band table
    Bands {
        /// Traffic levels instead of air quality
        #[arg(long)]
        traffic: bool,
    },

    /// Classify one index value
    Classify {
        value: f64,

        #[arg(long)]
        traffic: bool,
    },

    /// Continuous color for one air-quality value
    Color { value: f64 },

    /// Fetch locations and print the visible ones
    Map {
        /// Switch a band off (repeatable)
        #[arg(long)]
        disable: Vec<String>,

        /// Place-name search instead of the full list
        #[arg(long)]
        search: Option<String>,
    },

    /// Poll the leaderboard until Ctrl-C
    Ranking {
        /// air or traffic
        #[arg(short, long, default_value = "air")]
        option: Metric,

        /// Print the first board and exit
        #[arg(long)]
        once: bool,
    },

    /// Print hourly series for one location
    Chart {
        #[arg(long)]
        id: u64,

        /// YYYY-MM-DD, today when omitted
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let secrets = Secrets::load();
    let _log_guard = logging::init_logging(&secrets.log_dir)?;
    tracing::info!("aqtraffic starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    let mut config = Config::load_or_default(&cli.config)?;
    config.apply_secrets(&secrets);
    tracing::info!(
        "Config loaded: {} air bands, {} traffic bands, api={}",
        config.air_bands.bands().len(),
        config.traffic_bands.bands().len(),
        config.api.base_url
    );

    match cli.command {
        Commands::Bands { traffic } => {
            print_bands(if traffic { &config.traffic_bands } else { &config.air_bands });
        }

        Commands::Classify { value, traffic } => {
            let table = if traffic { &config.traffic_bands } else { &config.air_bands };
            let band = table.classify(value);
            println!("{} {}", band.key, band.color);
        }

        Commands::Color { value } => {
            println!("{}", config.color_scale.color_for(value));
        }

        Commands::Map { disable, search } => {
            let client = api_client(&config, &secrets)?;
            show_map(&config, &client, &disable, search.as_deref()).await?;
        }

        Commands::Ranking { option, once } => {
            let client = api_client(&config, &secrets)?;
            poll_ranking(&config, client, option, once).await;
        }

        Commands::Chart { id, date } => {
            let client = api_client(&config, &secrets)?;
            show_chart(&config, &client, id, date).await?;
        }
    }

    Ok(())
}

fn api_client(config: &Config, secrets: &Secrets) -> anyhow::Result<ApiClient> {
    let client = ApiClient::new(
        &config.api.base_url,
        config.api_timeout(),
        secrets.api_token.clone(),
    )?;
    tracing::debug!("API client ready: {}", client.base_url());
    Ok(client)
}

fn print_bands(table: &BandTable) {
    for band in table.bands() {
        println!("  {:<16} {:>8} - {:<8} {}", band.key, band.min, band.max, band.color);
    }
}

/// Fetch locations, apply the switches and print the visible set
async fn show_map(
    config: &Config,
    client: &ApiClient,
    disable: &[String],
    search: Option<&str>,
) -> anyhow::Result<()> {
    let readings = client.locations(Metric::Air).await?;
    tracing::info!("Fetched {} locations", readings.len());

    let mut filter = MapFilter::new(config.air_bands.clone(), config.debounce());
    let mut visible_rx = filter.subscribe();

    filter.set_readings(readings);
    for key in disable {
        if filter.table().get(key).is_none() {
            tracing::warn!("Unknown band '{}', ignoring", key);
            continue;
        }
        filter.set_enabled(key, false);
    }

    if let Some(text) = search {
        let hits = filter.search(text, config.filter.search_limit);
        println!("Matches for '{}' ({}):", text, hits.len());
        for r in hits {
            println!("  - {} [{}] ({:.5}, {:.5})", r.name, r.id, r.latitude, r.longitude);
        }
        return Ok(());
    }

    visible_rx.changed().await?;
    let visible = visible_rx.borrow().clone();

    println!("Bands:");
    for (key, count) in filter.counts() {
        let state = if filter.state().is_enabled(&key) { "on " } else { "off" };
        println!("  [{}] {:<16} {} locations", state, key, count);
    }
    println!();
    println!("{} of {} locations visible:", visible.len(), filter.readings().len());
    for r in visible.iter() {
        let band = filter.table().classify(r.quality_index);
        println!("  - {} [{}] index={} {} {}", r.name, r.id, r.quality_index, band.key, band.color);
    }

    Ok(())
}

async fn poll_ranking(config: &Config, client: ApiClient, metric: Metric, once: bool) {
    let options = PollerOptions {
        metric,
        interval: config.ranking_interval(),
        reverse: config.ranking.reverse,
    };
    let table = match metric {
        Metric::Air => config.air_bands.clone(),
        Metric::Traffic => config.traffic_bands.clone(),
    };

    let handle = RankingPoller::spawn(client, options);
    let mut rx = handle.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received, stopping");
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let board = rx.borrow_and_update().clone();
                print_board(&board, &table, config.ranking.top);
                if once {
                    break;
                }
            }
        }
    }

    handle.stop().await;
}

fn print_board(board: &RankingBoard, table: &BandTable, top: usize) {
    println!();
    println!("== {} ranking ==", board.metric.as_str());
    if let Some(at) = board.updated_at {
        println!("updated {}", at.with_timezone(&Local).format("%H:%M:%S %d/%m/%Y"));
    }
    if let Some(err) = &board.last_error {
        println!("(stale: {})", err);
    }
    let shown = board.top(top).len();
    for (i, (entry, color)) in board.colored(table).into_iter().take(shown).enumerate() {
        println!("  {:>2}. {:<32} {:>8.2} {}", i + 1, entry.location, entry.value, color);
    }
}

async fn show_chart(
    config: &Config,
    client: &ApiClient,
    id: u64,
    date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let data = client.traffic_air_data(id, date).await?;
    let now = Local::now().naive_local();
    let start = date.or_else(|| data.day()).unwrap_or(now.date());
    let (labels, records) = data.hourly();

    let chart = chart::build_series(
        &records,
        &labels,
        start,
        now,
        &config.air_bands,
        &config.traffic_bands,
    );

    println!("{} ({})", data.name, start);
    for series in [&chart.air, &chart.traffic] {
        println!("{} (axis max {:.1}):", series.name, series.suggested_max);
        for p in &series.points {
            println!("  {} {:>8.2} {} border={}", p.label, p.value, p.color, p.border);
        }
    }

    Ok(())
}
