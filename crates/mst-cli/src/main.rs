use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mst")]
#[command(about = "market-sentiment trading platform CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> overrides...)
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },

    /// Run a single backtest from a layered config file
    Backtest {
        #[command(subcommand)]
        cmd: BacktestCmd,
    },

    /// News ingestion commands
    News {
        #[command(subcommand)]
        cmd: NewsCmd,
    },

    /// Learning pipeline commands
    Learn {
        #[command(subcommand)]
        cmd: LearnCmd,
    },

    /// Query a running daemon's metrics snapshot
    Metrics {
        #[command(subcommand)]
        cmd: MetricsCmd,
    },

    /// Daemon process commands
    Daemon {
        #[command(subcommand)]
        cmd: DaemonCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,
    Migrate,
}

#[derive(Subcommand)]
enum BacktestCmd {
    Run {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum NewsCmd {
    Collect {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum LearnCmd {
    Run {
        #[arg(long, default_value = "default")]
        strategy_name: String,
    },
}

#[derive(Subcommand)]
enum MetricsCmd {
    Show {
        /// Base URL of a running mst-daemon (health/status/metrics surface)
        #[arg(long, default_value = "http://127.0.0.1:8900")]
        daemon_url: String,
    },
}

#[derive(Subcommand)]
enum DaemonCmd {
    /// Boots C15 in this process: starts the scheduler, hosts the HTTP
    /// surface, and runs until a shutdown signal arrives.
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    mst_observability::init_tracing(false);

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = mst_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = mst_db::status(&pool).await?;
                    println!("db_ok={} has_core_tables={}", s.ok, s.has_core_tables);
                }
                DbCmd::Migrate => {
                    mst_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { config_paths } => {
            let loaded = mst_config::load_layered_yaml(&config_paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Backtest { cmd } => match cmd {
            BacktestCmd::Run { config_paths } => {
                let loaded = mst_config::load_layered_yaml(&config_paths)?;
                let pool = mst_db::connect_from_env().await?;
                let request = backtest_request_from_config(&loaded.config_json)?;

                match mst_backtest::run_backtest(&pool, request).await {
                    Ok(run_id) => {
                        println!("run_id={run_id}");
                        println!("status=COMPLETED");
                    }
                    Err(err) => {
                        eprintln!("backtest run failed: {}", err.message());
                        std::process::exit(1);
                    }
                }
            }
        },

        Commands::News { cmd } => match cmd {
            NewsCmd::Collect { config_paths } => {
                let loaded = mst_config::load_layered_yaml(&config_paths)?;
                let secrets = mst_config::secrets::resolve_secrets(&loaded.config_json, "PAPER")?;
                let api_key = secrets.news_api_key.context("MST_NEWS_API_KEY (or configured env var) is not set")?;
                let client = mst_news::NewsApiClient::new(api_key);
                let pool = mst_db::connect_from_env().await?;

                let query = mst_config::cfg_str(&loaded.config_json, "/news/queries/0", "stock market");
                let asset_type = "stock";
                let page_size = mst_config::cfg_i64(&loaded.config_json, "/news/page_size", 20) as u32;

                let stats = mst_news::collect(&pool, &client, query, asset_type, page_size).await?;
                println!(
                    "fetched={} inserted={} duplicates={} dropped_missing_body={}",
                    stats.fetched, stats.inserted, stats.duplicates, stats.dropped_missing_body
                );
            }
        },

        Commands::Learn { cmd } => match cmd {
            LearnCmd::Run { strategy_name } => {
                let pool = mst_db::connect_from_env().await?;
                let strategy = mst_learning::run_learning_session(&pool, &strategy_name).await?;
                println!("strategy_name={}", strategy.strategy_name);
                println!("version={}", strategy.version);
                println!("training_samples={}", strategy.training_samples);
            }
        },

        Commands::Metrics { cmd } => match cmd {
            MetricsCmd::Show { daemon_url } => {
                let url = format!("{}/v1/metrics", daemon_url.trim_end_matches('/'));
                let body = reqwest::get(&url)
                    .await
                    .with_context(|| format!("requesting {url}"))?
                    .text()
                    .await?;
                println!("{body}");
            }
        },

        Commands::Daemon { cmd } => match cmd {
            DaemonCmd::Run => {
                mst_daemon::run().await?;
            }
        },
    }

    Ok(())
}

/// Builds a backtest request from a layered config document. Every field
/// has a documented default except `symbols`, which must be non-empty.
fn backtest_request_from_config(config_json: &serde_json::Value) -> Result<mst_backtest::BacktestRequest> {
    let symbols = mst_config::cfg_str_list(config_json, "/backtest/symbols");
    if symbols.is_empty() {
        anyhow::bail!("config key /backtest/symbols must list at least one symbol");
    }

    let user_id = mst_config::cfg_str(config_json, "/backtest/user_id", "cli").to_string();
    let name = mst_config::cfg_str(config_json, "/backtest/name", "cli-backtest").to_string();

    let start_date = parse_date(config_json, "/backtest/start_date")
        .context("config key /backtest/start_date must be an RFC3339 timestamp")?;
    let end_date = parse_date(config_json, "/backtest/end_date")
        .context("config key /backtest/end_date must be an RFC3339 timestamp")?;

    let signal_mode = match mst_config::cfg_str(config_json, "/backtest/signal_mode", "simplified") {
        "full_pipeline" => mst_backtest::BacktestSignalMode::FullPipeline,
        _ => mst_backtest::BacktestSignalMode::Simplified,
    };

    let default_sim = mst_backtest::SimConfig::default();
    let config = mst_backtest::SimConfig {
        initial_capital: mst_config::cfg_f64(config_json, "/backtest/initial_capital", default_sim.initial_capital),
        max_position_size: mst_config::cfg_f64(config_json, "/backtest/max_position_size", default_sim.max_position_size),
        cash_fraction_per_trade: mst_config::cfg_f64(
            config_json,
            "/backtest/cash_fraction_per_trade",
            default_sim.cash_fraction_per_trade,
        ),
        stop_loss_percentage: mst_config::cfg_f64(config_json, "/backtest/stop_loss_percentage", default_sim.stop_loss_percentage),
        buy_threshold: mst_config::cfg_i64(config_json, "/backtest/buy_threshold", default_sim.buy_threshold as i64) as i32,
        sell_threshold: mst_config::cfg_i64(config_json, "/backtest/sell_threshold", default_sim.sell_threshold as i64) as i32,
    };

    Ok(mst_backtest::BacktestRequest { user_id, name, symbols, start_date, end_date, config, signal_mode })
}

fn parse_date(config_json: &serde_json::Value, pointer: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    let raw = mst_config::cfg_str_opt(config_json, pointer).context("missing date")?;
    Ok(chrono::DateTime::parse_from_rfc3339(raw)?.with_timezone(&chrono::Utc))
}
