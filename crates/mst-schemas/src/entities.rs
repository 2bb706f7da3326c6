use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(Side::Buy),
            "SELL" => Some(Side::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Position-sizing risk multiplier, per the position-sizing formula.
    pub fn multiplier(&self) -> f64 {
        match self {
            RiskLevel::Low => 0.5,
            RiskLevel::Medium => 0.75,
            RiskLevel::High => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(RiskLevel::Low),
            "MEDIUM" => Some(RiskLevel::Medium),
            "HIGH" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Completed,
    Failed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Completed => "COMPLETED",
            TradeStatus::Failed => "FAILED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "COMPLETED" => Some(TradeStatus::Completed),
            "FAILED" => Some(TradeStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BacktestStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl BacktestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BacktestStatus::Pending => "PENDING",
            BacktestStatus::Running => "RUNNING",
            BacktestStatus::Completed => "COMPLETED",
            BacktestStatus::Failed => "FAILED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BacktestStatus::Pending),
            "RUNNING" => Some(BacktestStatus::Running),
            "COMPLETED" => Some(BacktestStatus::Completed),
            "FAILED" => Some(BacktestStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Conservative-bias quantification: negative news is weighted 1.5x
    /// more heavily than positive news of the same nominal strength.
    pub fn quantify(&self) -> f64 {
        match self {
            SentimentLabel::Positive => 1.0,
            SentimentLabel::Neutral => 0.0,
            SentimentLabel::Negative => -1.0 * 1.5,
        }
    }

    /// Case-insensitive parse, normalized to the three known labels.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "positive" => Some(SentimentLabel::Positive),
            "neutral" => Some(SentimentLabel::Neutral),
            "negative" => Some(SentimentLabel::Negative),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "POSITIVE",
            SentimentLabel::Neutral => "NEUTRAL",
            SentimentLabel::Negative => "NEGATIVE",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        Self::parse_loose(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternType {
    Winning,
    Losing,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Winning => "WINNING",
            PatternType::Losing => "LOSING",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "WINNING" => Some(PatternType::Winning),
            "LOSING" => Some(PatternType::Losing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    LowVol,
    Normal,
    HighVol,
}

impl MarketRegime {
    pub fn from_vix(vix: f64) -> Self {
        if vix < 20.0 {
            MarketRegime::LowVol
        } else if vix <= 30.0 {
            MarketRegime::Normal
        } else {
            MarketRegime::HighVol
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketRegime::LowVol => "LOW_VOL",
            MarketRegime::Normal => "NORMAL",
            MarketRegime::HighVol => "HIGH_VOL",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "LOW_VOL" => Some(MarketRegime::LowVol),
            "NORMAL" => Some(MarketRegime::Normal),
            "HIGH_VOL" => Some(MarketRegime::HighVol),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LearningSessionStatus {
    Running,
    Completed,
    Failed,
}

impl LearningSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningSessionStatus::Running => "RUNNING",
            LearningSessionStatus::Completed => "COMPLETED",
            LearningSessionStatus::Failed => "FAILED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "RUNNING" => Some(LearningSessionStatus::Running),
            "COMPLETED" => Some(LearningSessionStatus::Completed),
            "FAILED" => Some(LearningSessionStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub published_date: DateTime<Utc>,
    pub source: String,
    pub url: Option<String>,
    pub asset_type: String,
    pub created_at: DateTime<Utc>,
}

pub const NEWS_TITLE_MAX: usize = 500;
pub const NEWS_DESCRIPTION_MAX: usize = 1000;
pub const NEWS_AUTHOR_MAX: usize = 200;
pub const NEWS_SOURCE_MAX: usize = 100;
pub const NEWS_URL_MAX: usize = 500;

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[derive(Debug, Clone)]
pub struct NewsArticleDraft {
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub published_date: DateTime<Utc>,
    pub source: String,
    pub url: Option<String>,
    pub asset_type: String,
}

impl NewsArticleDraft {
    /// Apply the storage-layer length invariants from §3 of the data model.
    pub fn normalized(mut self) -> Self {
        self.title = truncate(&self.title, NEWS_TITLE_MAX);
        self.description = self.description.map(|d| truncate(&d, NEWS_DESCRIPTION_MAX));
        self.author = self.author.map(|a| truncate(&a, NEWS_AUTHOR_MAX));
        self.source = truncate(&self.source, NEWS_SOURCE_MAX);
        self.url = self.url.map(|u| truncate(&u, NEWS_URL_MAX));
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub id: Uuid,
    pub article_id: Uuid,
    pub label: SentimentLabel,
    pub score: f64,
    pub reasoning: String,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPrice {
    pub symbol: String,
    pub price: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountHolding {
    pub user_id: String,
    pub symbol: String,
    pub quantity: i64,
    pub average_price: f64,
    pub last_price: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoTradeConfig {
    pub user_id: String,
    pub is_enabled: bool,
    pub max_investment_amount: f64,
    pub max_position_size: f64,
    pub risk_level: RiskLevel,
    pub buy_threshold: i32,
    pub sell_threshold: i32,
    pub stop_loss_percentage: f64,
    pub daily_loss_limit: Option<f64>,
    pub trading_start_time: NaiveTime,
    pub trading_end_time: NaiveTime,
    pub allowed_symbols: Option<Vec<String>>,
    pub excluded_symbols: Vec<String>,
    pub notification_target: Option<String>,
}

impl AutoTradeConfig {
    /// `sell_threshold < buy_threshold` is a data-model invariant.
    pub fn thresholds_valid(&self) -> bool {
        self.sell_threshold < self.buy_threshold
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeHistory {
    pub id: Uuid,
    pub user_id: String,
    pub broker_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: i64,
    pub submitted_price: f64,
    pub executed_price: f64,
    pub total_amount: f64,
    pub profit_loss: Option<f64>,
    pub status: TradeStatus,
    pub signal_ratio: i32,
    pub reasoning: String,
    /// VIX reading used by the signal that produced this trade, when a BUY
    /// recorded it; feeds the learning subsystem's market-regime tag.
    pub vix_at_entry: Option<f64>,
    pub executed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisCache {
    pub cache_key: String,
    pub result_json: serde_json::Value,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRun {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub strategy_config: serde_json::Value,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub initial_capital: f64,
    pub status: BacktestStatus,
    pub final_capital: Option<f64>,
    pub total_return: Option<f64>,
    pub total_trades: Option<i32>,
    pub winning_trades: Option<i32>,
    pub losing_trades: Option<i32>,
    pub win_rate: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub id: Uuid,
    pub backtest_run_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub quantity: i64,
    pub price: f64,
    pub total_amount: f64,
    pub signal_ratio: i32,
    pub reasoning: String,
    pub profit_loss: Option<f64>,
    pub profit_loss_percentage: Option<f64>,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingSnapshot {
    pub symbol: String,
    pub quantity: i64,
    pub avg_price: f64,
    pub current_price: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestDailyStats {
    pub id: Uuid,
    pub backtest_run_id: Uuid,
    pub date: DateTime<Utc>,
    pub portfolio_value: f64,
    pub cash_balance: f64,
    pub invested_amount: f64,
    pub daily_return: Option<f64>,
    pub cumulative_return: f64,
    pub drawdown: f64,
    pub holdings: Vec<HoldingSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradePattern {
    pub id: Uuid,
    pub user_id: String,
    pub symbol: String,
    pub entry_trade_id: Uuid,
    pub exit_trade_id: Uuid,
    pub entry_signal_ratio: i32,
    pub holding_duration_hours: f64,
    pub realized_pnl: f64,
    pub realized_pnl_pct: f64,
    pub market_regime: MarketRegime,
    pub pattern_type: PatternType,
    pub extracted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedStrategyParams {
    pub buy_threshold: i32,
    pub sell_threshold: i32,
    pub stop_loss_percentage: f64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedStrategy {
    pub id: Uuid,
    pub strategy_name: String,
    pub version: i32,
    pub params: LearnedStrategyParams,
    pub training_samples: i32,
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSession {
    pub id: Uuid,
    pub session_type: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub patterns_extracted: i32,
    pub patterns_analyzed: i32,
    pub status: LearningSessionStatus,
    pub produced_strategy_name: Option<String>,
    pub produced_strategy_version: Option<i32>,
    pub error_message: Option<String>,
}
