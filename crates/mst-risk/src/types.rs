use mst_schemas::Side;

#[derive(Debug, Clone)]
pub struct TradeRequest {
    pub symbol: String,
    pub side: Side,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct HeldPosition<'a> {
    pub symbol: &'a str,
    pub quantity: i64,
    pub average_price: f64,
}

/// A read-only view of one user's account, as the risk engine needs it.
/// Deliberately not the persistence record — the data-access layer builds
/// this from `AccountHolding` rows plus the broker-reported cash balance.
#[derive(Debug, Clone)]
pub struct HoldingsSnapshot<'a> {
    pub cash_balance: f64,
    pub invested_amount: f64,
    pub holdings: Vec<HeldPosition<'a>>,
}

impl<'a> HoldingsSnapshot<'a> {
    pub fn find(&self, symbol: &str) -> Option<&HeldPosition<'a>> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    TradingDisabled,
    OutsideTradingHours,
    SymbolNotAllowed { symbol: String },
    DailyLossLimitExceeded { realized_pnl: f64, limit: f64 },
    PositionSizeExceeded { trade_value: f64, max_position_size: f64 },
    InvestmentLimitExceeded { would_be_invested: f64, max_investment: f64 },
    InsufficientCash { cash: f64, needed: f64 },
    NoHoldingForSymbol { symbol: String },
    InsufficientShares { held: i64, requested: i64 },
}

impl RejectReason {
    pub fn message(&self) -> String {
        match self {
            RejectReason::TradingDisabled => "Auto-trading is disabled".to_string(),
            RejectReason::OutsideTradingHours => "Outside of configured trading hours".to_string(),
            RejectReason::SymbolNotAllowed { symbol } => {
                format!("Symbol {symbol} is not in allowed list or is excluded")
            }
            RejectReason::DailyLossLimitExceeded { realized_pnl, limit } => format!(
                "Daily loss limit exceeded: realized P/L {realized_pnl:.2} below -{limit:.2}"
            ),
            RejectReason::PositionSizeExceeded { trade_value, max_position_size } => format!(
                "Trade value {trade_value:.2} exceeds max position size {max_position_size:.2}"
            ),
            RejectReason::InvestmentLimitExceeded { would_be_invested, max_investment } => format!(
                "Total investment would exceed limit: {would_be_invested:.2} > {max_investment:.2}"
            ),
            RejectReason::InsufficientCash { cash, needed } => {
                format!("Insufficient cash balance: {cash:.2} < {needed:.2}")
            }
            RejectReason::NoHoldingForSymbol { symbol } => {
                format!("No holdings found for symbol {symbol}")
            }
            RejectReason::InsufficientShares { held, requested } => {
                format!("Insufficient shares: have {held}, trying to sell {requested}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Approved,
    Rejected(RejectReason),
}

impl ValidationOutcome {
    pub fn is_approved(&self) -> bool {
        matches!(self, ValidationOutcome::Approved)
    }

    /// `(ok, reason)` pair for callers that want a flat tuple instead of
    /// matching on the enum.
    pub fn as_pair(&self) -> (bool, String) {
        match self {
            ValidationOutcome::Approved => (true, "approved".to_string()),
            ValidationOutcome::Rejected(r) => (false, r.message()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StopLossOutcome {
    NoPosition,
    WithinThreshold,
    Triggered { quantity: i64, loss_pct: f64, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarketCondition {
    Normal,
    /// VIX in (30, 40]: elevated but not yet abnormal.
    Elevated { vix: f64 },
    Abnormal { vix: f64 },
}

impl MarketCondition {
    pub fn is_abnormal(&self) -> bool {
        matches!(self, MarketCondition::Abnormal { .. })
    }
}

#[derive(Debug, Clone)]
pub struct EmergencyStop {
    pub reason: String,
}
