//! Keeps only articles that look financially relevant, matching the
//! original fetcher's substring-keyword gate.

pub const FINANCIAL_KEYWORDS: &[&str] = &[
    "stock", "market", "trading", "investor", "earnings", "revenue", "profit", "loss",
    "shares", "nasdaq", "nyse", "dow", "s&p", "ipo", "merger", "acquisition", "dividend",
    "fed", "federal reserve", "interest rate", "inflation", "economy", "economic", "gdp",
    "bull", "bear", "rally", "sell-off", "selloff", "volatility", "vix",
];

/// Case-insensitive substring match against the article's title and body.
pub fn is_financial_news(title: &str, content: &str) -> bool {
    let haystack = format!("{title} {content}").to_lowercase();
    FINANCIAL_KEYWORDS.iter().any(|kw| haystack.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_on_title_keyword() {
        assert!(is_financial_news("Fed raises interest rates", ""));
    }

    #[test]
    fn matches_on_content_keyword() {
        assert!(is_financial_news("Breaking news", "Shares of the company rallied today"));
    }

    #[test]
    fn rejects_unrelated_article() {
        assert!(!is_financial_news("Local weather update", "Sunny skies expected this weekend"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(is_financial_news("NASDAQ hits new high", ""));
    }
}
