//! News sentiment aggregation

use crate::providers::types::NewsFeed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const TOP_TICKERS: usize = 10;
const MAX_ITEMS: usize = 100;

/// Average sentiment for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerScore {
    pub ticker: String,
    pub avg_sentiment: f64,
}

/// Headline kept in the summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: Option<String>,
    pub url: Option<String>,
    pub time_published: Option<String>,
    pub source: Option<String>,
    pub overall_sentiment_score: Option<f64>,
    pub overall_sentiment_label: Option<String>,
}

/// Aggregated sentiment over a news feed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewsSummary {
    pub overall_average_sentiment: Option<f64>,
    pub ticker_average_sentiment: BTreeMap<String, f64>,
    pub top_positive: Vec<TickerScore>,
    pub top_negative: Vec<TickerScore>,
    pub items: Vec<NewsItem>,
}

impl NewsSummary {
    /// Average sentiment for a symbol, if any article mentioned it
    pub fn sentiment_for(&self, symbol: &str) -> Option<f64> {
        self.ticker_average_sentiment.get(symbol).copied()
    }
}

/// Aggregate overall and per-ticker sentiment
pub fn aggregate_news_sentiment(feed: &NewsFeed) -> NewsSummary {
    let mut overall = Vec::new();
    let mut by_ticker: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for article in &feed.articles {
        if let Some(score) = article.overall_sentiment_score {
            overall.push(score);
        }
        for entry in &article.ticker_sentiment {
            if let Some(score) = entry.score {
                by_ticker.entry(entry.ticker.clone()).or_default().push(score);
            }
        }
    }

    let ticker_average_sentiment: BTreeMap<String, f64> = by_ticker
        .into_iter()
        .filter_map(|(ticker, scores)| mean(&scores).map(|avg| (ticker, avg)))
        .collect();

    let mut ranked: Vec<TickerScore> = ticker_average_sentiment
        .iter()
        .map(|(ticker, avg)| TickerScore {
            ticker: ticker.clone(),
            avg_sentiment: *avg,
        })
        .collect();

    ranked.sort_by(|a, b| b.avg_sentiment.total_cmp(&a.avg_sentiment));
    let top_positive = ranked.iter().take(TOP_TICKERS).cloned().collect();
    ranked.sort_by(|a, b| a.avg_sentiment.total_cmp(&b.avg_sentiment));
    let top_negative = ranked.into_iter().take(TOP_TICKERS).collect();

    let items = feed
        .articles
        .iter()
        .take(MAX_ITEMS)
        .map(|a| NewsItem {
            title: a.title.clone(),
            url: a.url.clone(),
            time_published: a.time_published.clone(),
            source: a.source.clone(),
            overall_sentiment_score: a.overall_sentiment_score,
            overall_sentiment_label: a.overall_sentiment_label.clone(),
        })
        .collect();

    NewsSummary {
        overall_average_sentiment: mean(&overall),
        ticker_average_sentiment,
        top_positive,
        top_negative,
        items,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
