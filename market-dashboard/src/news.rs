use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use common::{Article, DashboardError, ProviderError, Result, ScoredArticle, SentimentScores};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::data::ProviderResult;
use crate::pipeline::check_symbol;

/// Articles shown per symbol
pub const TOP_ARTICLES: usize = 5;

pub trait NewsSource: Send + Sync {
    fn name(&self) -> &str;

    /// Recent articles about `symbol`, newest first; none is a valid answer
    fn articles(&self, symbol: &str) -> ProviderResult<Vec<Article>>;
}

pub trait SentimentScorer: Send + Sync {
    fn score(&self, article: &Article) -> Result<SentimentScores>;
}

/// News source reading `<SYMBOL>.news.json` files (an array of articles)
#[derive(Debug, Clone)]
pub struct JsonNewsSource {
    dir: PathBuf,
}

impl JsonNewsSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl NewsSource for JsonNewsSource {
    fn name(&self) -> &str {
        "news-file"
    }

    fn articles(&self, symbol: &str) -> ProviderResult<Vec<Article>> {
        let path = self.dir.join(format!("{}.news.json", symbol));
        if !path.is_file() {
            return Ok(vec![]);
        }
        let parse_error = |detail: String| ProviderError::Parse {
            provider: self.name().to_string(),
            detail,
        };
        let file = File::open(&path).map_err(|e| parse_error(e.to_string()))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| parse_error(e.to_string()))
    }
}

/// Precomputed scores read from a `sentiment.json` file: an object mapping
/// article url to `{compound, positive, negative, neutral}`
#[derive(Debug, Clone, Default)]
pub struct JsonSentimentScorer {
    scores: HashMap<String, SentimentScores>,
}

impl JsonSentimentScorer {
    pub const FILE_NAME: &'static str = "sentiment.json";

    /// Load `<dir>/sentiment.json`; `None` when the file does not exist
    pub fn open(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(Self::FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        let file = File::open(&path)?;
        let scores: HashMap<String, SentimentScores> =
            serde_json::from_reader(BufReader::new(file))?;
        debug!(path = %path.display(), scores = scores.len(), "sentiment scores loaded");
        Ok(Some(Self { scores }))
    }
}

impl SentimentScorer for JsonSentimentScorer {
    fn score(&self, article: &Article) -> Result<SentimentScores> {
        let raw = self.scores.get(&article.url).ok_or_else(|| {
            DashboardError::InvalidParameter(format!("no sentiment score for {}", article.url))
        })?;
        // Raw file values, validated and renormalised here
        SentimentScores::new(raw.compound, raw.positive, raw.negative, raw.neutral)
    }
}

/// Fetch articles for a user-entered symbol
pub fn fetch_news(source: &dyn NewsSource, symbol: &str) -> Result<Vec<Article>> {
    let symbol = check_symbol(symbol)?;
    source.articles(&symbol).map_err(|e| {
        warn!(symbol = %symbol, error = %e, "news source failed");
        e.into()
    })
}

/// Attach sentiment to each article; articles that fail scoring are kept
/// without it
pub fn enrich_articles(articles: Vec<Article>, scorer: &dyn SentimentScorer) -> Vec<ScoredArticle> {
    articles
        .into_par_iter()
        .map(|article| {
            let sentiment = match scorer.score(&article) {
                Ok(scores) => Some(scores),
                Err(e) => {
                    warn!(url = %article.url, error = %e, "sentiment scoring failed");
                    None
                }
            };
            ScoredArticle { article, sentiment }
        })
        .collect()
}

pub fn top_articles<T>(articles: &[T]) -> &[T] {
    &articles[..articles.len().min(TOP_ARTICLES)]
}

/// The top articles for `symbol`, scored when a scorer is available
pub fn latest_news(
    source: &dyn NewsSource,
    scorer: Option<&dyn SentimentScorer>,
    symbol: &str,
) -> Result<Vec<ScoredArticle>> {
    let articles = fetch_news(source, symbol)?;
    let top = top_articles(&articles).to_vec();
    Ok(match scorer {
        Some(scorer) => enrich_articles(top, scorer),
        None => top
            .into_iter()
            .map(|article| ScoredArticle {
                article,
                sentiment: None,
            })
            .collect(),
    })
}

/// Mean compound score over the articles that were scored
pub fn average_compound(articles: &[ScoredArticle]) -> Option<f64> {
    let scores: Vec<f64> = articles
        .iter()
        .filter_map(|a| a.sentiment.map(|s| s.compound))
        .collect();
    if scores.is_empty() {
        return None;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    debug!(scored = scores.len(), total = articles.len(), mean, "average sentiment");
    Some(mean)
}
