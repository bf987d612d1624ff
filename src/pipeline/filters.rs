use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::{NexusError, Result};
use crate::core::types::Article;

/// Static topic expansion table. Matching is word-boundary only; a topic key
/// expands to itself plus its related terms, multi-word terms match as a
/// phrase.
pub static TOPIC_DICTIONARY: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
    map.insert(
        "ai",
        vec![
            "ai",
            "artificial intelligence",
            "machine learning",
            "deep learning",
            "neural network",
            "llm",
            "gpt",
            "chatgpt",
            "gemini",
            "claude",
            "openai",
            "anthropic",
            "transformer",
            "generative ai",
            "agi",
        ],
    );
    map.insert(
        "tech",
        vec![
            "tech",
            "technology",
            "software",
            "hardware",
            "semiconductor",
            "chip",
            "cloud computing",
            "saas",
            "cybersecurity",
            "quantum computing",
            "robotics",
            "data center",
            "silicon valley",
            "gadget",
        ],
    );
    map.insert(
        "crypto",
        vec![
            "crypto",
            "cryptocurrency",
            "bitcoin",
            "ethereum",
            "blockchain",
            "defi",
            "nft",
            "stablecoin",
            "altcoin",
            "web3",
            "binance",
            "coinbase",
            "solana",
        ],
    );
    map.insert(
        "startup",
        vec![
            "startup",
            "startups",
            "venture capital",
            "seed round",
            "series a",
            "series b",
            "funding round",
            "unicorn",
            "accelerator",
            "incubator",
            "founder",
            "angel investor",
        ],
    );
    map.insert(
        "gaming",
        vec![
            "gaming",
            "video game",
            "esports",
            "playstation",
            "xbox",
            "nintendo",
            "steam",
            "console",
            "gamer",
            "game studio",
            "twitch",
            "multiplayer",
        ],
    );
    map.insert(
        "cricket",
        vec![
            "cricket",
            "ipl",
            "test match",
            "odi",
            "t20",
            "wicket",
            "batsman",
            "bowler",
            "innings",
            "bcci",
            "run chase",
            "century",
        ],
    );
    map.insert(
        "finance",
        vec![
            "finance",
            "stock market",
            "sensex",
            "nifty",
            "nasdaq",
            "ipo",
            "earnings",
            "interest rate",
            "inflation",
            "bond",
            "mutual fund",
            "dividend",
            "hedge fund",
            "federal reserve",
        ],
    );
    map.insert(
        "sports",
        vec![
            "sports",
            "football",
            "soccer",
            "basketball",
            "tennis",
            "olympics",
            "championship",
            "tournament",
            "league",
            "athlete",
            "fifa",
            "nba",
            "grand slam",
        ],
    );
    map.insert(
        "politics",
        vec![
            "politics",
            "election",
            "parliament",
            "senate",
            "congress",
            "minister",
            "president",
            "prime minister",
            "policy",
            "legislation",
            "campaign",
            "ballot",
            "opposition",
        ],
    );
    map.insert(
        "health",
        vec![
            "health",
            "healthcare",
            "hospital",
            "vaccine",
            "disease",
            "medicine",
            "mental health",
            "fitness",
            "nutrition",
            "outbreak",
            "clinical trial",
            "wellness",
        ],
    );
    map.insert(
        "entertainment",
        vec![
            "entertainment",
            "movie",
            "film",
            "bollywood",
            "hollywood",
            "box office",
            "celebrity",
            "trailer",
            "netflix",
            "streaming",
            "music",
            "album",
            "web series",
        ],
    );
    map.insert(
        "education",
        vec![
            "education",
            "school",
            "university",
            "college",
            "exam",
            "curriculum",
            "scholarship",
            "student",
            "teacher",
            "admission",
            "degree",
            "online learning",
        ],
    );
    map.insert(
        "auto",
        vec![
            "auto",
            "automobile",
            "car",
            "electric vehicle",
            "ev",
            "suv",
            "sedan",
            "tesla",
            "hybrid",
            "motorcycle",
            "automaker",
            "recall",
        ],
    );
    map.insert(
        "travel",
        vec![
            "travel",
            "tourism",
            "flight",
            "airline",
            "airport",
            "hotel",
            "visa",
            "destination",
            "vacation",
            "cruise",
            "passport",
            "resort",
        ],
    );
    map.insert(
        "weather",
        vec![
            "weather",
            "forecast",
            "monsoon",
            "rainfall",
            "temperature",
            "heatwave",
            "cyclone",
            "storm",
            "flood",
            "humidity",
            "thunderstorm",
            "drought",
        ],
    );
    map.insert(
        "realestate",
        vec![
            "realestate",
            "real estate",
            "property",
            "housing",
            "mortgage",
            "rent",
            "apartment",
            "builder",
            "home loan",
            "realty",
            "housing market",
            "land price",
        ],
    );
    map.insert(
        "jobs",
        vec![
            "jobs",
            "hiring",
            "recruitment",
            "layoff",
            "layoffs",
            "employment",
            "unemployment",
            "salary",
            "workforce",
            "vacancy",
            "job market",
            "internship",
        ],
    );
    map.insert(
        "mobile",
        vec![
            "mobile",
            "smartphone",
            "android",
            "iphone",
            "ios",
            "5g",
            "samsung",
            "xiaomi",
            "oneplus",
            "pixel",
            "foldable",
            "handset",
        ],
    );
    map.insert(
        "laptop",
        vec![
            "laptop",
            "notebook",
            "macbook",
            "ultrabook",
            "chromebook",
            "thinkpad",
            "gaming laptop",
            "processor",
            "intel",
            "ryzen",
            "nvidia",
            "ssd",
        ],
    );
    map
});

/// Expand a topic key through the dictionary; unknown keys (and known keys
/// with an empty entry) fall back to a literal match of the key itself.
pub fn expand_topic(topic: &str) -> Vec<&'static str> {
    match TOPIC_DICTIONARY.get(topic) {
        Some(terms) if !terms.is_empty() => terms.clone(),
        _ => vec![],
    }
}

/// Compile a word-boundary matcher over a term list. Terms match
/// case-insensitively with Unicode-aware boundaries on both ends; interior
/// whitespace in a term matches any whitespace run. Substring matches are
/// impossible by construction.
pub fn keyword_regex<'a, I>(terms: I) -> Result<Regex>
where
    I: IntoIterator<Item = &'a str>,
{
    let alternatives: Vec<String> = terms
        .into_iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| {
            t.split_whitespace().map(regex::escape).collect::<Vec<_>>().join(r"\s+")
        })
        .collect();
    if alternatives.is_empty() {
        return Err(NexusError::BadInput("empty keyword list".into()));
    }
    let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
    Regex::new(&pattern).map_err(|e| NexusError::Internal(format!("keyword regex: {}", e)))
}

/// Compiled per-request filter set; filters are AND-composed.
pub struct FilterSpec {
    window_days: i64,
    /// Whether the caller bounded dates explicitly; only then are articles
    /// without a published date dropped.
    drop_undated: bool,
    topic_re: Option<Regex>,
    location_re: Option<Regex>,
}

impl FilterSpec {
    pub fn new(
        window_days: i64,
        window_explicit: bool,
        topic: Option<&str>,
        location: Option<&str>,
    ) -> Result<Self> {
        let topic_re = match topic {
            Some(t) => {
                let expanded = expand_topic(t);
                let terms: Vec<&str> =
                    if expanded.is_empty() { vec![t] } else { expanded };
                Some(keyword_regex(terms)?)
            }
            None => None,
        };
        let location_re = match location {
            Some(l) => Some(keyword_regex([l])?),
            None => None,
        };
        Ok(Self { window_days, drop_undated: window_explicit, topic_re, location_re })
    }

    pub fn window_days(&self) -> i64 {
        self.window_days
    }

    pub fn apply(&self, articles: Vec<Article>, now: DateTime<Utc>) -> Vec<Article> {
        articles.into_iter().filter(|a| self.matches(a, now)).collect()
    }

    fn matches(&self, article: &Article, now: DateTime<Utc>) -> bool {
        match article.published_at {
            Some(published) => {
                let age_days = (now - published.with_timezone(&Utc)).num_days();
                if age_days > self.window_days {
                    return false;
                }
            }
            None => {
                if self.drop_undated {
                    return false;
                }
            }
        }

        let haystack = || {
            let mut text =
                String::with_capacity(article.title.len() + article.summary.len() + 32);
            text.push_str(&article.title);
            text.push('\n');
            text.push_str(&article.summary);
            for tag in &article.tags {
                text.push('\n');
                text.push_str(tag);
            }
            text
        };

        if let Some(re) = &self.topic_re {
            if !re.is_match(&haystack()) {
                return false;
            }
        }
        if let Some(re) = &self.location_re {
            if !re.is_match(&haystack()) {
                return false;
            }
        }
        true
    }
}
