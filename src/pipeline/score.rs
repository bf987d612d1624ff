use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::types::Article;
use crate::pipeline::filters::{keyword_regex, TOPIC_DICTIONARY};

/// Business vocabulary for the keyword-richness component; the AI and tech
/// lists come from the topic dictionary.
static BUSINESS_TERMS: &[&str] = &[
    "business",
    "market",
    "markets",
    "revenue",
    "profit",
    "earnings",
    "merger",
    "acquisition",
    "ipo",
    "investment",
    "investor",
    "economy",
    "shares",
    "stock",
    "funding",
    "valuation",
];

static NUMERIC_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\d+(\.\d+)?[%BMK]?").expect("numeric token regex"));

/// Phrasings that correlate with filler and clickbait. Matching any pattern
/// costs a single flat penalty.
pub static LOW_QUALITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(optimistic|pessimistic)\s+about\b",
        r"(?i)\beyes\s+(on|for)\b",
        r"(?i)\b(may|could|might)\s+be\b",
        r"(?i)\byou\s+won'?t\s+believe\b",
        r"(?i)\bhere'?s\s+why\b",
        r"(?i)\bwhat\s+happens\s+next\b",
        r"(?i)\bgoes?\s+viral\b",
        r"(?i)\bshocking\b",
        r"(?i)\bthis\s+one\s+trick\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("low quality pattern"))
    .collect()
});

static RICHNESS_RE: Lazy<Regex> = Lazy::new(|| {
    let mut terms: Vec<&str> = Vec::new();
    for key in ["ai", "tech"] {
        if let Some(list) = TOPIC_DICTIONARY.get(key) {
            terms.extend(list.iter().copied());
        }
    }
    terms.extend(BUSINESS_TERMS.iter().copied());
    keyword_regex(terms).expect("richness regex")
});

const PENALTY: f64 = 15.0;
const SUMMARY_FULL_LEN: f64 = 600.0;

/// Score one article in [0,100]: informativeness (0-40), source rank (0-20),
/// keyword richness (0-30), recency (0-10), minus a flat low-quality
/// penalty.
pub fn score_article(article: &Article, site_priority: Option<u32>, now: DateTime<Utc>) -> f64 {
    let text = format!("{}\n{}", article.title, article.summary);

    // Informativeness: summary length linear up to ~600 chars, plus a bonus
    // for concrete numeric tokens ($2B, 4.5%, 300K).
    let len_points =
        (article.summary.chars().count() as f64).min(SUMMARY_FULL_LEN) / SUMMARY_FULL_LEN * 30.0;
    let numeric_hits = NUMERIC_TOKEN_RE.find_iter(&text).count() as f64;
    let informativeness = len_points + (numeric_hits * 5.0).min(10.0);

    let source_rank = match site_priority {
        Some(p) if (1..=3).contains(&p) => 20.0,
        Some(p) if (4..=6).contains(&p) => 15.0,
        Some(p) if (7..=9).contains(&p) => 10.0,
        Some(p) if (10..=12).contains(&p) => 5.0,
        _ => 0.0,
    };

    let mut matched: std::collections::HashSet<String> = std::collections::HashSet::new();
    for m in RICHNESS_RE.find_iter(&text) {
        matched.insert(m.as_str().to_lowercase());
        if matched.len() >= 3 {
            break;
        }
    }
    let richness = match matched.len() {
        0 => 0.0,
        1 => 10.0,
        2 => 20.0,
        _ => 30.0,
    };

    let recency = match article.published_at {
        Some(published) => {
            let age_hours = (now - published.with_timezone(&Utc)).num_hours();
            match age_hours {
                h if h < 6 => 10.0,
                h if h < 24 => 7.0,
                h if h < 48 => 5.0,
                h if h < 72 => 3.0,
                _ => 0.0,
            }
        }
        None => 0.0,
    };

    let penalty =
        if LOW_QUALITY_PATTERNS.iter().any(|re| re.is_match(&text)) { PENALTY } else { 0.0 };

    (informativeness + source_rank + richness + recency - penalty).clamp(0.0, 100.0)
}

/// Score every article in place and, when the quality filter is enabled,
/// drop those below `min_score`. Returns the surviving articles and how many
/// were filtered out.
pub fn score_and_filter(
    mut articles: Vec<Article>,
    min_score: f64,
    filter_enabled: bool,
    priority_of: impl Fn(&Article) -> Option<u32>,
    now: DateTime<Utc>,
) -> (Vec<Article>, usize) {
    for article in &mut articles {
        article.quality_score = Some(score_article(article, priority_of(article), now));
    }
    if !filter_enabled {
        return (articles, 0);
    }
    let before = articles.len();
    articles.retain(|a| a.quality_score.unwrap_or(0.0) >= min_score);
    let filtered_out = before - articles.len();
    (articles, filtered_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn article(title: &str, summary: &str, age_hours: i64) -> Article {
        Article {
            title: title.to_string(),
            summary: summary.to_string(),
            url: "https://example.com/x".into(),
            published_at: Some((Utc::now() - Duration::hours(age_hours)).fixed_offset()),
            source_domain: "example.com".into(),
            ..Default::default()
        }
    }

    #[test]
    fn score_is_clamped_to_range() {
        let rich = article(
            "AI chip maker posts record earnings",
            &"Revenue grew 45% to $2.1B as machine learning demand soared. ".repeat(12),
            1,
        );
        let s = score_article(&rich, Some(1), Utc::now());
        assert!(s > 80.0 && s <= 100.0, "got {}", s);

        let thin = article("Note", "", 1_000);
        let s = score_article(&thin, None, Utc::now());
        assert!((0.0..=10.0).contains(&s), "got {}", s);
    }

    #[test]
    fn source_rank_follows_priority_bands() {
        let a = article("plain title", "plain summary", 500);
        let base = score_article(&a, None, Utc::now());
        assert_eq!(score_article(&a, Some(2), Utc::now()) - base, 20.0);
        assert_eq!(score_article(&a, Some(5), Utc::now()) - base, 15.0);
        assert_eq!(score_article(&a, Some(8), Utc::now()) - base, 10.0);
        assert_eq!(score_article(&a, Some(11), Utc::now()) - base, 5.0);
        assert_eq!(score_article(&a, Some(40), Utc::now()) - base, 0.0);
    }

    #[test]
    fn low_quality_patterns_cost_once() {
        let summary = "The committee approved the final text.";
        let clean = article("Parliament passes budget", summary, 200);
        let hedged = article("Parliament may be passing budget", summary, 200);
        let delta = score_article(&clean, None, Utc::now())
            - score_article(&hedged, None, Utc::now());
        assert!((delta - 15.0).abs() < 1e-9, "delta {}", delta);
    }

    #[test]
    fn recency_buckets() {
        let text = "plain";
        let now = Utc::now();
        let fresh = score_article(&article("t", text, 2), None, now);
        let day = score_article(&article("t", text, 20), None, now);
        let stale = score_article(&article("t", text, 100), None, now);
        assert_eq!(fresh - stale, 10.0);
        assert_eq!(day - stale, 7.0);
    }

    #[test]
    fn keyword_richness_counts_distinct_terms() {
        let none = article("Local fair opens", "crafts and food stalls", 500);
        let one = article("Chip shortage", "supply issues", 500);
        let three = article("AI startup earnings", "chip revenue up on machine learning", 500);
        let now = Utc::now();
        let s_none = score_article(&none, None, now);
        let s_one = score_article(&one, None, now);
        let s_three = score_article(&three, None, now);
        assert!(s_one > s_none);
        assert!(s_three > s_one);
    }

    #[test]
    fn filter_drops_below_threshold() {
        let strong = article(
            "AI chip maker posts record earnings",
            &"Revenue grew 45% to $2.1B on machine learning demand. ".repeat(10),
            2,
        );
        let weak = article("Note", "", 2_000);
        let (kept, dropped) = score_and_filter(
            vec![strong, weak],
            35.0,
            true,
            |_| Some(1),
            Utc::now(),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 1);
        assert!(kept[0].quality_score.unwrap() >= 35.0);
    }

    #[test]
    fn disabled_filter_scores_but_keeps_all() {
        let weak = article("Note", "", 2_000);
        let (kept, dropped) = score_and_filter(vec![weak], 35.0, false, |_| None, Utc::now());
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 0);
        assert!(kept[0].quality_score.is_some());
    }
}
