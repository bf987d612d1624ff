use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::core::types::{Article, Site, Source};
use crate::fetch::http::{get_bytes, FetchFailure};
use crate::fetch::{FetchOutcome, FetchResult};
use crate::pipeline::clamp_future_date;

const MAX_TITLE_LEN: usize = 500;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag strip regex"));

/// Flatten markup to plain text: drop tags, decode the common entities,
/// collapse whitespace.
pub fn strip_markup(raw: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, " ");
    let decoded = stripped
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Convert parsed feed entries into Articles.
///
/// `source_domain` is always the configured site domain, never the domain
/// the feed declares; Google News and RSSHub feeds point elsewhere.
pub fn entries_to_articles(
    feed: feed_rs::model::Feed,
    site_domain: &str,
    tier: u32,
    summary_len: usize,
    max_articles: usize,
    now: DateTime<Utc>,
) -> Vec<Article> {
    let mut articles = Vec::new();

    for entry in feed.entries.into_iter() {
        if articles.len() >= max_articles {
            break;
        }

        let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
            continue;
        };

        let title = entry.title.map(|t| strip_markup(&t.content)).unwrap_or_default();
        if title.is_empty() {
            continue;
        }

        let published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| clamp_future_date(dt.fixed_offset(), now));

        let summary = entry
            .summary
            .map(|s| strip_markup(&s.content))
            .unwrap_or_default();

        let author = entry
            .authors
            .first()
            .map(|p| p.name.trim().to_string())
            .filter(|n| !n.is_empty());

        let tags: Vec<String> = entry
            .categories
            .into_iter()
            .map(|c| c.label.unwrap_or(c.term).trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        articles.push(Article {
            title: truncate_chars(&title, MAX_TITLE_LEN),
            url: link,
            published_at,
            summary: truncate_chars(&summary, summary_len),
            author,
            tags,
            source_domain: site_domain.to_string(),
            quality_score: None,
            source_rank: tier,
        });
    }

    articles
}

/// Fetch and parse one RSS/Atom source (official feed, RSSHub route, or the
/// raw Google News feed before its quality gate).
pub async fn fetch_feed_source(
    client: &reqwest::Client,
    site: &Site,
    source: &Source,
    timeout_ms: u64,
    summary_len: usize,
    max_articles: usize,
    now: DateTime<Utc>,
) -> FetchResult {
    let body = match get_bytes(client, &source.url, timeout_ms).await {
        Ok(body) => body,
        Err(failure) => {
            warn!(site = %site.domain, source = source.kind.label(), url = %source.url,
                  error = %failure, "feed fetch failed");
            let outcome = match failure {
                FetchFailure::Timeout => FetchOutcome::Timeout,
                FetchFailure::Status(_) | FetchFailure::Connect(_) => FetchOutcome::HttpError,
            };
            return FetchResult::failed(source.kind, outcome);
        }
    };

    let feed = match feed_rs::parser::parse(&body[..]) {
        Ok(feed) => feed,
        Err(e) => {
            warn!(site = %site.domain, source = source.kind.label(), error = %e,
                  "feed parse failed");
            return FetchResult::failed(source.kind, FetchOutcome::ParseError);
        }
    };

    let articles =
        entries_to_articles(feed, &site.domain, source.priority, summary_len, max_articles, now);
    debug!(site = %site.domain, source = source.kind.label(), count = articles.len(),
           "feed fetched");
    FetchResult::from_articles(source.kind, articles)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>Example Feed</title>
  <link>https://feedhost.example.net</link>
  <item>
    <title>First &amp; foremost &lt;b&gt;story&lt;/b&gt;</title>
    <link>https://example.com/news/first</link>
    <pubDate>Wed, 29 Jul 2026 08:00:00 GMT</pubDate>
    <description><![CDATA[<p>Lead   paragraph</p> with <i>markup</i>]]></description>
    <category>Tech</category>
  </item>
  <item>
    <title>Dated in the future</title>
    <link>https://example.com/news/future</link>
    <pubDate>29 Jul 2100 08:00:00 GMT</pubDate>
  </item>
  <item>
    <link>https://example.com/news/untitled</link>
  </item>
</channel></rss>"#;

    #[test]
    fn strip_markup_flattens_entities_and_tags() {
        assert_eq!(strip_markup("<p>a&amp;b</p>  <i>c</i>"), "a&b c");
    }

    #[test]
    fn entries_convert_with_site_domain() {
        let feed = feed_rs::parser::parse(RSS.as_bytes()).unwrap();
        let now = Utc::now();
        let articles = entries_to_articles(feed, "example.com", 1, 500, 50, now);
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.title, "First & foremost story");
        assert_eq!(first.url, "https://example.com/news/first");
        assert_eq!(first.source_domain, "example.com");
        assert_eq!(first.summary, "Lead paragraph with markup");
        assert_eq!(first.tags, vec!["tech"]);
        assert_eq!(first.source_rank, 1);
    }

    #[test]
    fn future_dates_are_clamped() {
        let feed = feed_rs::parser::parse(RSS.as_bytes()).unwrap();
        let now = Utc::now();
        let articles = entries_to_articles(feed, "example.com", 1, 500, 50, now);
        let future = articles.iter().find(|a| a.url.ends_with("/future")).unwrap();
        assert!(future.published_at.unwrap().with_timezone(&Utc) <= now);
    }

    #[test]
    fn entry_cap_is_enforced() {
        let feed = feed_rs::parser::parse(RSS.as_bytes()).unwrap();
        let articles = entries_to_articles(feed, "example.com", 1, 500, 1, Utc::now());
        assert_eq!(articles.len(), 1);
    }

    #[test]
    fn long_titles_are_bounded() {
        let long = "word ".repeat(200);
        assert_eq!(truncate_chars(&long, 500).chars().count(), 500);
    }
}
