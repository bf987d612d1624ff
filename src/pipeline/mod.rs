//! CPU-only post-processing: dedup, filtering, scoring, diversity.
//! Nothing in this module performs I/O.

pub mod dedup;
pub mod diversity;
pub mod filters;
pub mod score;

use chrono::{DateTime, Utc};

use crate::core::types::Article;

/// Final response ordering: publish date descending, quality score
/// descending, URL ascending.
pub fn sort_articles(articles: &mut [Article]) {
    articles.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| {
                b.quality_score
                    .unwrap_or(0.0)
                    .partial_cmp(&a.quality_score.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.url.cmp(&b.url))
    });
}

/// Clamp a future publish date to `now`; feeds occasionally carry them.
pub fn clamp_future_date(
    published: DateTime<chrono::FixedOffset>,
    now: DateTime<Utc>,
) -> DateTime<chrono::FixedOffset> {
    if published.with_timezone(&Utc) > now {
        now.fixed_offset()
    } else {
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn sort_orders_by_date_then_score_then_url() {
        let now = Utc::now();
        let mk = |url: &str, age_hours: i64, score: f64| Article {
            title: url.to_string(),
            url: url.to_string(),
            published_at: Some((now - Duration::hours(age_hours)).fixed_offset()),
            quality_score: Some(score),
            ..Default::default()
        };
        let mut list = vec![
            mk("https://c", 5, 90.0),
            mk("https://b", 1, 40.0),
            mk("https://a", 1, 40.0),
            mk("https://d", 1, 80.0),
        ];
        sort_articles(&mut list);
        let urls: Vec<&str> = list.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["https://d", "https://a", "https://b", "https://c"]);
    }

    #[test]
    fn future_dates_clamp_to_now() {
        let now = Utc::now();
        let future = (now + Duration::hours(8)).fixed_offset();
        assert_eq!(clamp_future_date(future, now), now.fixed_offset());
        let past = (now - Duration::hours(8)).fixed_offset();
        assert_eq!(clamp_future_date(past, now), past);
    }
}
