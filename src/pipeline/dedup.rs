use std::collections::HashSet;

use crate::core::types::Article;
use crate::core::validate::canonical_url;

/// Fuzzy-title form: lower-cased, whitespace-collapsed, trailing punctuation
/// stripped.
pub fn normalize_title(title: &str) -> String {
    let collapsed = title.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || matches!(c, '…' | '—' | '–' | '‘' | '’' | '“' | '”'))
        .trim_end()
        .to_string()
}

fn title_tokens(normalized: &str) -> HashSet<String> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Remove duplicates by canonical URL, then by exact and fuzzy title match.
///
/// Articles arrive in nondeterministic order from parallel fetches, so the
/// list is first stable-sorted by (published_at desc, source rank asc, url
/// asc) to make "first seen" reproducible. In the fuzzy pass the earlier
/// article is retained, unless both carry quality scores and the later one
/// scores higher.
pub fn dedup_articles(mut articles: Vec<Article>, fuzzy_threshold: f64) -> Vec<Article> {
    articles.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.source_rank.cmp(&b.source_rank))
            .then_with(|| a.url.cmp(&b.url))
    });

    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut kept: Vec<Article> = Vec::with_capacity(articles.len());
    let mut kept_titles: Vec<(String, HashSet<String>)> = Vec::new();

    'next: for article in articles {
        if !seen_urls.insert(canonical_url(&article.url)) {
            continue;
        }

        let normalized = normalize_title(&article.title);
        let tokens = title_tokens(&normalized);

        for (idx, (kept_norm, kept_tokens)) in kept_titles.iter().enumerate() {
            let duplicate =
                *kept_norm == normalized || jaccard(kept_tokens, &tokens) >= fuzzy_threshold;
            if duplicate {
                let replace = match (kept[idx].quality_score, article.quality_score) {
                    (Some(old), Some(new)) => new > old,
                    _ => false,
                };
                if replace {
                    kept[idx] = article;
                    kept_titles[idx] = (normalized, tokens);
                }
                continue 'next;
            }
        }

        kept_titles.push((normalized, tokens));
        kept.push(article);
    }

    kept
}
