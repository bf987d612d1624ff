use std::time::Duration;

use reqwest::StatusCode;

/// Desktop browser User-Agents rotated across upstream requests. Feed hosts
/// and publishers routinely 403 default client UAs.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

pub fn random_user_agent() -> &'static str {
    use rand::prelude::*;
    let mut rng = rand::rng();
    let index = rng.random_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

/// Why a single HTTP attempt (after retry) did not produce a body.
#[derive(Debug)]
pub enum FetchFailure {
    Timeout,
    Status(StatusCode),
    Connect(String),
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchFailure::Timeout => write!(f, "timeout"),
            FetchFailure::Status(s) => write!(f, "http status {}", s),
            FetchFailure::Connect(e) => write!(f, "connect: {}", e),
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis((250u64 << attempt).min(1_000))
}

/// GET a URL with a browser UA and one retry.
///
/// Retries once on connection errors, 5xx, and 429; other 4xx are terminal
/// for this source. A timed-out attempt is reported as `Timeout` without a
/// retry; the ladder's tier deadline governs overall patience.
pub async fn get_bytes(
    client: &reqwest::Client,
    url: &str,
    timeout_ms: u64,
) -> Result<Vec<u8>, FetchFailure> {
    let timeout = Duration::from_millis(timeout_ms);
    let mut last_failure = FetchFailure::Connect("no attempt made".into());

    for attempt in 0..2u32 {
        if attempt > 0 {
            tokio::time::sleep(backoff_delay(attempt)).await;
        }

        let request = client
            .get(url)
            .header("User-Agent", random_user_agent())
            .header("Accept", "application/rss+xml, application/atom+xml, application/xml, text/html, */*")
            .header("Accept-Language", "en-US,en;q=0.9")
            .timeout(timeout);

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(FetchFailure::Timeout),
            Err(e) => {
                last_failure = FetchFailure::Connect(e.to_string());
                continue;
            }
        };

        let status = response.status();
        if status.is_success() {
            return match response.bytes().await {
                Ok(body) => Ok(body.to_vec()),
                Err(e) if e.is_timeout() => Err(FetchFailure::Timeout),
                Err(e) => Err(FetchFailure::Connect(e.to_string())),
            };
        }

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            last_failure = FetchFailure::Status(status);
            continue;
        }
        return Err(FetchFailure::Status(status));
    }

    Err(last_failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_pool_is_browser_like() {
        assert!(!USER_AGENTS.is_empty());
        assert!(USER_AGENTS.iter().all(|ua| ua.starts_with("Mozilla/5.0")));
        assert!(USER_AGENTS.contains(&random_user_agent()));
    }

    #[test]
    fn backoff_is_capped_at_one_second() {
        assert_eq!(backoff_delay(0), Duration::from_millis(250));
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(4), Duration::from_millis(1_000));
    }
}
