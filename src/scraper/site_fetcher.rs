// src/scraper/site_fetcher.rs
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::ScrapingConfig;
use crate::models::Result;
use crate::scraper::types::{FetchOutcome, CONTACT_PATHS, PRIORITY_LOCAL_PARTS};
use crate::scraper::{EmailExtractor, EmailValidator};

/// Seam between job orchestration and the network. The runner only needs
/// "website in, best address out", which keeps job tests off the wire.
#[async_trait]
pub trait EmailResolver: Send + Sync {
    async fn resolve_email(&self, url: &str) -> Option<String>;
}

/// Crawls one website for a contact address: home page first, then the
/// usual contact/about/imprint paths, with everything funneled through the
/// extractor and validator before ranking picks a winner.
pub struct SiteFetcher {
    client: Client,
    extractor: EmailExtractor,
    validator: EmailValidator,
}

impl SiteFetcher {
    pub fn new(config: &ScrapingConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            extractor: EmailExtractor::new(config.max_scan_bytes),
            validator: EmailValidator::new(),
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        debug!("🌐 Fetching: {}", url);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(format!("HTTP error: {}", response.status()).into());
        }
        Ok(response.text().await?)
    }

    /// Home fetch with one protocol retry: https first, then the same host
    /// over plain http. Both failing writes the site off.
    async fn fetch_home(&self, normalized: &str) -> Option<FetchOutcome> {
        match self.fetch_page(normalized).await {
            Ok(html) => {
                return Some(FetchOutcome {
                    base_url: normalized.to_string(),
                    html,
                })
            }
            Err(e) => debug!("⚠️ Fetch failed for {}: {}", normalized, e),
        }

        if let Some(stripped) = normalized.strip_prefix("https://") {
            let fallback = format!("http://{}", stripped);
            match self.fetch_page(&fallback).await {
                Ok(html) => {
                    return Some(FetchOutcome {
                        base_url: fallback,
                        html,
                    })
                }
                Err(e) => debug!("⚠️ Fallback fetch failed for {}: {}", fallback, e),
            }
        }

        None
    }
}

#[async_trait]
impl EmailResolver for SiteFetcher {
    async fn resolve_email(&self, url: &str) -> Option<String> {
        let normalized = match normalize_website_url(url) {
            Some(normalized) => normalized,
            None => {
                warn!("⚠️ Unusable website URL: {}", url);
                return None;
            }
        };

        let home = match self.fetch_home(&normalized).await {
            Some(outcome) => outcome,
            None => {
                warn!("❌ Site unreachable over https and http: {}", normalized);
                return None;
            }
        };

        let base = match Url::parse(&home.base_url) {
            Ok(base) => base,
            Err(_) => return None,
        };

        let mut candidates: HashSet<String> = self.extractor.extract(&home.html, false);

        for path in CONTACT_PATHS {
            let page_url = match base.join(path) {
                Ok(page_url) => page_url,
                Err(_) => continue,
            };
            match self.fetch_page(page_url.as_str()).await {
                Ok(html) => candidates.extend(self.extractor.extract(&html, true)),
                Err(e) => debug!("⏭️ Skipping {}: {}", page_url, e),
            }
        }

        let raw_count = candidates.len();
        let raw: Vec<String> = candidates.into_iter().collect();
        let cleaned = self.validator.clean(&raw);
        debug!(
            "📧 {}: {} raw candidates, {} after cleaning",
            normalized,
            raw_count,
            cleaned.len()
        );

        let host = base.host_str().unwrap_or("");
        rank_candidates(cleaned, host).into_iter().next()
    }
}

/// Prefixes bare hosts with https:// and validates the result parses with a
/// dotted host. Returns None for entries that can never be fetched.
pub fn normalize_website_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&with_scheme).ok()?;
    let host = parsed.host_str()?;
    if !host.contains('.') {
        return None;
    }

    Some(with_scheme)
}

/// Last two host labels, with any www. prefix dropped. Coarse, but all the
/// ranking needs is "does this address live on the site's own domain".
fn registrable_domain(host: &str) -> String {
    let host = host.trim_start_matches("www.");
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        host.to_string()
    } else {
        labels[labels.len() - 2..].join(".")
    }
}

/// Orders cleaned candidates: site-domain addresses first, lexicographic
/// within each group. The first address whose local part mentions a contact
/// keyword then jumps to the head, and the head is what the site resolves to.
fn rank_candidates(emails: Vec<String>, site_host: &str) -> Vec<String> {
    let site_domain = registrable_domain(site_host);

    let mut ordered: Vec<(usize, String)> = emails
        .into_iter()
        .map(|email| {
            let group = match email.split_once('@') {
                Some((_, domain)) if registrable_domain(domain) == site_domain => 0,
                _ => 1,
            };
            (group, email)
        })
        .collect();
    ordered.sort();

    let mut ranked: Vec<String> = ordered.into_iter().map(|(_, email)| email).collect();
    let preferred = ranked.iter().position(|email| {
        email.split_once('@').map_or(false, |(local, _)| {
            PRIORITY_LOCAL_PARTS.iter().any(|p| local.contains(p))
        })
    });
    if let Some(index) = preferred {
        let hit = ranked.remove(index);
        ranked.insert(0, hit);
    }

    ranked
}
