// src/scraper/validator.rs
use regex::Regex;
use std::collections::HashSet;

/// Domains that only ever appear as placeholders, defaults or tracking
/// artifacts, never as a reachable mailbox worth keeping.
const IGNORED_DOMAINS: [&str; 14] = [
    "example.com",
    "example.org",
    "example.net",
    "domain.com",
    "email.com",
    "yourdomain.com",
    "yourcompany.com",
    "yoursite.com",
    "mysite.com",
    "test.com",
    "sample.com",
    "placeholder.com",
    "sentry.io",
    "wixpress.com",
];

/// Asset filenames sneak through the loose scan as `name@2x.png` style
/// tokens; anything ending in one of these is not an address.
const REJECTED_EXTENSIONS: [&str; 16] = [
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".bmp", ".tiff", ".css", ".js",
    ".woff", ".woff2", ".ttf", ".eot", ".otf",
];

const EDGE_JUNK: [char; 24] = [
    '.', ',', ';', ':', '<', '>', '(', ')', '[', ']', '{', '}', '"', '\'', '|', '!', '?', '/',
    '\\', '-', '=', '&', '#', '*',
];

/// Normalizes, filters and deduplicates raw candidates into the final list.
///
/// `clean` is pure and idempotent: feeding its output back in returns the
/// same list in the same order.
pub struct EmailValidator {
    shape_regex: Regex,
    dimension_regex: Regex,
}

impl EmailValidator {
    pub fn new() -> Self {
        Self {
            shape_regex: Regex::new(r"^[a-z0-9][a-z0-9._%+-]*@[a-z0-9][a-z0-9.-]*\.[a-z]{2,}$")
                .unwrap(),
            dimension_regex: Regex::new(r"\d{1,4}x\d{1,4}").unwrap(),
        }
    }

    pub fn clean(&self, candidates: &[String]) -> Vec<String> {
        let mut cleaned = Vec::new();
        let mut seen = HashSet::new();

        for raw in candidates {
            if let Some(email) = self.normalize(raw) {
                if seen.insert(email.clone()) {
                    cleaned.push(email);
                }
            }
        }

        cleaned.sort();
        self.merge_same_domain(cleaned)
    }

    fn normalize(&self, raw: &str) -> Option<String> {
        let email = raw.trim().to_lowercase();
        let email = email
            .trim_matches(|c: char| c.is_whitespace() || EDGE_JUNK.contains(&c))
            .to_string();

        if email.is_empty() {
            return None;
        }
        if REJECTED_EXTENSIONS.iter().any(|ext| email.ends_with(ext)) {
            return None;
        }

        let (local, domain) = email.split_once('@')?;
        if local.is_empty() || domain.is_empty() {
            return None;
        }
        if REJECTED_EXTENSIONS.iter().any(|ext| local.ends_with(ext)) {
            return None;
        }
        if !self.shape_regex.is_match(&email) {
            return None;
        }
        if self.dimension_regex.is_match(&email) {
            return None;
        }
        if IGNORED_DOMAINS
            .iter()
            .any(|d| domain == *d || domain.ends_with(&format!(".{}", d)))
        {
            return None;
        }

        Some(email)
    }

    /// Within one domain, a longer local part that contains a shorter
    /// sibling (or whose final dotted segment equals it) is a decorated
    /// duplicate: `project.info@acme.com` folds into `info@acme.com`.
    fn merge_same_domain(&self, emails: Vec<String>) -> Vec<String> {
        let parts: Vec<(&str, &str)> = emails
            .iter()
            .filter_map(|e| e.split_once('@'))
            .collect();
        let mut keep = vec![true; emails.len()];

        for i in 0..parts.len() {
            let (local_i, domain_i) = parts[i];
            for (j, &(local_j, domain_j)) in parts.iter().enumerate() {
                if i == j || domain_i != domain_j || local_i.len() <= local_j.len() {
                    continue;
                }
                if local_i.contains(local_j) || local_i.rsplit('.').next() == Some(local_j) {
                    keep[i] = false;
                    break;
                }
            }
        }

        emails
            .into_iter()
            .zip(keep)
            .filter(|(_, kept)| *kept)
            .map(|(email, _)| email)
            .collect()
    }
}

impl Default for EmailValidator {
    fn default() -> Self {
        Self::new()
    }
}
