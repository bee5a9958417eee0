// src/scraper/script_extractor.rs
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashSet;

use crate::scraper::types::{CONTACT_ATTR_HINTS, EMAIL_PATTERN, PROVIDER_DOMAINS};

const JSON_KEY_HINTS: [&str; 3] = ["email", "mail", "contact"];

/// Digs addresses out of inline script blocks: plain tokens, config-style
/// key/value pairs, string concatenations, fromCharCode chains, atob
/// payloads, and embedded JSON such as schema.org markup. Only scripts that
/// mention contact vocabulary or a freemail provider are mined; plain tokens
/// in unflagged scripts are left to the whole-document sweep.
pub struct ScriptMiner {
    email_regex: Regex,
    key_value_regex: Regex,
    concat_regex: Regex,
    charcode_regex: Regex,
    atob_regex: Regex,
}

impl ScriptMiner {
    pub fn new() -> Self {
        Self {
            email_regex: Regex::new(EMAIL_PATTERN).unwrap(),
            key_value_regex: Regex::new(
                r#"(?i)["']?(?:e-?mail|mail|contact(?:_?email)?)["']?\s*[:=]\s*["']([^"']+)["']"#,
            )
            .unwrap(),
            concat_regex: Regex::new(r#"["']\s*\+\s*["']"#).unwrap(),
            charcode_regex: Regex::new(r"String\.fromCharCode\(\s*([0-9,\s]+)\)").unwrap(),
            atob_regex: Regex::new(r#"atob\(\s*["']([A-Za-z0-9+/=]+)["']\s*\)"#).unwrap(),
        }
    }

    pub fn scan(&self, document: &Html) -> HashSet<String> {
        let script_sel = Selector::parse("script").unwrap();
        let mut found = HashSet::new();

        for script in document.select(&script_sel) {
            let content: String = script.text().collect();
            if content.trim().is_empty() {
                continue;
            }

            let content_lower = content.to_lowercase();
            let flagged = CONTACT_ATTR_HINTS
                .iter()
                .any(|hint| content_lower.contains(hint))
                || PROVIDER_DOMAINS
                    .iter()
                    .any(|domain| content_lower.contains(domain));
            if !flagged {
                continue;
            }

            self.collect_matches(&content, &mut found);
            self.scan_key_values(&content, &mut found);
            self.scan_concatenations(&content, &mut found);
            self.scan_charcodes(&content, &mut found);
            self.scan_atob(&content, &mut found);

            let script_type = script.value().attr("type").unwrap_or("").to_lowercase();
            let trimmed = content.trim_start();
            if script_type.contains("json")
                || trimmed.starts_with('{')
                || trimmed.starts_with('[')
            {
                if let Ok(value) = serde_json::from_str::<Value>(&content) {
                    self.walk_json(&value, &mut found);
                }
            }
        }

        found
    }

    fn collect_matches(&self, text: &str, found: &mut HashSet<String>) {
        for m in self.email_regex.find_iter(text) {
            found.insert(m.as_str().to_string());
        }
    }

    fn scan_key_values(&self, content: &str, found: &mut HashSet<String>) {
        for caps in self.key_value_regex.captures_iter(content) {
            if let Some(value) = caps.get(1) {
                self.collect_matches(value.as_str(), found);
            }
        }
    }

    /// Collapses `"a" + "@" + "b.com"` into one string before rescanning.
    fn scan_concatenations(&self, content: &str, found: &mut HashSet<String>) {
        let collapsed = self.concat_regex.replace_all(content, "");
        self.collect_matches(&collapsed, found);
    }

    fn scan_charcodes(&self, content: &str, found: &mut HashSet<String>) {
        for caps in self.charcode_regex.captures_iter(content) {
            if let Some(list) = caps.get(1) {
                let decoded: String = list
                    .as_str()
                    .split(',')
                    .filter_map(|n| n.trim().parse::<u32>().ok())
                    .filter_map(char::from_u32)
                    .collect();
                self.collect_matches(&decoded, found);
            }
        }
    }

    fn scan_atob(&self, content: &str, found: &mut HashSet<String>) {
        for caps in self.atob_regex.captures_iter(content) {
            if let Some(payload) = caps.get(1) {
                if let Ok(bytes) = STANDARD.decode(payload.as_str()) {
                    if let Ok(decoded) = String::from_utf8(bytes) {
                        self.collect_matches(&decoded, found);
                    }
                }
            }
        }
    }

    /// Recursive key walk. Only string values under contact-flavored keys
    /// are considered, so arbitrary JSON blobs don't flood the candidates.
    fn walk_json(&self, value: &Value, found: &mut HashSet<String>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    if let Value::String(s) = child {
                        let key_lower = key.to_lowercase();
                        if JSON_KEY_HINTS.iter().any(|hint| key_lower.contains(hint)) {
                            self.collect_matches(s, found);
                        }
                    }
                    self.walk_json(child, found);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.walk_json(item, found);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(html: &str) -> HashSet<String> {
        ScriptMiner::new().scan(&Html::parse_document(html))
    }

    #[test]
    fn test_plain_token_inside_script() {
        let found = scan(r#"<script>var contact = "help@acme.com";</script>"#);
        assert!(found.contains("help@acme.com"));
    }

    #[test]
    fn test_unflagged_script_is_skipped() {
        let found = scan(r#"<script>var x = atob("aGVscEBhY21lLmNvbQ==");</script>"#);
        assert!(found.is_empty());
    }

    #[test]
    fn test_key_value_assignment() {
        let found = scan(r#"<script>window.config = { "contact_email": "team@acme.com" };</script>"#);
        assert!(found.contains("team@acme.com"));
    }

    #[test]
    fn test_string_concatenation_is_reassembled() {
        let found = scan(r#"<script>var email = "sales" + "@" + "acme" + ".com";</script>"#);
        assert!(found.contains("sales@acme.com"));
    }

    #[test]
    fn test_from_char_code_chain() {
        // j o e @ a c m e . c o m
        let found = scan(
            "<script>var email = String.fromCharCode(106,111,101,64,97,99,109,101,46,99,111,109);</script>",
        );
        assert!(found.contains("joe@acme.com"));
    }

    #[test]
    fn test_atob_payload_is_decoded() {
        let found = scan(r#"<script>var email = atob("aW5mb0BhY21lLmNvbQ==");</script>"#);
        assert!(found.contains("info@acme.com"));
    }

    #[test]
    fn test_json_ld_contact_point() {
        let html = r#"<script type="application/ld+json">
            {"@context": "https://schema.org", "@type": "Organization",
             "contactPoint": {"@type": "ContactPoint", "email": "hello@acme.com"}}
        </script>"#;
        let found = scan(html);
        assert!(found.contains("hello@acme.com"));
    }

    #[test]
    fn test_malformed_json_is_ignored() {
        let found = scan(r#"<script type="application/json">{ "email": broken</script>"#);
        assert!(found.is_empty());
    }
}
