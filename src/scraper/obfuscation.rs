// src/scraper/obfuscation.rs
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;

use crate::scraper::email_extractor::{percent_decode, visible_text};
use crate::scraper::types::{CONTACT_ATTR_HINTS, EMAIL_PATTERN};

/// Undoes the common anti-harvesting tricks: spelled-out "at"/"dot"
/// addresses, numeric character entities, reversed text, and data
/// attributes carrying base64/hex/percent-encoded payloads.
pub struct ObfuscationScanner {
    email_regex: Regex,
    at_dot_regex: Regex,
    dot_token_regex: Regex,
    at_entity_regex: Regex,
    dot_entity_regex: Regex,
    hex_regex: Regex,
}

impl ObfuscationScanner {
    pub fn new() -> Self {
        Self {
            email_regex: Regex::new(EMAIL_PATTERN).unwrap(),
            at_dot_regex: Regex::new(
                r"(?i)([a-z0-9._%+-]+)(?:\s*[\[({]\s*at\s*[\])}]\s*|\s+at\s+)([a-z0-9.-]+(?:(?:\s*[\[({]\s*dot\s*[\])}]\s*|\s+dot\s+)[a-z0-9.-]+)*)",
            )
            .unwrap(),
            dot_token_regex: Regex::new(r"(?i)\s*[\[({]\s*dot\s*[\])}]\s*|\s+dot\s+").unwrap(),
            at_entity_regex: Regex::new(r"&#0*64;|&commat;").unwrap(),
            dot_entity_regex: Regex::new(r"&#0*46;|&period;").unwrap(),
            hex_regex: Regex::new(r"^[0-9a-fA-F]+$").unwrap(),
        }
    }

    pub fn scan(&self, document: &Html, raw_html: &str) -> HashSet<String> {
        let mut found = HashSet::new();
        let text = visible_text(document);

        self.scan_spelled_out(&text, &mut found);
        self.scan_entities(raw_html, &mut found);
        self.scan_reversed(document, &mut found);
        self.scan_data_attributes(document, &mut found);

        found
    }

    fn collect_matches(&self, text: &str, found: &mut HashSet<String>) {
        for m in self.email_regex.find_iter(text) {
            found.insert(m.as_str().to_string());
        }
    }

    /// "info [at] acme [dot] com" and friends. The candidate is rebuilt and
    /// has to pass the address pattern before it counts.
    fn scan_spelled_out(&self, text: &str, found: &mut HashSet<String>) {
        for caps in self.at_dot_regex.captures_iter(text) {
            if let (Some(local), Some(domain_raw)) = (caps.get(1), caps.get(2)) {
                let domain = self.dot_token_regex.replace_all(domain_raw.as_str(), ".");
                let candidate = format!("{}@{}", local.as_str(), domain);
                if self.email_regex.is_match(&candidate) {
                    found.insert(candidate);
                }
            }
        }
    }

    /// `&#64;` / `&commat;` style entities hide the @ from naive matchers.
    /// Works on the raw markup so attribute contexts are covered too.
    fn scan_entities(&self, raw_html: &str, found: &mut HashSet<String>) {
        if !raw_html.contains("&#") && !raw_html.contains("&commat") && !raw_html.contains("&period")
        {
            return;
        }
        let decoded = self.at_entity_regex.replace_all(raw_html, "@");
        let decoded = self.dot_entity_regex.replace_all(&decoded, ".");
        self.collect_matches(&decoded, found);
    }

    /// Addresses rendered backwards and flipped by CSS. Only elements whose
    /// own text carries both an @ and a dot are worth flipping.
    fn scan_reversed(&self, document: &Html, found: &mut HashSet<String>) {
        let everything = Selector::parse("*").unwrap();
        for element in document.select(&everything) {
            let own_text: String = element
                .children()
                .filter_map(|child| child.value().as_text().map(|t| t.text.to_string()))
                .collect();
            if !own_text.contains('@') || !own_text.contains('.') {
                continue;
            }
            let reversed: String = own_text.chars().rev().collect();
            self.collect_matches(&reversed, found);
        }
    }

    /// Base64/hex/percent payloads parked in data-attributes. Only attributes
    /// whose name carries a contact hint are decoded.
    fn scan_data_attributes(&self, document: &Html, found: &mut HashSet<String>) {
        let everything = Selector::parse("*").unwrap();
        for element in document.select(&everything) {
            for (name, value) in element.value().attrs() {
                if !name.starts_with("data-") {
                    continue;
                }
                if !CONTACT_ATTR_HINTS.iter().any(|hint| name.contains(hint)) {
                    continue;
                }
                let trimmed = value.trim();
                if trimmed.len() < 8 {
                    continue;
                }

                if let Ok(bytes) = STANDARD.decode(trimmed) {
                    if let Ok(decoded) = String::from_utf8(bytes) {
                        self.collect_matches(&decoded, found);
                    }
                }

                if trimmed.len() % 2 == 0 && self.hex_regex.is_match(trimmed) {
                    if let Some(decoded) = decode_hex(trimmed) {
                        self.collect_matches(&decoded, found);
                    }
                }

                if trimmed.contains('%') {
                    self.collect_matches(&percent_decode(trimmed), found);
                }
            }
        }
    }
}

fn decode_hex(input: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(input.len() / 2);
    for pair in input.as_bytes().chunks(2) {
        let digits = std::str::from_utf8(pair).ok()?;
        bytes.push(u8::from_str_radix(digits, 16).ok()?);
    }
    String::from_utf8(bytes).ok()
}
