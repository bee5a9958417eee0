// src/scraper/email_extractor.rs
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use tracing::debug;

use crate::scraper::obfuscation::ObfuscationScanner;
use crate::scraper::script_extractor::ScriptMiner;
use crate::scraper::types::{
    CONTACT_ATTR_HINTS, CONTACT_TEXT_HINTS, EMAIL_PATTERN, PROVIDER_DOMAINS,
};

const RECIPIENT_INPUT_NAMES: [&str; 7] = [
    "recipient",
    "recipients",
    "to",
    "mailto",
    "email",
    "email_to",
    "send_to",
];

/// Mines a page for address candidates. Every strategy runs on every page
/// (the contact-page extras are additive) and the hits are unioned; nothing
/// here judges quality, that's the validator's job.
pub struct EmailExtractor {
    email_regex: Regex,
    mailto_regex: Regex,
    provider_regex: Regex,
    label_regex: Regex,
    max_scan_bytes: usize,
    scripts: ScriptMiner,
    obfuscation: ObfuscationScanner,
}

impl EmailExtractor {
    pub fn new(max_scan_bytes: usize) -> Self {
        let provider_pattern = format!(
            r"\b[A-Za-z0-9._%+-]+@(?:{})\b",
            PROVIDER_DOMAINS
                .iter()
                .map(|d| regex::escape(d))
                .collect::<Vec<_>>()
                .join("|")
        );

        Self {
            email_regex: Regex::new(EMAIL_PATTERN).unwrap(),
            mailto_regex: Regex::new(r#"(?i)mailto:\s*([^"'?&\s<>()]+)"#).unwrap(),
            provider_regex: Regex::new(&provider_pattern).unwrap(),
            label_regex: Regex::new(r"(?i)^(?:e[-.\s]?)?mail\s*:?$").unwrap(),
            max_scan_bytes,
            scripts: ScriptMiner::new(),
            obfuscation: ObfuscationScanner::new(),
        }
    }

    pub fn extract(&self, html: &str, is_contact_page: bool) -> HashSet<String> {
        let document = Html::parse_document(html);
        let mut found = HashSet::new();

        self.scan_visible_text(&document, &mut found);
        self.scan_mailto_links(&document, &mut found);
        self.scan_contact_hinted_elements(&document, &mut found);

        if html.len() <= self.max_scan_bytes {
            self.scan_all_nodes(&document, &mut found);
        } else {
            debug!(
                "⏭️ Page over {} bytes, skipping the exhaustive node sweep",
                self.max_scan_bytes
            );
        }

        if is_contact_page {
            self.scan_labelled_values(&document, &mut found);
            self.scan_forms(&document, &mut found);
            self.scan_enquiry_blocks(&document, &mut found);
        }

        found.extend(self.scripts.scan(&document));
        self.scan_meta_tags(&document, &mut found);
        self.scan_provider_mentions(html, &mut found);
        found.extend(self.obfuscation.scan(&document, html));

        debug!("📧 Extracted {} raw candidates", found.len());
        found
    }

    fn collect_matches(&self, text: &str, found: &mut HashSet<String>) {
        for m in self.email_regex.find_iter(text) {
            found.insert(m.as_str().to_string());
        }
    }

    /// Rendered text only; whatever lives inside script/style tags belongs
    /// to the script miner.
    fn scan_visible_text(&self, document: &Html, found: &mut HashSet<String>) {
        let text = visible_text(document);
        self.collect_matches(&text, found);
    }

    /// mailto: anywhere in any attribute, which covers plain hrefs, onclick
    /// handlers and templated attributes alike. Percent-encoded addresses
    /// are decoded before being kept.
    fn scan_mailto_links(&self, document: &Html, found: &mut HashSet<String>) {
        let everything = Selector::parse("*").unwrap();
        for element in document.select(&everything) {
            for (_, value) in element.value().attrs() {
                self.scan_mailto_in(value, found);
            }
        }
    }

    fn scan_mailto_in(&self, value: &str, found: &mut HashSet<String>) {
        for caps in self.mailto_regex.captures_iter(value) {
            if let Some(addr) = caps.get(1) {
                let decoded = percent_decode(addr.as_str());
                if decoded.contains('@') {
                    found.insert(decoded);
                }
            }
        }
    }

    /// Elements whose class or id vocabulary suggests contact content get
    /// their whole subtree scanned, attributes included.
    fn scan_contact_hinted_elements(&self, document: &Html, found: &mut HashSet<String>) {
        let everything = Selector::parse("*").unwrap();
        for element in document.select(&everything) {
            let class_id = format!(
                "{} {}",
                element.value().attr("class").unwrap_or(""),
                element.value().attr("id").unwrap_or("")
            )
            .to_lowercase();

            if class_id.trim().is_empty()
                || !CONTACT_ATTR_HINTS.iter().any(|hint| class_id.contains(hint))
            {
                continue;
            }

            let text: String = element.text().collect::<Vec<_>>().join(" ");
            self.collect_matches(&text, found);

            for descendant in element.descendants() {
                if let Some(el) = descendant.value().as_element() {
                    for (_, value) in el.attrs() {
                        self.collect_matches(value, found);
                    }
                }
            }
        }
    }

    /// The expensive fallback: every text node and every attribute value in
    /// the document. Gated by `max_scan_bytes`.
    fn scan_all_nodes(&self, document: &Html, found: &mut HashSet<String>) {
        for node in document.tree.nodes() {
            match node.value() {
                Node::Text(text) => self.collect_matches(&text.text, found),
                Node::Element(element) => {
                    for (_, value) in element.attrs() {
                        self.collect_matches(value, found);
                    }
                }
                _ => {}
            }
        }
    }

    /// "Email:" style labels whose value sits in the following sibling.
    fn scan_labelled_values(&self, document: &Html, found: &mut HashSet<String>) {
        let everything = Selector::parse("*").unwrap();
        for element in document.select(&everything) {
            let own_text: String = element
                .children()
                .filter_map(|child| child.value().as_text().map(|t| t.text.to_string()))
                .collect();

            if !self.label_regex.is_match(own_text.trim()) {
                continue;
            }

            let mut sibling = element.next_sibling();
            let mut scanned = 0;
            while let Some(node) = sibling {
                if let Some(text) = node.value().as_text() {
                    self.collect_matches(&text.text, found);
                } else if let Some(sibling_el) = ElementRef::wrap(node) {
                    let text: String = sibling_el.text().collect::<Vec<_>>().join(" ");
                    self.collect_matches(&text, found);
                    for (_, value) in sibling_el.value().attrs() {
                        self.collect_matches(value, found);
                    }
                }
                scanned += 1;
                if scanned >= 2 {
                    break;
                }
                sibling = node.next_sibling();
            }
        }
    }

    /// Contact forms leak their destination through mailto actions and
    /// hidden recipient inputs.
    fn scan_forms(&self, document: &Html, found: &mut HashSet<String>) {
        let form_sel = Selector::parse("form").unwrap();
        let input_sel = Selector::parse("input").unwrap();

        for form in document.select(&form_sel) {
            if let Some(action) = form.value().attr("action") {
                self.scan_mailto_in(action, found);
            }

            for input in form.select(&input_sel) {
                let name = input.value().attr("name").unwrap_or("").to_lowercase();
                let input_type = input.value().attr("type").unwrap_or("").to_lowercase();
                let value = input.value().attr("value").unwrap_or("");

                let recipient_like = RECIPIENT_INPUT_NAMES
                    .iter()
                    .any(|candidate| name == *candidate || name.contains("recipient"));

                if (input_type == "hidden" || recipient_like) && value.contains('@') {
                    self.collect_matches(value, found);
                }
            }
        }
    }

    /// Blocks of enquiry copy ("get in touch", "write to us") carry the
    /// address in prose more often than anywhere else on contact pages.
    fn scan_enquiry_blocks(&self, document: &Html, found: &mut HashSet<String>) {
        let blocks = Selector::parse("p, li, span, td, address, footer").unwrap();
        for element in document.select(&blocks) {
            let text: String = element.text().collect::<Vec<_>>().join(" ");
            let lower = text.to_lowercase();
            if CONTACT_TEXT_HINTS.iter().any(|hint| lower.contains(hint)) {
                self.collect_matches(&text, found);
            }
        }
    }

    fn scan_meta_tags(&self, document: &Html, found: &mut HashSet<String>) {
        let meta_sel = Selector::parse("meta").unwrap();
        for meta in document.select(&meta_sel) {
            let name = meta
                .value()
                .attr("name")
                .or_else(|| meta.value().attr("property"))
                .or_else(|| meta.value().attr("itemprop"))
                .unwrap_or("")
                .to_lowercase();

            if let Some(content) = meta.value().attr("content") {
                if content.contains('@')
                    || CONTACT_ATTR_HINTS.iter().any(|hint| name.contains(hint))
                {
                    self.collect_matches(content, found);
                }
            }
        }
    }

    /// Freemail addresses get matched straight off the raw markup, so they
    /// surface even from comments or templating noise the DOM walk misses.
    fn scan_provider_mentions(&self, html: &str, found: &mut HashSet<String>) {
        for m in self.provider_regex.find_iter(html) {
            found.insert(m.as_str().to_string());
        }
    }
}

/// Concatenated text nodes outside script/style/noscript subtrees.
pub(crate) fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    for node in document.tree.nodes() {
        if let Some(text) = node.value().as_text() {
            let skipped = node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|el| el.name().to_string()))
                .map(|name| matches!(name.as_str(), "script" | "style" | "noscript"))
                .unwrap_or(false);
            if !skipped {
                out.push_str(&text.text);
                out.push(' ');
            }
        }
    }
    out
}

pub(crate) fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
            if let Ok(byte) = u8::from_str_radix(hex, 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).unwrap_or_else(|_| input.to_string())
}
