// src/sheets.rs
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::models::Result;
use crate::scraper::normalize_website_url;

/// Pulls a website column out of a shared Google Sheet through its CSV
/// export endpoint. The sheet has to be link-readable; no API key involved.
pub struct SheetSource {
    client: Client,
}

impl SheetSource {
    pub fn new(timeout_seconds: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch_website_urls(&self, sheet_url: &str, column: &str) -> Result<Vec<String>> {
        let export_url = csv_export_url(sheet_url)?;
        debug!("📥 Downloading sheet export: {}", export_url);

        let response = self.client.get(&export_url).send().await?;
        if !response.status().is_success() {
            return Err(format!("sheet download failed: HTTP {}", response.status()).into());
        }
        let body = response.text().await?;

        let urls = extract_website_column(&body, column)?;
        info!("📋 Sheet column '{}' yielded {} website URLs", column, urls.len());
        Ok(urls)
    }
}

/// Builds the CSV export endpoint for a regular sheet link, keeping the tab
/// selection when a gid is present in the fragment or query.
fn csv_export_url(sheet_url: &str) -> Result<String> {
    let parsed = Url::parse(sheet_url)?;
    let host = parsed.host_str().unwrap_or("");
    if host != "docs.google.com" {
        return Err(format!("not a Google Sheets URL: {}", sheet_url).into());
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|segments| segments.collect())
        .unwrap_or_default();
    let sheet_id = segments
        .iter()
        .skip_while(|segment| **segment != "d")
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| format!("no spreadsheet id in URL: {}", sheet_url))?;

    let gid = parsed
        .fragment()
        .and_then(|fragment| {
            fragment
                .split('&')
                .find_map(|part| part.strip_prefix("gid="))
        })
        .or_else(|| {
            parsed
                .query()
                .and_then(|query| query.split('&').find_map(|part| part.strip_prefix("gid=")))
        });

    let mut export = format!(
        "https://docs.google.com/spreadsheets/d/{}/export?format=csv",
        sheet_id
    );
    if let Some(gid) = gid {
        export.push_str(&format!("&gid={}", gid));
    }
    Ok(export)
}

fn extract_website_column(csv: &str, column: &str) -> Result<Vec<String>> {
    let csv = csv.strip_prefix('\u{feff}').unwrap_or(csv);
    let mut lines = csv.lines();
    let header = lines.next().ok_or("sheet export is empty")?;
    let headers = parse_csv_line(header);

    let wanted = column.trim().to_lowercase();
    let index = headers
        .iter()
        .position(|h| h.trim().to_lowercase() == wanted)
        .ok_or_else(|| {
            format!(
                "column '{}' not found in sheet (headers: {})",
                column,
                headers.join(", ")
            )
        })?;

    let mut urls = Vec::new();
    let mut seen = HashSet::new();
    for line in lines {
        let cells = parse_csv_line(line);
        if let Some(cell) = cells.get(index) {
            if let Some(url) = normalize_website_url(cell) {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
        }
    }

    if urls.is_empty() {
        return Err(format!("column '{}' holds no usable website URLs", column).into());
    }
    Ok(urls)
}

/// Minimal quote-aware CSV splitting. Embedded newlines inside quoted cells
/// are not handled; sheet exports of URL columns don't produce them.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                cells.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_url_from_edit_link() {
        let url = csv_export_url(
            "https://docs.google.com/spreadsheets/d/1AbC_dEf-123/edit#gid=471093682",
        )
        .unwrap();
        assert_eq!(
            url,
            "https://docs.google.com/spreadsheets/d/1AbC_dEf-123/export?format=csv&gid=471093682"
        );
    }

    #[test]
    fn test_export_url_without_gid() {
        let url =
            csv_export_url("https://docs.google.com/spreadsheets/d/1AbC_dEf-123/edit").unwrap();
        assert_eq!(
            url,
            "https://docs.google.com/spreadsheets/d/1AbC_dEf-123/export?format=csv"
        );
    }

    #[test]
    fn test_export_url_rejects_foreign_hosts() {
        assert!(csv_export_url("https://example.com/spreadsheets/d/xyz/edit").is_err());
        assert!(csv_export_url("https://docs.google.com/document/d2/edit").is_err());
    }

    #[test]
    fn test_parse_csv_line_handles_quotes() {
        assert_eq!(
            parse_csv_line(r#"plain,"with, comma","quoted ""inner""""#),
            vec!["plain", "with, comma", r#"quoted "inner""#]
        );
    }

    #[test]
    fn test_extract_column_case_insensitive_header() {
        let csv = "Name,Website\nAcme,acme.com\nBeta,https://beta.org\n";
        let urls = extract_website_column(csv, "website").unwrap();
        assert_eq!(urls, vec!["https://acme.com", "https://beta.org"]);
    }

    #[test]
    fn test_extract_column_skips_blank_and_duplicate_rows() {
        let csv = "website\nacme.com\n\nacme.com\nhttps://acme.com\n";
        let urls = extract_website_column(csv, "website").unwrap();
        assert_eq!(urls, vec!["https://acme.com"]);
    }

    #[test]
    fn test_extract_column_reports_missing_header() {
        let csv = "name,url\nAcme,acme.com\n";
        let err = extract_website_column(csv, "website").unwrap_err();
        assert!(err.to_string().contains("website"));
    }

    #[test]
    fn test_extract_column_rejects_empty_result() {
        let csv = "website\n\n   \n";
        assert!(extract_website_column(csv, "website").is_err());
    }

    #[test]
    fn test_extract_column_handles_short_rows() {
        let csv = "name,website\nonly-name\nAcme,acme.com\n";
        let urls = extract_website_column(csv, "website").unwrap();
        assert_eq!(urls, vec!["https://acme.com"]);
    }
}
