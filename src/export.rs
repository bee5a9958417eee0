// src/export.rs
use chrono::Utc;
use tracing::info;

use crate::models::{Job, Result, SiteResult};

/// Writes job results out as a two-column CSV report. Websites that yielded
/// nothing keep their row with an empty email cell.
pub struct ResultExporter {
    output_dir: String,
}

impl ResultExporter {
    pub fn new(output_dir: &str) -> Self {
        Self {
            output_dir: output_dir.to_string(),
        }
    }

    pub fn render_csv(results: &[SiteResult]) -> String {
        let mut csv = String::from("Website,Email\n");
        for result in results {
            csv.push_str(&format!(
                "{},{}\n",
                escape_csv_field(&result.website),
                escape_csv_field(result.email.as_deref().unwrap_or(""))
            ));
        }
        csv
    }

    pub async fn export_to_file(&self, job: &Job, results: &[SiteResult]) -> Result<String> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let filename = format!(
            "{}/results_{}_{}.csv",
            self.output_dir,
            slugify(&job.name),
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        tokio::fs::write(&filename, Self::render_csv(results)).await?;

        info!("📤 Exported {} results to {}", results.len(), filename);
        Ok(filename)
    }
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn slugify(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let trimmed = slug.trim_matches('_');
    if trimmed.is_empty() {
        "job".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(website: &str, email: Option<&str>) -> SiteResult {
        SiteResult {
            id: None,
            job_id: "job-1".to_string(),
            website: website.to_string(),
            email: email.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_includes_header_and_empty_cells() {
        let rows = vec![
            result("https://acme.com", Some("info@acme.com")),
            result("https://beta.org", None),
        ];
        let csv = ResultExporter::render_csv(&rows);
        assert_eq!(
            csv,
            "Website,Email\nhttps://acme.com,info@acme.com\nhttps://beta.org,\n"
        );
    }

    #[test]
    fn test_csv_fields_are_escaped() {
        assert_eq!(escape_csv_field("plain"), "plain");
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_slugify_flattens_names() {
        assert_eq!(slugify("Q3 Leads / Europe"), "q3_leads___europe");
        assert_eq!(slugify("***"), "job");
    }
}
