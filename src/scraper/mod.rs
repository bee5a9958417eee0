pub mod email_extractor;
pub mod obfuscation;
pub mod script_extractor;
pub mod site_fetcher;
pub mod types;
pub mod validator;

pub use email_extractor::EmailExtractor;
pub use site_fetcher::{normalize_website_url, EmailResolver, SiteFetcher};
pub use validator::EmailValidator;
