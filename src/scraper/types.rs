// src/scraper/types.rs

/// Loose pattern for spotting address-shaped tokens anywhere in a page.
/// Candidates still go through the validator before anything is kept.
pub const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b";

/// Vocabulary for class/id/meta heuristics.
pub const CONTACT_ATTR_HINTS: [&str; 8] = [
    "email", "e-mail", "mail", "contact", "kontakt", "contacto", "correo", "courriel",
];

/// Phrases that mark a block of copy as enquiry-related on contact pages.
pub const CONTACT_TEXT_HINTS: [&str; 8] = [
    "enquiry",
    "enquiries",
    "inquiry",
    "get in touch",
    "reach out",
    "write to us",
    "email us",
    "contact us",
];

/// Paths probed after the home page, joined onto the site root. Each fetch
/// is best-effort.
pub const CONTACT_PATHS: [&str; 30] = [
    "/contact",
    "/contact-us",
    "/contactus",
    "/contact_us",
    "/contact.html",
    "/contact.php",
    "/contact-us.html",
    "/contacts",
    "/about",
    "/about-us",
    "/aboutus",
    "/about.html",
    "/about-us.html",
    "/team",
    "/our-team",
    "/support",
    "/help",
    "/impressum",
    "/imprint",
    "/legal",
    "/legal-notice",
    "/mentions-legales",
    "/kontakt",
    "/contacto",
    "/contactez-nous",
    "/nous-contacter",
    "/get-in-touch",
    "/reach-us",
    "/connect",
    "/customer-service",
];

/// Freemail providers scanned for directly in the raw markup, catching
/// addresses tucked into attributes or generated fragments.
pub const PROVIDER_DOMAINS: [&str; 25] = [
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "yahoo.co.uk",
    "ymail.com",
    "hotmail.com",
    "hotmail.co.uk",
    "outlook.com",
    "live.com",
    "msn.com",
    "aol.com",
    "icloud.com",
    "me.com",
    "protonmail.com",
    "proton.me",
    "gmx.com",
    "gmx.de",
    "gmx.net",
    "web.de",
    "mail.com",
    "mail.ru",
    "yandex.com",
    "yandex.ru",
    "zoho.com",
    "fastmail.com",
];

/// Local parts that mark an address as a deliberate contact channel. The
/// first ranked candidate mentioning one of these is picked for the site.
pub const PRIORITY_LOCAL_PARTS: [&str; 4] = ["contact", "info", "hello", "support"];

/// A successfully fetched page together with the URL variant that worked,
/// so contact paths get joined onto the protocol that actually answered.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub base_url: String,
    pub html: String,
}
