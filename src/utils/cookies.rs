// src/utils/cookies.rs

//! Netscape `cookies.txt` loading for authenticated page requests.

use std::path::Path;

use reqwest::header::HeaderValue;

use crate::error::Result;

/// Domain whose cookies are sent with channel page requests.
pub const COOKIE_DOMAIN: &str = "youtube.com";

/// Prefix browsers put in front of HttpOnly rows.
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// One row of a Netscape cookie file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub name: String,
    pub value: String,
}

impl Cookie {
    /// Whether the cookie applies to `domain` or one of its subdomains.
    pub fn matches_domain(&self, domain: &str) -> bool {
        let own = self.domain.trim_start_matches('.');
        own.eq_ignore_ascii_case(domain)
            || own
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", domain.to_ascii_lowercase()))
    }
}

/// Parse a Netscape cookie file.
///
/// Rows are tab-separated: domain, include-subdomains flag, path, secure,
/// expiry, name, value. Comments, blank lines and short rows are skipped.
pub fn parse_netscape(content: &str) -> Vec<Cookie> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim_end_matches(['\r', '\n']);
            let line = line.strip_prefix(HTTP_ONLY_PREFIX).unwrap_or(line);
            if line.trim().is_empty() || line.starts_with('#') {
                return None;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 7 {
                return None;
            }
            Some(Cookie {
                domain: fields[0].trim().to_string(),
                path: fields[2].to_string(),
                secure: fields[3].eq_ignore_ascii_case("true"),
                name: fields[5].to_string(),
                value: fields[6].trim().to_string(),
            })
        })
        .filter(|cookie| !cookie.name.is_empty())
        .collect()
}

/// Build a `Cookie` header from the cookies matching `domain`.
///
/// Returns `None` when no cookie matches or the result is not a valid header.
pub fn cookie_header(cookies: &[Cookie], domain: &str) -> Option<HeaderValue> {
    let pairs: Vec<String> = cookies
        .iter()
        .filter(|cookie| cookie.matches_domain(domain))
        .map(|cookie| format!("{}={}", cookie.name, cookie.value))
        .collect();
    if pairs.is_empty() {
        return None;
    }
    HeaderValue::from_str(&pairs.join("; ")).ok()
}

/// Read a cookie file and build the header for `domain`.
pub async fn load_cookie_header(path: &Path, domain: &str) -> Result<Option<HeaderValue>> {
    let content = tokio::fs::read_to_string(path).await?;
    let cookies = parse_netscape(&content);
    let header = cookie_header(&cookies, domain);
    log::debug!(
        "Read {} cookies from {} ({} for {})",
        cookies.len(),
        path.display(),
        cookies.iter().filter(|c| c.matches_domain(domain)).count(),
        domain
    );
    Ok(header)
}
