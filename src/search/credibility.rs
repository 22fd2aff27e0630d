//! Source credibility lookup.

use url::Url;

use crate::core::config::CredibilityTable;

/// Host of `url`, lowercased, without a leading `www.`.
pub fn source_domain(url: &str) -> String {
    let host = Url::parse(url.trim())
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
        .unwrap_or_default();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

/// Credibility of `domain`, matching the domain itself or its nearest
/// listed parent domain, else the table default. Always within [0, 1].
pub fn credibility_for_domain(domain: &str, table: &CredibilityTable) -> f64 {
    let domain = domain.trim().trim_end_matches('.').to_lowercase();
    let mut candidate = domain.as_str();
    loop {
        if candidate.is_empty() {
            break;
        }
        if let Some(score) = table.domains.get(candidate) {
            return score.clamp(0.0, 1.0);
        }
        match candidate.split_once('.') {
            Some((_, parent)) if parent.contains('.') => candidate = parent,
            _ => break,
        }
    }
    table.default_score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CredibilityTable {
        let mut table = CredibilityTable {
            default_score: 0.4,
            domains: Default::default(),
        };
        table.domains.insert("wikipedia.org".to_string(), 0.9);
        table.domains.insert("dictionary.cambridge.org".to_string(), 0.95);
        table.domains.insert("org".to_string(), 0.1);
        table
    }

    #[test]
    fn domain_is_lowercased_and_www_stripped() {
        assert_eq!(source_domain("https://WWW.Example.COM/path?q=1"), "example.com");
        assert_eq!(source_domain("https://en.wikipedia.org/wiki/Tense"), "en.wikipedia.org");
        assert_eq!(source_domain("not a url"), "");
    }

    #[test]
    fn parent_domain_matches() {
        let table = table();
        assert_eq!(credibility_for_domain("en.wikipedia.org", &table), 0.9);
        assert_eq!(credibility_for_domain("dictionary.cambridge.org", &table), 0.95);
    }

    #[test]
    fn unknown_domain_gets_default_and_tld_entries_are_ignored() {
        let table = table();
        assert_eq!(credibility_for_domain("example.org", &table), 0.4);
        assert_eq!(credibility_for_domain("", &table), 0.4);
    }
}
