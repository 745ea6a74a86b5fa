//! Email address parsing (RFC 5322 §3.4) and normalization helpers.

/// A parsed email address.
///
/// # Examples
/// - `"Ana García <ana@ejemplo.com>"` → `display_name = "Ana García"`, `address = "ana@ejemplo.com"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    /// Sentinel used when a message carries no parseable sender.
    pub fn unknown() -> Self {
        Self {
            display_name: String::new(),
            address: "unknown".to_string(),
        }
    }

    /// Parse a single address from a header value.
    ///
    /// Supported forms: `user@d.com`, `<user@d.com>`, `Name <user@d.com>`,
    /// `"Last, First" <user@d.com>`. On failure the raw string is kept as
    /// the address so the message is still attributable.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        if let Some(angle_start) = trimmed.rfind('<') {
            if let Some(angle_end) = trimmed.rfind('>') {
                if angle_end > angle_start {
                    return Self {
                        display_name: strip_quotes(&trimmed[..angle_start]),
                        address: trimmed[angle_start + 1..angle_end].trim().to_string(),
                    };
                }
            }
        }

        Self {
            display_name: String::new(),
            address: trimmed.to_string(),
        }
    }

    /// Parse a comma-separated address list, respecting quoted commas
    /// (`"Last, First" <a@b.com>, other@c.com`).
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut results = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_angle = false;

        for ch in raw.chars() {
            match ch {
                '"' => {
                    in_quotes = !in_quotes;
                    current.push(ch);
                }
                '<' if !in_quotes => {
                    in_angle = true;
                    current.push(ch);
                }
                '>' if !in_quotes => {
                    in_angle = false;
                    current.push(ch);
                }
                ',' if !in_quotes && !in_angle => {
                    let addr = Self::parse(&current);
                    if !addr.address.is_empty() {
                        results.push(addr);
                    }
                    current.clear();
                }
                _ => current.push(ch),
            }
        }

        let addr = Self::parse(&current);
        if !addr.address.is_empty() {
            results.push(addr);
        }

        results
    }

    /// Lower-cased address, the canonical accumulator key.
    pub fn normalized(&self) -> String {
        self.address.trim().to_lowercase()
    }

    /// Lower-cased domain part after `@`, or `None` for malformed addresses.
    pub fn domain(&self) -> Option<String> {
        let addr = self.address.trim();
        match addr.rsplit_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Some(domain.to_lowercase())
            }
            _ => None,
        }
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let addr = EmailAddress::parse("user@example.com");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "");
    }

    #[test]
    fn test_parse_name_and_address() {
        let addr = EmailAddress::parse("User One <user1@example.com>");
        assert_eq!(addr.address, "user1@example.com");
        assert_eq!(addr.display_name, "User One");
    }

    #[test]
    fn test_parse_quoted_name_with_comma() {
        let addr = EmailAddress::parse("\"Last, First\" <user@example.com>");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "Last, First");
    }

    #[test]
    fn test_parse_list() {
        let list =
            EmailAddress::parse_list("User One <a@b.com>, \"Two, User\" <c@d.com>, plain@addr.com");
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].address, "a@b.com");
        assert_eq!(list[1].display_name, "Two, User");
        assert_eq!(list[2].address, "plain@addr.com");
    }

    #[test]
    fn test_normalized_lowercases() {
        let addr = EmailAddress::parse("Alice <Alice@Example.COM>");
        assert_eq!(addr.normalized(), "alice@example.com");
    }

    #[test]
    fn test_domain_extraction() {
        assert_eq!(
            EmailAddress::parse("a@X.Com").domain(),
            Some("x.com".to_string())
        );
        assert_eq!(EmailAddress::parse("not-an-address").domain(), None);
        assert_eq!(EmailAddress::parse("@nodomain").domain(), None);
        assert_eq!(EmailAddress::unknown().domain(), None);
    }

    #[test]
    fn test_display() {
        let addr = EmailAddress {
            display_name: "Alice".to_string(),
            address: "alice@example.com".to_string(),
        };
        assert_eq!(addr.display(), "Alice <alice@example.com>");
        assert_eq!(EmailAddress::parse("bob@x.com").display(), "bob@x.com");
    }
}
