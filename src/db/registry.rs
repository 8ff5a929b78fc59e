//! Allow-list registry for per-strategy signal tables.
//!
//! Table identifiers are never built from request input. A requested name is
//! resolved against this fixed registry and additionally checked against a
//! strict identifier pattern before it may appear in any SQL text.

/// Signal tables the bot maintains and the dashboard may read.
const SIGNAL_TABLES: &[&str] = &[
    "signals_scalp",
    "signals_swing",
    "signals_grid",
    "signals_hedge",
];

/// Resolve a requested signal-table name to a static, allow-listed
/// identifier. Returns `None` for anything outside the registry.
pub fn signal_table(requested: &str) -> Option<&'static str> {
    if !is_strict_identifier(requested) {
        return None;
    }
    SIGNAL_TABLES.iter().copied().find(|t| *t == requested)
}

pub fn signal_tables() -> &'static [&'static str] {
    SIGNAL_TABLES
}

/// `[a-z][a-z0-9_]*`, bounded length. Belt-and-braces on top of the
/// allow-list membership check.
fn is_strict_identifier(name: &str) -> bool {
    if name.is_empty() || name.len() > 63 {
        return false;
    }
    let mut chars = name.chars();
    let first = chars.next().unwrap_or('_');
    first.is_ascii_lowercase()
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tables_resolve() {
        assert_eq!(signal_table("signals_scalp"), Some("signals_scalp"));
        assert_eq!(signal_table("signals_hedge"), Some("signals_hedge"));
    }

    #[test]
    fn unknown_or_hostile_names_are_rejected() {
        assert_eq!(signal_table("signals_unknown"), None);
        assert_eq!(signal_table("users"), None);
        assert_eq!(signal_table("signals_scalp; DROP TABLE users"), None);
        assert_eq!(signal_table("Signals_Scalp"), None);
        assert_eq!(signal_table(""), None);
    }

    #[test]
    fn every_registered_table_passes_the_pattern() {
        for t in signal_tables() {
            assert!(is_strict_identifier(t), "{t} fails the identifier pattern");
        }
    }
}
