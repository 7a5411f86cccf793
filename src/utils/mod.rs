//! Utility functions and helpers.

pub mod iter;
pub mod retry;

/// Slugify a string into a filesystem-safe token.
///
/// Alphanumerics are kept (lowercased); characters in `retain` survive
/// untouched; everything else collapses into single underscores.
pub fn slugify(input: &str, retain: &[char]) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_sep = false;
    for c in input.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_was_sep = false;
        } else if retain.contains(&c) {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_replaces_punct() {
        assert_eq!(slugify("Some Handle!", &[]), "some_handle");
    }

    #[test]
    fn slugify_retains_allowlisted_punct() {
        assert_eq!(slugify("@handle", &['@']), "@handle");
    }

    #[test]
    fn slugify_collapses_runs() {
        assert_eq!(
            slugify("@acme_2026-01-02 03:04:05", &['@']),
            "@acme_2026_01_02_03_04_05"
        );
    }

    #[test]
    fn slugify_is_deterministic() {
        let a = slugify("@handle_2026-01-01 00:00:00", &['@']);
        let b = slugify("@handle_2026-01-01 00:00:00", &['@']);
        assert_eq!(a, b);
    }
}
