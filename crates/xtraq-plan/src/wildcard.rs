//! Minimal wildcard matching for `XTRAQ_BUILD_PROCEDURES` / `--filter`
//!: `*` matches any run of characters, `?` matches
//! exactly one, comparison is case-insensitive.

pub fn matches(pattern: &str, candidate: &str) -> bool {
    matches_ci(&pattern.to_lowercase(), &candidate.to_lowercase())
}

fn matches_ci(pattern: &str, candidate: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let c: Vec<char> = candidate.chars().collect();
    matches_rec(&p, &c)
}

fn matches_rec(p: &[char], c: &[char]) -> bool {
    match p.first() {
        None => c.is_empty(),
        Some('*') => {
            // Try matching zero chars, then progressively more.
            matches_rec(&p[1..], c) || (!c.is_empty() && matches_rec(p, &c[1..]))
        }
        Some('?') => !c.is_empty() && matches_rec(&p[1..], &c[1..]),
        Some(ch) => c.first() == Some(ch) && matches_rec(&p[1..], &c[1..]),
    }
}

/// True if `candidate` matches any pattern in `patterns`, or `patterns` is
/// empty (empty allow-list means "no restriction").
pub fn matches_any(patterns: &[String], candidate: &str) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| matches(p, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_any_suffix() {
        assert!(matches("Get*", "GetUsers"));
        assert!(!matches("Get*", "ListUsers"));
    }

    #[test]
    fn question_mark_matches_single_char() {
        assert!(matches("Get?sers", "GetUsers"));
        assert!(!matches("Get?sers", "GetUUsers"));
    }

    #[test]
    fn empty_allow_list_matches_everything() {
        assert!(matches_any(&[], "anything"));
    }

    #[test]
    fn case_insensitive() {
        assert!(matches("get*", "GetUsers"));
    }
}
