//! Slug derivation for notes
//! --------------------------
//! Titles are normalized to lowercase ASCII slugs; collisions are resolved by
//! appending `-1`, `-2`, ... until the slug is unused.

/// Normalize a title into a slug: lowercase, alphanumerics and underscores
/// kept, runs of anything else collapsed into single hyphens, edges trimmed.
pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_sep = false;
    for ch in title.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            for lc in ch.to_lowercase() {
                out.push(lc);
            }
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Derive a unique slug for `title`, given a predicate that reports whether a
/// candidate slug is already taken. The caller holds the store's write lock,
/// so the check-then-use sequence cannot race.
pub fn unique_slug<F>(title: &str, taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    let base = slugify(title);
    if !taken(&base) {
        return base;
    }
    let mut num = 1usize;
    loop {
        let candidate = format!("{}-{}", base, num);
        if !taken(&candidate) {
            return candidate;
        }
        num += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Spaced   out!  "), "spaced-out");
        assert_eq!(slugify("snake_case kept"), "snake_case-kept");
        assert_eq!(slugify("Émile's notes"), "émile-s-notes");
    }

    #[test]
    fn unique_slug_appends_numeric_suffix() {
        let mut existing: HashSet<String> = HashSet::new();
        let s1 = unique_slug("Hello World", |s| existing.contains(s));
        existing.insert(s1.clone());
        let s2 = unique_slug("Hello World", |s| existing.contains(s));
        existing.insert(s2.clone());
        let s3 = unique_slug("Hello World", |s| existing.contains(s));
        assert_eq!(s1, "hello-world");
        assert_eq!(s2, "hello-world-1");
        assert_eq!(s3, "hello-world-2");
    }
}
