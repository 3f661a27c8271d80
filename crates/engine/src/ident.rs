//! Qualified-identifier helpers.
//!
//! Identifiers are dot-separated paths (`pkg.sub.module`). Containment is
//! always tested prefix-plus-separator so `pkg.foo` never "contains"
//! `pkg.foobar`.

pub const SEPARATOR: char = '.';

/// Whether an identifier is acceptable as a node id: non-empty, no empty
/// segments (which rules out leading/trailing/doubled dots).
pub fn is_well_formed(id: &str) -> bool {
    !id.is_empty() && id.split(SEPARATOR).all(|segment| !segment.is_empty())
}

/// Whether `id` lies inside the subtree rooted at `ancestor`, including
/// `ancestor` itself.
pub fn contains(ancestor: &str, id: &str) -> bool {
    match id.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}

/// Number of dot-separated segments.
pub fn depth(id: &str) -> usize {
    id.split(SEPARATOR).count()
}

/// Longest common leading segment sequence across a set of identifiers,
/// joined back with dots. `None` when the set is empty or the identifiers
/// share no leading segment.
pub fn common_prefix<'a, I>(ids: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut iter = ids.into_iter();
    let first = iter.next()?;
    let mut common: Vec<&str> = first.split(SEPARATOR).collect();

    for id in iter {
        let mut matched = 0;
        for (a, b) in common.iter().zip(id.split(SEPARATOR)) {
            if *a != b {
                break;
            }
            matched += 1;
        }
        common.truncate(matched);
        if common.is_empty() {
            return None;
        }
    }

    Some(common.join("."))
}
