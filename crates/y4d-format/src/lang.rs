use once_cell::sync::Lazy;
use std::collections::HashMap;

// Space-separated synonym groups; the first name in each group is the
// canonical highlighter id.
const ALIAS_GROUPS: &[&str] = &[
    "python py",
    "ruby rb",
    "scala",
    "xml html htm",
    "markdown md",
    "css",
    "json",
    "javascript js",
    "coffeescript coffee",
    "java typescript ts",
    "cpp c++ c hpp h",
    "objectivec objective-c m",
    "cs c#",
    "sql",
    "diff",
    "dos bat cmd",
    "bash sh",
    "haskell hs",
];

static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for group in ALIAS_GROUPS {
        let mut names = group.split(' ');
        if let Some(base) = names.next() {
            map.insert(base, base);
            for name in names {
                map.insert(name, base);
            }
        }
    }
    map
});

/// Resolves a fence language tag to a canonical highlighter id,
/// case-insensitively. `None` means the tag is unknown and the caller should
/// autodetect.
pub fn lookup_language(tag: &str) -> Option<&'static str> {
    ALIASES.get(tag.to_lowercase().as_str()).copied()
}
