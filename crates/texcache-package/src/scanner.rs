use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// `\RequirePackage`, `\RequirePackageWithOptions` or `\usepackage`, an optional
/// `[...]` argument, then the `{a,b,c}` list.
pub const DEPENDENCY_PATTERN: &str =
    r"\\(?:RequirePackageWithOptions|RequirePackage|usepackage)\s*(?:\[[^\]]*\])?\s*\{([^}]*)\}";

static DEPENDENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEPENDENCY_PATTERN).expect("valid dependency pattern"));

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("valid identifier pattern"));

/// Extracts the packages a TeX source depends on.
pub trait DependencyScanner: std::fmt::Debug + Send + Sync {
    /// Returns every dependency named in `text`, never `package` itself.
    fn scan(&self, text: &str, package: &str) -> BTreeSet<String>;
}

/// Regex scan over the loading macros, ignoring `%` comments.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacroDependencyScanner;

impl DependencyScanner for MacroDependencyScanner {
    fn scan(&self, text: &str, package: &str) -> BTreeSet<String> {
        let code = strip_comments(text);
        let mut deps = BTreeSet::new();

        for cap in DEPENDENCY_RE.captures_iter(&code) {
            let Some(list) = cap.get(1) else { continue };
            for name in list.as_str().split(',').map(str::trim) {
                if name != package && IDENTIFIER_RE.is_match(name) {
                    deps.insert(name.to_string());
                }
            }
        }

        deps
    }
}

/// Drops everything after an unescaped `%` on each line.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let mut escaped = false;
        let mut end = line.len();
        for (i, c) in line.char_indices() {
            match c {
                '\\' => escaped = !escaped,
                '%' if !escaped => {
                    end = i;
                    break;
                }
                _ => escaped = false,
            }
        }
        out.push_str(&line[..end]);
        out.push('\n');
    }
    out
}
