use std::collections::HashMap;

/// Names the registry does not index directly, mapped to the package that ships them.
pub const BOOTSTRAP_ALIASES: &[(&str, &str)] = &[
    // Graphics
    ("tikz", "pgf"),
    ("graphicx", "graphics"),
    ("color", "graphics"),
    ("pstricks", "pstricks-base"),
    // Engine extensions
    ("etex", "etex-pkg"),
    // Math
    ("amssymb", "amsfonts"),
    // Bundled in `tools`
    ("multicol", "tools"),
    ("longtable", "tools"),
    ("tabularx", "tools"),
    ("array", "tools"),
    ("verbatim", "tools"),
    ("xspace", "tools"),
    ("calc", "tools"),
    // Misc
    ("subcaption", "caption"),
    ("algorithmic", "algorithms"),
    ("lmodern", "lm"),
    ("times", "psnfss"),
];

/// Immutable alias table consulted before every registry lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    mappings: HashMap<String, String>,
}

impl AliasTable {
    /// The built-in table.
    pub fn bootstrap() -> Self {
        Self::from_pairs(BOOTSTRAP_ALIASES.iter().copied())
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            mappings: pairs
                .into_iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    /// The canonical registry name for `name` (itself when unaliased).
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.mappings.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
