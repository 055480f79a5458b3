//! Mapping from archive-internal paths to installable TDS locations.
//!
//! Real archives are inconsistent: some ship a proper `tex/latex/<pkg>/` tree,
//! some put every file at the top level, some wrap everything in an extra
//! directory named after the release. The [`TdsClassifier`] keeps a recognised
//! TDS subtree verbatim and falls back to a per-extension default otherwise.

use sha2::{Digest, Sha256};

/// Extensions of TeX input files (styles, classes, definitions, configs, sources,
/// font definitions, class options, language definitions, format loaders).
pub const TEX_EXTENSIONS: &[&str] = &["sty", "cls", "def", "cfg", "tex", "fd", "clo", "ldf", "ltx"];

/// Font extensions and the TDS directory they land in when the archive does not say.
pub const FONT_DIRECTORIES: &[(&str, &str)] = &[
    ("pfb", "fonts/type1/public"),
    ("afm", "fonts/afm/public"),
    ("tfm", "fonts/tfm/public"),
    ("vf", "fonts/vf/public"),
    ("map", "fonts/map/dvips"),
    ("enc", "fonts/enc/dvips"),
];

/// Directories whose contents are never installed.
pub const EXCLUDED_DIRS: &[&str] = &["doc", "source"];

/// `tex/<tree>/<name>/` subtrees that are preserved as-is.
pub const TEX_TREES: &[&str] = &["latex", "generic"];

/// Prefix of every installable path.
pub const INSTALL_ROOT: &str = "texlive-dist";

/// Where TeX sources go when no TDS subtree is recognised.
pub const DEFAULT_TEX_DIR: &str = "tex/latex";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Stored as text and scanned for dependencies.
    TexSource,
    /// Stored base64.
    Font,
}

/// Where an archive entry should be installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub target: String,
    pub kind: FileKind,
}

/// Strategy deciding whether and where an archive entry is installed.
///
/// Returning `None` drops the entry.
pub trait PathClassifier: std::fmt::Debug + Send + Sync {
    fn classify(&self, path: &str, package: &str) -> Option<Placement>;
}

/// The default TDS-aware classifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct TdsClassifier;

impl PathClassifier for TdsClassifier {
    fn classify(&self, path: &str, package: &str) -> Option<Placement> {
        let normalized = path.replace('\\', "/");
        let segments: Vec<&str> = normalized
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        let (file_name, dirs) = segments.split_last()?;

        if dirs.iter().any(|d| EXCLUDED_DIRS.contains(d)) {
            return None;
        }

        let ext = extension(file_name)?;

        if TEX_EXTENSIONS.contains(&ext.as_str()) {
            let target = match find_tex_tree(&segments) {
                Some(start) => format!("{}/{}", INSTALL_ROOT, segments[start..].join("/")),
                None => format!("{}/{}/{}/{}", INSTALL_ROOT, DEFAULT_TEX_DIR, package, file_name),
            };
            return Some(Placement {
                target,
                kind: FileKind::TexSource,
            });
        }

        let (_, default_dir) = FONT_DIRECTORIES.iter().find(|(e, _)| *e == ext)?;
        let target = match find_fonts_tree(&segments) {
            Some(start) => format!("{}/{}", INSTALL_ROOT, segments[start..].join("/")),
            None => format!("{}/{}/{}/{}", INSTALL_ROOT, default_dir, package, file_name),
        };
        Some(Placement {
            target,
            kind: FileKind::Font,
        })
    }
}

fn extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Index of a `tex` segment followed by a known tree and a package directory.
fn find_tex_tree(segments: &[&str]) -> Option<usize> {
    let last = segments.len() - 1;
    (0..segments.len()).find(|&i| {
        segments[i] == "tex"
            && i + 2 < last
            && TEX_TREES.contains(&segments[i + 1])
    })
}

/// Index of a `fonts` segment followed by at least a kind directory.
fn find_fonts_tree(segments: &[&str]) -> Option<usize> {
    let last = segments.len() - 1;
    (0..segments.len()).find(|&i| segments[i] == "fonts" && i + 1 < last)
}

/// SHA-256 over every table that shapes the decoded output.
///
/// Cached payloads are only valid for the rules they were produced with, so the
/// cache version is pinned against this value.
pub fn rules_fingerprint() -> String {
    let mut hasher = Sha256::new();
    for ext in TEX_EXTENSIONS {
        hasher.update(format!("tex:{}\n", ext));
    }
    for (ext, dir) in FONT_DIRECTORIES {
        hasher.update(format!("font:{}={}\n", ext, dir));
    }
    for dir in EXCLUDED_DIRS {
        hasher.update(format!("skip:{}\n", dir));
    }
    for tree in TEX_TREES {
        hasher.update(format!("tree:{}\n", tree));
    }
    hasher.update(format!("root:{}\n", INSTALL_ROOT));
    hasher.update(format!("default:{}\n", DEFAULT_TEX_DIR));
    hasher.update(format!("deps:{}\n", crate::scanner::DEPENDENCY_PATTERN));
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(path: &str) -> Option<String> {
        TdsClassifier.classify(path, "bar").map(|p| p.target)
    }

    #[test]
    fn test_tds_latex_subtree_is_preserved() {
        assert_eq!(
            target("foo/tex/latex/bar/bar.sty").as_deref(),
            Some("texlive-dist/tex/latex/bar/bar.sty")
        );
        assert_eq!(
            target("tex/latex/bar/sub/bar-extra.def").as_deref(),
            Some("texlive-dist/tex/latex/bar/sub/bar-extra.def")
        );
    }

    #[test]
    fn test_generic_subtree() {
        assert_eq!(
            target("/tex/generic/pgf/pgf.tex").as_deref(),
            Some("texlive-dist/tex/generic/pgf/pgf.tex")
        );
    }

    #[test]
    fn test_flat_source_defaults_to_package_dir() {
        assert_eq!(
            target("bar/bar.cls").as_deref(),
            Some("texlive-dist/tex/latex/bar/bar.cls")
        );
        // `tex/latex` without a package directory is not a TDS subtree.
        assert_eq!(
            target("tex/latex/bar.sty").as_deref(),
            Some("texlive-dist/tex/latex/bar/bar.sty")
        );
    }

    #[test]
    fn test_fonts_subtree_is_preserved() {
        let placement = TdsClassifier
            .classify("fonts/type1/public/bar/bar.pfb", "bar")
            .unwrap();
        assert_eq!(placement.target, "texlive-dist/fonts/type1/public/bar/bar.pfb");
        assert_eq!(placement.kind, FileKind::Font);
    }

    #[test]
    fn test_font_fallback_table() {
        assert_eq!(target("bar.tfm").as_deref(), Some("texlive-dist/fonts/tfm/public/bar/bar.tfm"));
        assert_eq!(target("x/bar.MAP").as_deref(), Some("texlive-dist/fonts/map/dvips/bar/bar.MAP"));
        assert_eq!(target("bar.enc").as_deref(), Some("texlive-dist/fonts/enc/dvips/bar/bar.enc"));
    }

    #[test]
    fn test_excluded_trees() {
        assert_eq!(target("doc/manual.pdf"), None);
        assert_eq!(target("/doc/latex/bar/bar.sty"), None);
        assert_eq!(target("source/bar.dtx"), None);
        assert_eq!(target("bar/source/latex/bar/bar.sty"), None);
    }

    #[test]
    fn test_unknown_extensions_are_dropped() {
        assert_eq!(target("bar/README"), None);
        assert_eq!(target("bar/bar.ins"), None);
        assert_eq!(target("bar/.sty"), None);
        assert_eq!(target("bar/"), None);
    }

    #[test]
    fn test_rules_fingerprint_is_stable_hex() {
        let fp = rules_fingerprint();
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, rules_fingerprint());
    }
}
