use crate::classify::{FileKind, PathClassifier, TdsClassifier};
use crate::scanner::{DependencyScanner, MacroDependencyScanner};
use crate::{ExtractedFile, ExtractedFileSet};
use anyhow::{bail, Context, Result};
use std::io::{Cursor, Read};

/// Largest inflated entry the decoder accepts.
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Header-declared sizes are untrusted; preallocation never exceeds this.
const INITIAL_READ_CAPACITY: u64 = 1024 * 1024;

/// Decodes ZIP archives into an [`ExtractedFileSet`].
///
/// Classification and dependency scanning are pluggable so stricter rules can
/// be swapped in without touching the decoding loop.
#[derive(Debug)]
pub struct ArchiveDecoder {
    classifier: Box<dyn PathClassifier>,
    scanner: Box<dyn DependencyScanner>,
    max_entry_bytes: u64,
}

impl Default for ArchiveDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveDecoder {
    pub fn new() -> Self {
        Self {
            classifier: Box::new(TdsClassifier),
            scanner: Box::new(MacroDependencyScanner),
            max_entry_bytes: MAX_ENTRY_BYTES,
        }
    }

    pub fn with_strategies(
        classifier: Box<dyn PathClassifier>,
        scanner: Box<dyn DependencyScanner>,
    ) -> Self {
        Self {
            classifier,
            scanner,
            max_entry_bytes: MAX_ENTRY_BYTES,
        }
    }

    pub fn with_max_entry_bytes(mut self, max_entry_bytes: u64) -> Self {
        self.max_entry_bytes = max_entry_bytes;
        self
    }

    /// Decodes `bytes` as a ZIP archive for `package`.
    ///
    /// Returns `Ok(None)` when nothing installable was found. A buffer that is
    /// not a readable ZIP is an error.
    pub fn decode(&self, bytes: &[u8], package: &str) -> Result<Option<ExtractedFileSet>> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(bytes)).context("Failed to open ZIP archive")?;
        let mut set = ExtractedFileSet::new(package);

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .with_context(|| format!("Failed to read ZIP entry #{}", index))?;
            if entry.is_dir() {
                continue;
            }

            let path = entry.name().to_string();
            let Some(placement) = self.classifier.classify(&path, package) else {
                continue;
            };

            let mut data = Vec::with_capacity(entry.size().min(INITIAL_READ_CAPACITY) as usize);
            entry
                .by_ref()
                .take(self.max_entry_bytes.saturating_add(1))
                .read_to_end(&mut data)
                .with_context(|| format!("Failed to inflate {}", path))?;
            if data.len() as u64 > self.max_entry_bytes {
                bail!("{} inflates past {} bytes", path, self.max_entry_bytes);
            }

            let file = match placement.kind {
                FileKind::TexSource => {
                    set.dependencies
                        .extend(self.scanner.scan(&String::from_utf8_lossy(&data), package));
                    match String::from_utf8(data) {
                        Ok(text) => ExtractedFile::text(text),
                        Err(e) => ExtractedFile::base64(e.as_bytes()),
                    }
                }
                FileKind::Font => ExtractedFile::base64(&data),
            };
            set.insert(placement.target, file);
        }

        if set.is_empty() {
            log::info!("No installable files in archive for {}", package);
            return Ok(None);
        }

        log::info!(
            "Decoded {} files ({} dependencies) for {}",
            set.total_files,
            set.dependencies.len(),
            package
        );
        Ok(Some(set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Placement;
    use crate::FileEncoding;
    use std::collections::BTreeSet;
    use std::io::Write;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default();
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_decode_tds_style_file() {
        let zip = build_zip(&[
            ("foo/", b""),
            ("foo/tex/latex/bar/bar.sty", b"\\ProvidesPackage{bar}\n"),
        ]);
        let set = ArchiveDecoder::new().decode(&zip, "bar").unwrap().unwrap();

        assert_eq!(set.total_files, 1);
        let file = &set.files["texlive-dist/tex/latex/bar/bar.sty"];
        assert_eq!(file.encoding, FileEncoding::Text);
        assert_eq!(file.content, "\\ProvidesPackage{bar}\n");
    }

    #[test]
    fn test_decode_font_is_base64_and_lossless() {
        let glyphs: Vec<u8> = (0..=255).collect();
        let zip = build_zip(&[("fonts/type1/public/bar/bar.pfb", &glyphs)]);
        let set = ArchiveDecoder::new().decode(&zip, "bar").unwrap().unwrap();

        let file = &set.files["texlive-dist/fonts/type1/public/bar/bar.pfb"];
        assert_eq!(file.encoding, FileEncoding::Base64);
        assert_eq!(file.decode().unwrap(), glyphs);
    }

    #[test]
    fn test_docs_and_sources_only_yields_nothing() {
        let zip = build_zip(&[("doc/manual.pdf", b"%PDF-1.5"), ("source/bar.dtx", b"% dtx")]);
        assert!(ArchiveDecoder::new().decode(&zip, "bar").unwrap().is_none());
    }

    #[test]
    fn test_dependencies_are_collected_across_files() {
        let zip = build_zip(&[
            ("bar/bar.sty", b"\\RequirePackage[options]{amsmath,graphicx}\\RequirePackage{bar}"),
            ("bar/bar.cls", b"\\RequirePackage{amsmath}\\usepackage{xcolor}"),
            ("bar/README.md", b"\\usepackage{ignored}"),
        ]);
        let set = ArchiveDecoder::new().decode(&zip, "bar").unwrap().unwrap();

        assert_eq!(set.total_files, 2);
        let deps: Vec<&str> = set.dependencies.iter().map(String::as_str).collect();
        assert_eq!(deps, vec!["amsmath", "graphicx", "xcolor"]);
    }

    #[test]
    fn test_non_utf8_source_falls_back_to_base64() {
        let latin1 = b"% caf\xe9\n\\RequirePackage{inputenc}";
        let zip = build_zip(&[("bar.def", latin1)]);
        let set = ArchiveDecoder::new().decode(&zip, "bar").unwrap().unwrap();

        let file = &set.files["texlive-dist/tex/latex/bar/bar.def"];
        assert_eq!(file.encoding, FileEncoding::Base64);
        assert_eq!(file.decode().unwrap(), latin1.to_vec());
        assert!(set.dependencies.contains("inputenc"));
    }

    #[test]
    fn test_malformed_archive_is_an_error() {
        assert!(ArchiveDecoder::new().decode(b"definitely not a zip", "bar").is_err());
    }

    /// Rewrites the uncompressed-size field of every central-directory record.
    fn forge_declared_size(zip: &mut [u8], size: u32) {
        let signature = [0x50, 0x4b, 0x01, 0x02];
        let mut patched = 0;
        let mut i = 0;
        while i + 28 <= zip.len() {
            if zip[i..i + 4] == signature {
                zip[i + 24..i + 28].copy_from_slice(&size.to_le_bytes());
                patched += 1;
            }
            i += 1;
        }
        assert_eq!(patched, 1);
    }

    #[test]
    fn test_forged_entry_size_does_not_drive_allocation() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("bar/bar.sty", options).unwrap();
        writer.write_all(b"\\ProvidesPackage{bar}").unwrap();
        let mut zip = writer.finish().unwrap().into_inner();
        forge_declared_size(&mut zip, 0xFFFF_FFF0);

        match ArchiveDecoder::new().decode(&zip, "bar") {
            Ok(Some(set)) => {
                assert!(set.files["texlive-dist/tex/latex/bar/bar.sty"].content.len() < 64)
            }
            Ok(None) => panic!("entry should classify"),
            Err(_) => {}
        }
    }

    #[test]
    fn test_entry_larger_than_limit_is_an_error() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        writer.start_file("bar/bar.sty", options).unwrap();
        writer.write_all(&[b'%'; 4096]).unwrap();
        let zip = writer.finish().unwrap().into_inner();

        let decoder = ArchiveDecoder::new().with_max_entry_bytes(4095);
        let err = decoder.decode(&zip, "bar").unwrap_err();
        assert!(err.to_string().contains("inflates past"));

        let decoder = ArchiveDecoder::new().with_max_entry_bytes(4096);
        assert!(decoder.decode(&zip, "bar").unwrap().is_some());
    }

    #[derive(Debug)]
    struct FlatClassifier;

    impl PathClassifier for FlatClassifier {
        fn classify(&self, path: &str, _package: &str) -> Option<Placement> {
            Some(Placement {
                target: format!("flat/{}", path.rsplit('/').next()?),
                kind: FileKind::Font,
            })
        }
    }

    #[derive(Debug)]
    struct NoDeps;

    impl DependencyScanner for NoDeps {
        fn scan(&self, _text: &str, _package: &str) -> BTreeSet<String> {
            BTreeSet::new()
        }
    }

    #[test]
    fn test_custom_strategies() {
        let zip = build_zip(&[("a/b/readme.txt", b"hi")]);
        let decoder = ArchiveDecoder::with_strategies(Box::new(FlatClassifier), Box::new(NoDeps));
        let set = decoder.decode(&zip, "bar").unwrap().unwrap();
        assert!(set.files.contains_key("flat/readme.txt"));
    }
}
