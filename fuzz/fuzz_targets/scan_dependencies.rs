#![no_main]
use libfuzzer_sys::fuzz_target;
use texcache_package::{DependencyScanner, MacroDependencyScanner, PathClassifier, TdsClassifier};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let deps = MacroDependencyScanner.scan(&text, "fuzz");
    assert!(!deps.contains("fuzz"));

    for line in text.lines() {
        if let Some(placement) = TdsClassifier.classify(line, "fuzz") {
            assert!(placement.target.starts_with("texlive-dist/"));
        }
    }
});
