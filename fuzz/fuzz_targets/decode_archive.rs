#![no_main]
use libfuzzer_sys::fuzz_target;
use texcache_package::ArchiveDecoder;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must yield Ok or Err, never a panic.
    let _ = ArchiveDecoder::new().decode(data, "fuzz");
});
