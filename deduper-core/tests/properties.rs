use deduper_core::manifest::{parse_line, ManifestWriter};
use deduper_core::signature::PARTIAL_BYTES;
use deduper_core::{compute_signature, Format};
use proptest::prelude::*;
use sha1::{Digest, Sha1};

fn any_format() -> impl Strategy<Value = Format> {
    prop::sample::select(Format::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn signature_matches_reference_digest(
        data in prop::collection::vec(any::<u8>(), 0..4096),
        format in any_format(),
    ) {
        let td = tempfile::tempdir().unwrap();
        let p = td.path().join("f");
        std::fs::write(&p, &data).unwrap();

        let mode = format.mode();
        let hashed = if mode.partial {
            &data[..data.len().min(PARTIAL_BYTES as usize)]
        } else {
            &data[..]
        };
        let mut expected = format!("{:x}", Sha1::digest(hashed));
        if mode.include_file_size {
            expected.push_str(&format!(":{}", data.len()));
        }

        let sig = compute_signature(&p, format).unwrap();
        prop_assert_eq!(sig.as_str(), expected.as_str());
        prop_assert_eq!(compute_signature(&p, format).unwrap(), sig);
    }

    #[test]
    fn written_entries_parse_back(
        rel in "[a-zA-Z0-9 ._-]{0,12}(/[a-zA-Z0-9 ._-]{1,12}){0,3}[a-zA-Z0-9_]",
        size in any::<u64>(),
    ) {
        let sig = deduper_core::Signature::from(format!("{:040x}:{}", 0xdead_beefu64, size));
        let mut w = ManifestWriter::new(Vec::new(), Format::FullWithSize).unwrap();
        w.write_entry(&sig, &rel).unwrap();
        let text = String::from_utf8(w.finish().unwrap()).unwrap();
        let line = text.lines().nth(1).unwrap();
        let entry = parse_line(2, line).unwrap().unwrap();
        prop_assert_eq!(entry.signature, sig);
        prop_assert_eq!(entry.rel_path, rel);
    }
}
