use deduper_core::show::show_signature;
use deduper_core::signature::PARTIAL_BYTES;
use deduper_core::{compute_signature, Format};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};

fn write_random(path: &std::path::Path, bytes: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<u8> = (0..bytes).map(|_| rng.gen()).collect();
    fs::write(path, data).unwrap();
}

#[test]
fn tail_change_only_affects_full_formats() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("big.bin");
    write_random(&p, 256 * 1024 + 17, 7);

    let before: Vec<_> = Format::ALL.iter().map(|f| compute_signature(&p, *f).unwrap()).collect();

    // Flip bytes well past the partial window.
    let mut f = OpenOptions::new().read(true).write(true).open(&p).unwrap();
    f.seek(SeekFrom::Start(PARTIAL_BYTES + 4096)).unwrap();
    f.write_all(&[0x5Au8; 64]).unwrap();
    drop(f);

    let after: Vec<_> = Format::ALL.iter().map(|f| compute_signature(&p, *f).unwrap()).collect();
    for (i, format) in Format::ALL.iter().enumerate() {
        if format.mode().partial {
            assert_eq!(before[i], after[i], "{format} must ignore the tail");
        } else {
            assert_ne!(before[i], after[i], "{format} must see the tail");
        }
    }
    assert_ne!(after[0].digest(), after[2].digest());
}

#[test]
fn head_change_affects_every_format() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("f.bin");
    write_random(&p, 8192, 11);
    let before: Vec<_> = Format::ALL.iter().map(|f| compute_signature(&p, *f).unwrap()).collect();

    let first = fs::read(&p).unwrap()[0];
    let mut f = OpenOptions::new().write(true).open(&p).unwrap();
    f.write_all(&[!first]).unwrap();
    drop(f);

    for (i, format) in Format::ALL.iter().enumerate() {
        assert_ne!(before[i], compute_signature(&p, *format).unwrap(), "{format}");
    }
}

#[test]
fn partial_equals_full_for_short_files() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("short");
    write_random(&p, PARTIAL_BYTES as usize, 3);
    assert_eq!(
        compute_signature(&p, Format::Partial).unwrap(),
        compute_signature(&p, Format::Full).unwrap()
    );
}

#[test]
fn size_suffix_is_whole_file_length() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("f.bin");
    let len = 3 * 65536 + 123;
    write_random(&p, len, 5);

    for format in [Format::PartialWithSize, Format::FullWithSize] {
        let sig = compute_signature(&p, format).unwrap();
        assert!(sig.as_str().ends_with(&format!(":{len}")), "{sig}");
        assert_eq!(sig.file_size(), Some(len as u64));
        assert_eq!(sig.digest().len(), 40);
    }
    for format in [Format::Partial, Format::Full] {
        let sig = compute_signature(&p, format).unwrap();
        assert_eq!(sig.file_size(), None);
        assert_eq!(sig.as_str().len(), 40);
        assert!(sig.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}

#[test]
fn show_never_appends_size() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("f.bin");
    write_random(&p, 4000, 9);
    for format in Format::ALL {
        let shown = show_signature(&p, format).unwrap();
        assert_eq!(shown.as_str().len(), 40, "{format}");
    }
    assert_eq!(
        show_signature(&p, Format::FullWithSize).unwrap(),
        compute_signature(&p, Format::Full).unwrap()
    );
    assert_eq!(
        show_signature(&p, Format::PartialWithSize).unwrap(),
        compute_signature(&p, Format::Partial).unwrap()
    );
}
