use crate::identity::{digest, extension_of, name_from, random_name, SHORT_NAME_LEN};

#[test]
fn digest_is_deterministic() {
    let first = digest(b"hello world");
    let second = digest(b"hello world");
    assert_eq!(first, second);
    assert_ne!(first, digest(b"hello worlds"));
}

#[test]
fn digest_is_uppercase_hex() {
    let hash = digest(b"some content");
    assert_eq!(hash.len(), 32);
    assert!(hash.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
}

#[test]
fn empty_content_hashes_to_empty_string_digest() {
    // MD5 of the empty byte string; a valid name, not an error.
    assert_eq!(digest(b""), "D41D8CD98F00B204E9800998ECF8427E");
}

#[test]
fn full_name_keeps_whole_digest() {
    let hash = digest(b"abc");
    let name = name_from(&hash, ".txt", true);
    assert_eq!(name.len(), 32 + ".txt".len());
    assert!(name.ends_with(".txt"));
    assert!(name.starts_with(&hash));
}

#[test]
fn short_name_keeps_fixed_prefix() {
    let hash = digest(b"abc");
    let name = name_from(&hash, ".rs", false);
    assert_eq!(name.len(), SHORT_NAME_LEN + ".rs".len());
    assert!(name.starts_with(&hash[..SHORT_NAME_LEN]));
}

#[test]
fn random_name_respects_short_form() {
    let name = random_name(".png", false);
    assert_eq!(name.len(), SHORT_NAME_LEN + ".png".len());
    assert!(name.ends_with(".png"));
}

#[test]
fn random_name_hard_to_guess_is_longer() {
    let name = random_name(".png", true);
    assert!(name.len() > SHORT_NAME_LEN + ".png".len());
}

#[test]
fn extension_extraction() {
    assert_eq!(extension_of("report.pdf"), ".pdf");
    assert_eq!(extension_of("archive.tar.gz"), ".gz");
    assert_eq!(extension_of("Makefile"), "");
    assert_eq!(extension_of(".bashrc"), "");
}
