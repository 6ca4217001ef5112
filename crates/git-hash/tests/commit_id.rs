use git_hash::{CommitId, HashError};

#[test]
fn sha256_ids_keep_their_width() {
    let hex = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    let id: CommitId = hex.parse().unwrap();
    assert_eq!(id.as_bytes().len(), 32);
    assert_eq!(id.to_hex(), hex);
    assert_eq!(id.short(), "e3b0c442");
}

#[test]
fn ids_of_different_widths_never_collide() {
    let sha1: CommitId = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4".parse().unwrap();
    let sha256: CommitId = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        .parse()
        .unwrap();
    assert_ne!(sha1, sha256);
    assert_eq!(sha1.short(), sha256.short());
}

#[test]
fn bad_digit_is_reported_with_position() {
    let err = "da39a3ee5e6b4b0d3255bfef95601890afd8070g"
        .parse::<CommitId>()
        .unwrap_err();
    assert!(matches!(err, HashError::InvalidHex { position: 39, character: 'g' }));
    assert_eq!(err.to_string(), "invalid hex character at position 39: 'g'");
}

#[test]
fn refs_are_not_ids() {
    assert!("refs/heads/main".parse::<CommitId>().is_err());
    assert!("".parse::<CommitId>().is_err());
}
