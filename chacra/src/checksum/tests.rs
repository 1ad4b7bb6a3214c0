use super::*;

use std::io::Write;

use tempfile::NamedTempFile;

use crate::error::ChacraError;

const HELLO_SHA512: &str = "9b71d224bd62f3785d96d46ad3ea3d73319bfbc2890caadae2dff72519673ca7\
                            2323c3d99ba5c11d7c7acc6e14b8c5da0c4663475c2e5c3adef46f73bcdec043";

const EMPTY_SHA512: &str = "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce\
                            47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e";

#[test]
fn test_basic() {
    assert_eq!(HELLO_SHA512, Checksum::from_bytes(b"hello").to_hex());
    assert_eq!(EMPTY_SHA512, Checksum::from_bytes(b"").to_hex());
}

#[tokio::test]
async fn test_from_path() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"hello").unwrap();

    let checksum = Checksum::from_path(file.path()).await.unwrap();
    assert_eq!(HELLO_SHA512, checksum.to_hex());

    // unchanged file, same digest
    let again = Checksum::from_path(file.path()).await.unwrap();
    assert_eq!(checksum, again);
}

#[tokio::test]
async fn test_from_path_multiple_chunks() {
    let data: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&data).unwrap();

    let checksum = Checksum::from_path(file.path()).await.unwrap();
    assert_eq!(Checksum::from_bytes(&data), checksum);
}

#[tokio::test]
async fn test_from_path_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.deb");

    let err = Checksum::from_path(&path).await.unwrap_err();
    assert!(matches!(
        err,
        ChacraError::FileUnreadable { path: p, .. } if p == path
    ));
}

#[tokio::test]
async fn test_from_path_directory() {
    let dir = tempfile::tempdir().unwrap();

    let err = Checksum::from_path(dir.path()).await.unwrap_err();
    assert_eq!("FileUnreadable", err.name());
}
