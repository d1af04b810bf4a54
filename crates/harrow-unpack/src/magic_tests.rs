use crate::magic::{Container, detect, is_cpio_header, is_tar_block};

#[test]
fn detects_compression_magics() {
    assert_eq!(detect(&[0x1f, 0x8b, 0x08, 0x00]), Container::Gzip);
    assert_eq!(detect(b"BZh91AY"), Container::Bzip2);
    assert_eq!(
        detect(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00, 0x00]),
        Container::Xz
    );
    assert_eq!(detect(&[0x28, 0xb5, 0x2f, 0xfd, 0x04]), Container::Zstd);
    assert_eq!(detect(b"PK\x03\x04xxxx"), Container::Zip);
    assert_eq!(detect(b"plain text"), Container::Plain);
    assert_eq!(detect(&[]), Container::Plain);
}

#[test]
fn tar_magic_sits_at_offset_257() {
    let mut block = vec![0u8; 512];
    block[0] = b'f'; // name must be non-empty
    block[257..265].copy_from_slice(b"ustar\x0000");
    assert!(is_tar_block(&block));

    block[257..265].copy_from_slice(b"ustar  \x00");
    assert!(is_tar_block(&block));

    block[257..265].copy_from_slice(b"notatar\x00");
    assert!(!is_tar_block(&block));

    // an empty name byte rejects the block
    block[0] = 0;
    block[257..265].copy_from_slice(b"ustar\x0000");
    assert!(!is_tar_block(&block));
}

#[test]
fn cpio_magics() {
    assert!(is_cpio_header(b"070707rest"));
    assert!(is_cpio_header(b"070701rest"));
    assert!(is_cpio_header(b"070702rest"));
    assert!(!is_cpio_header(b"070700rest"));
    assert!(!is_cpio_header(b"07070"));
}
