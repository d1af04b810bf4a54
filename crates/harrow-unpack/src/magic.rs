//! Container detection by magic bytes.

/// Compression and archive container kinds detected from a stream head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Container {
    Gzip,
    Bzip2,
    Xz,
    Zstd,
    Zip,
    /// No recognized compression; may still be tar or cpio.
    Plain,
}

/// Detect the compression container from the first stream bytes.
pub fn detect(head: &[u8]) -> Container {
    if head.starts_with(&[0x1f, 0x8b]) {
        Container::Gzip
    } else if head.starts_with(b"BZh") {
        Container::Bzip2
    } else if head.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
        Container::Xz
    } else if head.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
        Container::Zstd
    } else if head.starts_with(&[0x50, 0x4b, 0x03, 0x04]) {
        Container::Zip
    } else {
        Container::Plain
    }
}

/// True when `block` (at least 512 bytes) is a tar/pax header block:
/// `"ustar\0"` (POSIX) or `"ustar "` (GNU) magic at offset 257.
pub fn is_tar_block(block: &[u8]) -> bool {
    const USTAR: &[u8; 8] = &[b'u', b's', b't', b'a', b'r', 0, b'0', b'0'];
    const GNUTAR: &[u8; 8] = &[b'u', b's', b't', b'a', b'r', b' ', b' ', 0];
    block.len() > 257 + 8
        && block[0] != 0
        && (&block[257..265] == USTAR || &block[257..265] == GNUTAR)
}

/// True when the buffer starts with a cpio magic: `070707` (odc) or
/// `070701`/`070702` (newc without/with CRC).
pub fn is_cpio_header(head: &[u8]) -> bool {
    head.len() >= 6
        && (&head[..6] == b"070707" || &head[..6] == b"070701" || &head[..6] == b"070702")
}
