//! Tar/pax archive filter.
//!
//! Operates on the decompressed byte stream of a stage: when the first
//! block carries the ustar/gnutar magic, the worker walks header and
//! body blocks, streaming each regular file into its own pipe part.
//! Pax extended headers (`x`, `path=`) and gnu long names (`L`) are
//! honoured; directories and specials are skipped.

use tracing::warn;

use crate::magic::is_tar_block;
use crate::source::ZSource;
use crate::worker::{Stage, cstr, top_up};

const BLOCK: usize = 512;

impl Stage {
    /// Returns true when the stream was a tar archive and has been
    /// fully handled (even if cut short by an error or cancellation).
    pub(crate) fn filter_tar(
        &mut self,
        source: &mut ZSource,
        archive: &str,
        buf: &mut [u8],
        len: &mut usize,
    ) -> bool {
        if *len <= BLOCK || !is_tar_block(&buf[..*len]) {
            return false;
        }
        self.set_extracting(true);
        let mut long_path = String::new();
        while !self.stopped() {
            // header fields
            let name = cstr(&buf[0..100]);
            let prefix = cstr(&buf[345..345 + 155]);
            let size: u64 = if buf[124] == 0x80 {
                // gnu 11-byte big-endian size with a marker byte
                buf[125..136].iter().fold(0u64, |s, &b| (s << 8) + b as u64)
            } else if buf[124] == 0xff {
                buf[124..136].iter().fold(0u64, |s, &b| (s << 8) + b as u64)
            } else {
                u64::from_str_radix(cstr(&buf[124..136]).trim(), 8).unwrap_or(0)
            };
            let typeflag = buf[156];
            let is_regular = typeflag == b'0' || typeflag == 0;
            let is_xhd = typeflag == b'x';
            let is_extended = typeflag == b'L';
            let padding = (BLOCK as u64 - size % BLOCK as u64) % BLOCK as u64;

            let path = if long_path.is_empty() {
                if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                }
            } else {
                std::mem::take(&mut long_path)
            };

            // drop the header block
            buf.copy_within(BLOCK..*len, 0);
            *len -= BLOCK;

            let minlen = (*len).min(size as usize);
            let selected = is_regular && !self.hidden(&path);

            if is_xhd {
                // pax extended header: extract the path= attribute
                let body = &buf[..minlen];
                if let Some(at) = find(body, b"path=")
                    && let Some(end) = body[at..].iter().position(|&b| b == b'\n')
                {
                    long_path = String::from_utf8_lossy(&body[at + 5..at + end]).into_owned();
                }
            } else if is_extended {
                // gnu long name record
                long_path = cstr(&buf[..minlen]);
            }

            if selected {
                if !self.wait_pipe_ready() {
                    break;
                }
                self.assign_part(&[archive, &path]);
            }

            // stream the body
            let mut ok = selected;
            let mut size_left = size;
            while size_left > 0 && !self.stopped() {
                if *len == 0 {
                    *len = match source.decompress(buf) {
                        Ok(0) => {
                            warn!("premature end of tar data");
                            self.notify_assigned();
                            return true;
                        }
                        Ok(n) => n,
                        Err(e) => {
                            warn!("{e}");
                            self.notify_assigned();
                            return true;
                        }
                    };
                }
                let n = (*len).min(size_left as usize);
                if ok && !self.write_block(&buf[..n]) {
                    ok = false;
                }
                size_left -= n as u64;
                buf.copy_within(n..*len, 0);
                *len -= n;
            }
            if self.stopped() {
                break;
            }

            // refill and skip the padding to the next header
            if top_up(source, buf, len).is_err() {
                break;
            }
            if *len > padding as usize {
                buf.copy_within(padding as usize..*len, 0);
                *len -= padding as usize;
            }
            // too short or not a header block: done
            if *len <= BLOCK || buf[0] == 0 || !is_tar_block(&buf[..*len]) {
                break;
            }
            if selected {
                self.close_pipe();
            }
        }
        self.notify_assigned();
        true
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
}
