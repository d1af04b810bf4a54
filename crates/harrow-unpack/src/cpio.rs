//! Cpio archive filter: odc (`070707`) and newc (`070701`/`070702`).

use tracing::warn;

use crate::magic::is_cpio_header;
use crate::source::ZSource;
use crate::worker::{Stage, cstr, top_up};

const ODC_HEADER: usize = 76;
const NEWC_HEADER: usize = 110;

impl Stage {
    /// Returns true when the stream was a cpio archive and has been
    /// handled; false when it is not cpio at all.
    pub(crate) fn filter_cpio(
        &mut self,
        source: &mut ZSource,
        archive: &str,
        buf: &mut [u8],
        len: &mut usize,
    ) -> bool {
        if *len <= NEWC_HEADER || !is_cpio_header(&buf[..*len]) {
            return false;
        }
        self.set_extracting(true);
        let mut in_progress = false;
        while !self.stopped() {
            let is_odc = buf[5] == b'7';
            let header_len = if is_odc { ODC_HEADER } else { NEWC_HEADER };

            let field = |buf: &[u8], at: usize, n: usize, radix: u32| -> Option<u64> {
                let text = std::str::from_utf8(&buf[at..at + n]).ok()?;
                u64::from_str_radix(text, radix).ok()
            };
            let (namesize, filesize, mode) = if is_odc {
                (
                    field(buf, 59, 6, 8),
                    field(buf, 65, 11, 8),
                    field(buf, 18, 6, 8),
                )
            } else {
                (
                    field(buf, 94, 8, 16),
                    field(buf, 54, 8, 16),
                    field(buf, 14, 8, 16),
                )
            };
            let (Some(namesize), Some(filesize), Some(mode)) = (namesize, filesize, mode) else {
                // a malformed field: not cpio after all, unless we
                // already consumed parts of it
                if in_progress {
                    break;
                }
                return false;
            };
            if namesize <= 1 || namesize >= 65536 {
                break;
            }
            let is_regular = mode & 0o170000 == 0o100000;

            // drop the header
            buf.copy_within(header_len..*len, 0);
            *len -= header_len;

            // pathname, possibly spanning refills
            let mut path_bytes = Vec::with_capacity(namesize as usize);
            let mut size = namesize as usize;
            while size > 0 && !self.stopped() {
                if *len == 0 {
                    *len = match source.decompress(buf) {
                        Ok(0) | Err(_) => {
                            self.notify_assigned();
                            return true;
                        }
                        Ok(n) => n,
                    };
                }
                let n = (*len).min(size);
                path_bytes.extend_from_slice(&buf[..n]);
                size -= n;
                buf.copy_within(n..*len, 0);
                *len -= n;
            }
            let path = cstr(&path_bytes);
            if path == "TRAILER!!!" {
                break;
            }

            if top_up(source, buf, len).is_err() {
                break;
            }
            // newc pads the pathname to a 4-byte boundary
            if !is_odc {
                let pad = (4 - (NEWC_HEADER + namesize as usize) % 4) % 4;
                if *len >= pad {
                    buf.copy_within(pad..*len, 0);
                    *len -= pad;
                }
            }

            let selected = is_regular && !self.hidden(&path);
            if selected {
                if !self.wait_pipe_ready() {
                    break;
                }
                self.assign_part(&[archive, &path]);
            }

            // stream the body
            let mut ok = selected;
            let mut size = filesize;
            while size > 0 && !self.stopped() {
                if *len == 0 {
                    *len = match source.decompress(buf) {
                        Ok(0) => {
                            warn!("premature end of cpio data");
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
                let n = (*len).min(size as usize);
                if ok && !self.write_block(&buf[..n]) {
                    ok = false;
                }
                size -= n as u64;
                buf.copy_within(n..*len, 0);
                *len -= n;
            }
            if self.stopped() {
                break;
            }

            if top_up(source, buf, len).is_err() {
                break;
            }
            // newc pads the body to a 4-byte boundary
            if !is_odc {
                let pad = (4 - (filesize as usize) % 4) % 4;
                if *len >= pad {
                    buf.copy_within(pad..*len, 0);
                    *len -= pad;
                }
            }

            if *len <= NEWC_HEADER || !is_cpio_header(&buf[..*len]) {
                break;
            }
            if selected {
                self.close_pipe();
                in_progress = true;
            }
        }
        self.notify_assigned();
        true
    }
}
