//! Decompression worker threads and their chain protocol.
//!
//! Synchronization uses four gates per stage, matching the protocol
//! the consumer relies on:
//!
//! - `part_ready` gates reading the part name: the producer assigns it
//!   and sets `is_assigned` before any byte of the part is readable.
//! - `pipe_close` gates `open_next`: the consumer never receives a new
//!   pipe while the producer could still write the old one.
//! - `pipe_ready` wakes a producer parked between archive parts.
//! - `pipe_zstream` parks a worker between files without destroying it.

use std::fs::File;
use std::io::{PipeReader, PipeWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use tracing::warn;

use crate::source::ZSource;

pub(crate) struct Shared {
    pub state: Mutex<State>,
    pub pipe_ready: Condvar,
    pub pipe_close: Condvar,
    pub pipe_zstream: Condvar,
    pub part_ready: Condvar,
    pub quit: AtomicBool,
    pub stop: AtomicBool,
}

#[derive(Default)]
pub(crate) struct State {
    /// Write end handed to the worker; taken by the worker thread.
    pub writer: Option<PipeWriter>,
    /// Next file to decompress; taken by the worker thread.
    pub job: Option<ZSource>,
    pub is_extracting: bool,
    pub is_waiting: bool,
    pub is_assigned: bool,
}

/// One stage of the decompression chain.
///
/// `start` opens the stage for a file and returns the read end of its
/// output pipe; on EOF the consumer calls `open_next` to receive the
/// next archive part, until it returns `None`.
pub struct Unpacker {
    shared: Arc<Shared>,
    chain: Option<Arc<Mutex<Unpacker>>>,
    /// Part name this stage assigns for its consumer.
    out_part: Arc<Mutex<String>>,
    /// Part name of this stage's own input, assigned by the next stage.
    my_part: Arc<Mutex<String>>,
    thread: Option<JoinHandle<()>>,
    chained: bool,
    skip_hidden: bool,
}

impl Unpacker {
    /// A head stage whose parts are read by the caller.
    pub fn new() -> Self {
        Unpacker::with_partname(false, Arc::new(Mutex::new(String::new())))
    }

    fn with_partname(chained: bool, out_part: Arc<Mutex<String>>) -> Self {
        Unpacker {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                pipe_ready: Condvar::new(),
                pipe_close: Condvar::new(),
                pipe_zstream: Condvar::new(),
                part_ready: Condvar::new(),
                quit: AtomicBool::new(false),
                stop: AtomicBool::new(false),
            }),
            chain: None,
            out_part,
            my_part: Arc::new(Mutex::new(String::new())),
            thread: None,
            chained,
            skip_hidden: false,
        }
    }

    /// Skip hidden files inside archives.
    pub fn skip_hidden(mut self, yes: bool) -> Self {
        self.skip_hidden = yes;
        self
    }

    /// Start decompressing `file`, peeling up to `stage` layers.
    /// Returns the read end of this stage's output pipe.
    pub fn start(&mut self, stage: usize, pathname: &str, file: File) -> Option<PipeReader> {
        let source = if stage > 1 {
            // the inner chain unwraps the deeper layers first
            if self.chain.is_none() {
                let inner = Unpacker::with_partname(true, self.my_part.clone());
                self.chain = Some(Arc::new(Mutex::new(inner)));
            }
            let chain = self.chain.as_ref().expect("chain").clone();
            let inner_pipe = {
                let mut inner = chain.lock().unwrap();
                let pipe = inner.start(stage - 1, pathname, file)?;
                inner.wait_partname();
                pipe
            };
            let name = self.my_part.lock().unwrap().clone();
            ZSource::new(&name, Box::new(inner_pipe))
        } else {
            ZSource::new(pathname, Box::new(file))
        };
        let source = match source {
            Ok(source) => source,
            Err(e) => {
                warn!("cannot decompress {pathname}: {e}");
                return None;
            }
        };
        let (reader, writer) = match std::io::pipe() {
            Ok(p) => p,
            Err(e) => {
                warn!("cannot create pipe to decompress {pathname}: {e}");
                return None;
            }
        };
        {
            let mut st = self.shared.state.lock().unwrap();
            st.writer = Some(writer);
            st.job = Some(source);
            st.is_assigned = false;
        }
        if self.thread.is_some() {
            // wake the worker parked between files
            self.shared.pipe_zstream.notify_one();
        } else {
            self.shared.quit.store(false, Ordering::SeqCst);
            self.shared.stop.store(false, Ordering::SeqCst);
            let stage = Stage {
                shared: self.shared.clone(),
                out_part: self.out_part.clone(),
                my_part: self.my_part.clone(),
                chain: self.chain.clone(),
                chained: self.chained,
                skip_hidden: self.skip_hidden,
                writer: None,
            };
            self.thread = Some(std::thread::spawn(move || stage.run()));
        }
        Some(reader)
    }

    /// After EOF on the previous pipe: open a pipe to the next part of
    /// the archive, or `None` when the archive is exhausted.
    pub fn open_next(&mut self) -> Option<PipeReader> {
        let mut st = self.shared.state.lock().unwrap();
        // wait for the producer to close its end and park
        while !st.is_waiting {
            st = self.shared.pipe_close.wait(st).unwrap();
        }
        st.is_assigned = false;
        if !st.is_extracting {
            return None;
        }
        let (reader, writer) = match std::io::pipe() {
            Ok(p) => p,
            Err(e) => {
                warn!("cannot create pipe to decompress: {e}");
                st.is_assigned = true;
                self.shared.part_ready.notify_all();
                self.shared.pipe_ready.notify_all();
                return None;
            }
        };
        st.writer = Some(writer);
        self.shared.pipe_ready.notify_all();
        if self.chained {
            // the consumer is a worker that needs the part name now
            while !st.is_assigned {
                st = self.shared.part_ready.wait(st).unwrap();
            }
        }
        Some(reader)
    }

    /// Block until the current part's name is assigned, then read it.
    pub fn wait_partname(&self) -> String {
        let mut st = self.shared.state.lock().unwrap();
        while !st.is_assigned {
            st = self.shared.part_ready.wait(st).unwrap();
        }
        drop(st);
        self.out_part.lock().unwrap().clone()
    }

    /// The current part name without waiting.
    pub fn partname(&self) -> String {
        self.out_part.lock().unwrap().clone()
    }

    /// Cancel decompression; cascades to the whole chain. Workers
    /// observe the flag at every suspension point and drain rather
    /// than block.
    pub fn cancel(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        self.shared.pipe_ready.notify_all();
        if let Some(chain) = &self.chain {
            chain.lock().unwrap().cancel();
        }
    }

    /// Terminate the worker and wait for it; idempotent.
    pub fn join(&mut self) {
        if let Some(chain) = &self.chain {
            chain.lock().unwrap().join();
        }
        if let Some(handle) = self.thread.take() {
            self.shared.quit.store(true, Ordering::SeqCst);
            self.shared.pipe_ready.notify_all();
            self.shared.pipe_zstream.notify_all();
            let _ = handle.join();
        }
    }
}

impl Default for Unpacker {
    fn default() -> Self {
        Unpacker::new()
    }
}

impl Drop for Unpacker {
    fn drop(&mut self) {
        self.join();
    }
}

/// Worker-thread side of a stage.
pub(crate) struct Stage {
    pub shared: Arc<Shared>,
    pub out_part: Arc<Mutex<String>>,
    pub my_part: Arc<Mutex<String>>,
    pub chain: Option<Arc<Mutex<Unpacker>>>,
    pub chained: bool,
    pub skip_hidden: bool,
    pub writer: Option<PipeWriter>,
}

const BUF_LEN: usize = 65536;

impl Stage {
    pub fn stopped(&self) -> bool {
        self.shared.stop.load(Ordering::SeqCst)
    }

    fn quitting(&self) -> bool {
        self.shared.quit.load(Ordering::SeqCst)
    }

    pub fn set_extracting(&self, yes: bool) {
        self.shared.state.lock().unwrap().is_extracting = yes;
    }

    pub fn hidden(&self, path: &str) -> bool {
        self.skip_hidden && (path.starts_with('.') || path.contains("/."))
    }

    /// Assign the consumer-visible part name from colon segments, then
    /// open the `part_ready` gate.
    pub fn assign_part(&self, segments: &[&str]) {
        let mut name = String::new();
        if self.chain.is_some() {
            name = self.my_part.lock().unwrap().clone();
        }
        for s in segments {
            if s.is_empty() {
                continue;
            }
            if !name.is_empty() {
                name.push(':');
            }
            name.push_str(s);
        }
        *self.out_part.lock().unwrap() = name;
        let mut st = self.shared.state.lock().unwrap();
        st.is_assigned = true;
        drop(st);
        self.shared.part_ready.notify_all();
    }

    /// Open the `part_ready` gate even on error paths, so a waiting
    /// consumer never deadlocks.
    pub fn notify_assigned(&self) {
        let mut st = self.shared.state.lock().unwrap();
        st.is_assigned = true;
        drop(st);
        self.shared.part_ready.notify_all();
    }

    /// Write one block into the pipe; false when the pipe broke (the
    /// consumer went away) and the rest should be drained.
    pub fn write_block(&mut self, data: &[u8]) -> bool {
        match &mut self.writer {
            Some(w) => w.write_all(data).is_ok(),
            None => false,
        }
    }

    /// Close the write end and open the `pipe_close` gate.
    pub fn close_pipe(&mut self) {
        self.writer = None;
        self.shared.pipe_close.notify_all();
    }

    /// Between archive parts: wait for the consumer to hand a fresh
    /// pipe; false when the consumer abandoned the archive.
    pub fn wait_pipe_ready(&mut self) -> bool {
        if self.writer.is_some() {
            return true;
        }
        let mut st = self.shared.state.lock().unwrap();
        self.shared.pipe_close.notify_all();
        st.is_waiting = true;
        while st.writer.is_none() && !self.quitting() && !self.stopped() {
            st = self.shared.pipe_ready.wait(st).unwrap();
        }
        st.is_waiting = false;
        self.writer = st.writer.take();
        self.writer.is_some()
    }

    /// Close the pipe and park until the next file is assigned.
    fn close_wait_next_file(&mut self) -> Option<ZSource> {
        self.writer = None;
        let mut st = self.shared.state.lock().unwrap();
        self.shared.pipe_close.notify_all();
        loop {
            if self.quitting() {
                return None;
            }
            if let Some(job) = st.job.take() {
                self.writer = st.writer.take();
                return Some(job);
            }
            st.is_waiting = true;
            st = self.shared.pipe_zstream.wait(st).unwrap();
            st.is_waiting = false;
        }
    }

    fn run(mut self) {
        loop {
            let Some(source) = self.close_wait_next_file() else {
                // wake anything still waiting on our gates
                self.shared.pipe_close.notify_all();
                self.shared.part_ready.notify_all();
                return;
            };
            self.decompress_file(source);
            // open the part_ready gate even when nothing was selected,
            // so a waiting consumer always gets released
            self.notify_assigned();
        }
    }

    /// Decompress one input file: peel its layer, split archives into
    /// parts, stream each part into the pipe.
    fn decompress_file(&mut self, mut source: ZSource) {
        let mut buf = vec![0u8; BUF_LEN];
        self.set_extracting(false);
        while !self.stopped() {
            let zentry = source.zip_entry().cloned();
            let mut is_regular = true;
            let mut path = String::new();
            if let Some(entry) = &zentry {
                self.set_extracting(true);
                if entry.is_dir() {
                    is_regular = false;
                } else {
                    path = entry.name.clone();
                }
            }
            let mut selected = false;
            let mut len = match source.decompress(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    warn!("{e}");
                    self.notify_assigned();
                    break;
                }
            };
            // archive detection needs a full first block
            if len > 0 && top_up(&mut source, &mut buf, &mut len).is_err() {
                self.notify_assigned();
                break;
            }
            let mut failed = false;
            if !self.filter_tar(&mut source, &path, &mut buf, &mut len)
                && !self.filter_cpio(&mut source, &path, &mut buf, &mut len)
            {
                // not an archive: stream the part as-is
                selected = is_regular && !self.hidden(&path);
                if selected {
                    if !self.wait_pipe_ready() {
                        break;
                    }
                    self.assign_part(&[&path]);
                }
                let mut drain = false;
                while len > 0 && !self.stopped() {
                    if selected && !drain && !self.write_block(&buf[..len]) {
                        if self.chain.is_none() && zentry.is_none() {
                            break;
                        }
                        drain = true;
                    }
                    len = match source.decompress(&mut buf) {
                        Ok(n) => n,
                        Err(e) => {
                            warn!("{e}");
                            failed = true;
                            0
                        }
                    };
                }
            }
            if failed {
                self.notify_assigned();
                break;
            }
            // move to the next part: the following zip entry, or the
            // next file from the inner chain
            if zentry.is_some() {
                let more = source.zip_next().unwrap_or_else(|e| {
                    warn!("{e}");
                    false
                });
                self.set_extracting(true);
                if selected {
                    self.close_pipe();
                }
                if !more {
                    break;
                }
                continue;
            }
            let Some(chain) = self.chain.clone() else {
                break;
            };
            let next_pipe = chain.lock().unwrap().open_next();
            match next_pipe {
                Some(pipe) => {
                    self.set_extracting(true);
                    if self.writer.is_some() {
                        self.close_pipe();
                    }
                    let name = self.my_part.lock().unwrap().clone();
                    match ZSource::new(&name, Box::new(pipe)) {
                        Ok(next) => source = next,
                        Err(e) => {
                            warn!("{e}");
                            break;
                        }
                    }
                }
                None => break,
            }
        }
        self.set_extracting(false);
    }
}

/// Read a NUL-terminated string field.
pub(crate) fn cstr(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Refill `buf[len..]` from the source until full or EOF.
pub(crate) fn top_up(
    source: &mut ZSource,
    buf: &mut [u8],
    len: &mut usize,
) -> Result<(), crate::error::UnpackError> {
    while *len < buf.len() {
        let n = source.decompress(&mut buf[*len..])?;
        if n == 0 {
            break;
        }
        *len += n;
    }
    Ok(())
}

