//! Line producers: the `Reader` collaborator contract plus the pipe, tailed
//! file, and fan-in readers built against it.
//!
//! A `Reader` blocks until the next line is available, tracks a monotone
//! line count behind its own lock (readable without the `BufferWindow`
//! mutex), and reports the sources it multiplexes for origin-tagging.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::line::SourceId;

/// Metadata about one of a Reader's underlying sources, for origin-tagging
/// (coloring, multi-source labels) by the renderer.
#[derive(Debug, Clone)]
pub struct SourceMeta {
    pub id: SourceId,
    pub label: String,
    pub is_stdin: bool,
}

/// An external line producer: a pipe or a tailed file, or a fan-in of
/// several of either.
///
/// `read_line` blocks (asynchronously) until the next line is available, or
/// returns `Err(Error::EndOfStream)` once the source is exhausted and will
/// never produce more. Any other I/O failure is a transient read error; the
/// caller (the producer task driving [`crate::buffer_window::BufferWindow`])
/// decides whether to retry.
#[async_trait]
pub trait Reader: Send + Sync {
    /// Block until the next raw line is available.
    async fn read_line(&self) -> Result<(String, SourceId)>;

    /// Reset the monotone line counter. Does not truncate or reposition the
    /// underlying source.
    fn reset_lines(&self);

    /// Count of lines returned so far (since construction or last
    /// `reset_lines`).
    fn total_lines(&self) -> u64;

    /// The source(s) this reader multiplexes.
    fn sources(&self) -> Vec<SourceMeta>;
}

fn source_id_for(path: &str) -> SourceId {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    SourceId(hasher.finish() as u32)
}

/// Truncate `s` to at most `max_bytes` bytes, backing off to the nearest
/// preceding UTF-8 character boundary so the result is always valid `str`.
/// A no-op when `s` already fits.
fn truncate_to_byte_budget(s: &mut String, max_bytes: usize) {
    if s.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

/// Wraps standard input: one line per terminating newline, newline stripped.
pub struct PipeReader {
    id: SourceId,
    lines: AtomicU64,
    inner: tokio::sync::Mutex<BufReader<tokio::io::Stdin>>,
    max_line_bytes: usize,
}

impl PipeReader {
    /// `max_line_bytes` bounds each returned line's length; longer raw lines
    /// are truncated before the caller's Parser ever sees them.
    #[must_use]
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            id: source_id_for("<stdin>"),
            lines: AtomicU64::new(0),
            inner: tokio::sync::Mutex::new(BufReader::new(tokio::io::stdin())),
            max_line_bytes,
        }
    }
}

impl Default for PipeReader {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

#[async_trait]
impl Reader for PipeReader {
    async fn read_line(&self) -> Result<(String, SourceId)> {
        let mut guard = self.inner.lock().await;
        let mut buf = String::new();
        let n = guard.read_line(&mut buf).await.map_err(Error::Reader)?;
        if n == 0 {
            return Err(Error::EndOfStream);
        }
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        truncate_to_byte_budget(&mut buf, self.max_line_bytes);
        self.lines.fetch_add(1, Ordering::Relaxed);
        Ok((buf, self.id))
    }

    fn reset_lines(&self) {
        self.lines.store(0, Ordering::Relaxed);
    }

    fn total_lines(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }

    fn sources(&self) -> Vec<SourceMeta> {
        vec![SourceMeta {
            id: self.id,
            label: "<stdin>".to_string(),
            is_stdin: true,
        }]
    }
}

/// Scan backward from EOF in fixed-size chunks, counting newlines, to find
/// the byte offset that leaves approximately the last `lines` lines in the
/// file. Ported from `getPositionFromBottom` in `reader.go`.
fn seek_from_bottom(data_len: u64, mut read_chunk: impl FnMut(u64, usize) -> std::io::Result<Vec<u8>>, lines: u64) -> std::io::Result<u64> {
    const CHUNK: u64 = 2048;
    let mut cursor: u64 = 0;
    let mut counter: u64 = 0;
    loop {
        cursor += CHUNK;
        if cursor >= data_len {
            return Ok(0);
        }
        let start = data_len - cursor;
        let slice = read_chunk(start, CHUNK as usize)?;
        for (i, byte) in slice.iter().enumerate() {
            if *byte != b'\n' && *byte != b'\r' {
                continue;
            }
            counter += 1;
            if counter >= lines {
                return Ok(data_len - (cursor - i as u64));
            }
        }
    }
}

fn seek_from_bottom_file(path: &Path, lines: u64) -> std::io::Result<u64> {
    use std::io::{Read, Seek, SeekFrom};
    let mut file = std::fs::File::open(path)?;
    let data_len = file.metadata()?.len();
    seek_from_bottom(
        data_len,
        |start, len| {
            file.seek(SeekFrom::Start(start))?;
            let mut buf = vec![0u8; len];
            let n = file.read(&mut buf)?;
            buf.truncate(n);
            Ok(buf)
        },
        lines,
    )
}

#[cfg(unix)]
fn file_ino(meta: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
fn file_ino(_meta: &std::fs::Metadata) -> u64 {
    0
}

/// Opens a file, seeks to leave approximately the ring's capacity worth of
/// trailing lines, then follows appends. Reopens from the start when the
/// file shrinks or its inode changes underneath us (rotation), mirroring
/// `tail.Config{ReOpen: true, Follow: true}` in the source.
pub struct TailedFileReader {
    id: SourceId,
    path: PathBuf,
    lines: AtomicU64,
    state: tokio::sync::Mutex<TailState>,
    poll_interval: Duration,
    changed: Arc<tokio::sync::Notify>,
    // Held only to keep the background watcher thread alive for the
    // reader's lifetime; never read directly.
    _watcher: notify::RecommendedWatcher,
    max_line_bytes: usize,
}

struct TailState {
    file: Option<std::fs::File>,
    offset: u64,
    ino: u64,
}

fn notify_io_error(e: notify::Error) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

/// Watch the file's parent directory (not the file itself: a rotate/rename
/// replaces the inode, which a direct file watch can silently stop
/// tracking) and nudge `changed` on every event in it. False positives are
/// cheap (`poll_once` re-checks actual state); the `poll_interval` sleep in
/// `read_line` remains as a fallback for filesystems that don't deliver
/// events, so this is a latency optimization over it, not a replacement.
fn spawn_watcher(path: &Path, changed: Arc<tokio::sync::Notify>) -> Result<notify::RecommendedWatcher> {
    use notify::Watcher;
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if res.is_ok() {
            changed.notify_one();
        }
    })
    .map_err(|e| Error::Reader(notify_io_error(e)))?;
    let watch_dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    watcher
        .watch(watch_dir, notify::RecursiveMode::NonRecursive)
        .map_err(|e| Error::Reader(notify_io_error(e)))?;
    Ok(watcher)
}

impl TailedFileReader {
    /// `keep_lines` is the approximate number of trailing lines to seek
    /// past before following (normally the ring's capacity). `max_line_bytes`
    /// bounds each returned line's length; longer raw lines are truncated
    /// before the caller's Parser ever sees them.
    pub fn open(path: impl AsRef<Path>, keep_lines: u64, max_line_bytes: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let label = path.to_string_lossy().to_string();
        let offset = seek_from_bottom_file(&path, keep_lines).map_err(Error::Reader)?;
        let file = std::fs::File::open(&path).map_err(Error::Reader)?;
        let ino = file_ino(&file.metadata().map_err(Error::Reader)?);
        let changed = Arc::new(tokio::sync::Notify::new());
        let watcher = spawn_watcher(&path, Arc::clone(&changed))?;
        tracing::debug!(path = %label, offset, "tailing file from offset");
        Ok(Self {
            id: source_id_for(&label),
            path,
            lines: AtomicU64::new(0),
            state: tokio::sync::Mutex::new(TailState {
                file: Some(file),
                offset,
                ino,
            }),
            poll_interval: Duration::from_millis(200),
            changed,
            _watcher: watcher,
            max_line_bytes,
        })
    }

    /// Read whatever new complete lines are available, reopening on
    /// rotation/truncation. Returns `None` (not EndOfStream — a followed
    /// file never really ends) when nothing new is ready yet.
    async fn poll_once(&self) -> std::io::Result<Option<String>> {
        use std::io::{BufRead, Read, Seek, SeekFrom};

        let mut state = self.state.lock().await;

        let meta = std::fs::metadata(&self.path)?;
        let current_ino = file_ino(&meta);
        let truncated = state.file.is_some() && meta.len() < state.offset;
        let rotated = state.ino != 0 && current_ino != state.ino;

        if state.file.is_none() || truncated || rotated {
            if truncated || rotated {
                tracing::info!(
                    path = %self.path.display(),
                    truncated,
                    rotated,
                    "reopening tailed file"
                );
            }
            let file = std::fs::File::open(&self.path)?;
            state.ino = file_ino(&file.metadata()?);
            state.offset = 0;
            state.file = Some(file);
        }

        let file = state.file.as_mut().expect("just ensured Some");
        file.seek(SeekFrom::Start(state.offset))?;
        let mut reader = std::io::BufReader::new(&mut *file);
        let mut raw = Vec::new();
        let n = reader.read_until(b'\n', &mut raw)?;
        if n == 0 || !raw.ends_with(b"\n") {
            // Incomplete or no new line yet; don't consume the offset.
            return Ok(None);
        }
        state.offset += n as u64;
        drop(reader);

        while raw.last() == Some(&b'\n') || raw.last() == Some(&b'\r') {
            raw.pop();
        }
        let mut line = String::from_utf8_lossy(&raw).into_owned();
        truncate_to_byte_budget(&mut line, self.max_line_bytes);
        Ok(Some(line))
    }
}

#[async_trait]
impl Reader for TailedFileReader {
    async fn read_line(&self) -> Result<(String, SourceId)> {
        loop {
            match self.poll_once().await {
                Ok(Some(line)) => {
                    self.lines.fetch_add(1, Ordering::Relaxed);
                    return Ok((line, self.id));
                }
                Ok(None) => {
                    // Wake as soon as the watcher sees a directory event,
                    // or after poll_interval regardless, in case the event
                    // never arrives (e.g. some network filesystems).
                    let _ = tokio::time::timeout(self.poll_interval, self.changed.notified()).await;
                }
                Err(e) => return Err(Error::Reader(e)),
            }
        }
    }

    fn reset_lines(&self) {
        self.lines.store(0, Ordering::Relaxed);
    }

    fn total_lines(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }

    fn sources(&self) -> Vec<SourceMeta> {
        vec![SourceMeta {
            id: self.id,
            label: self.path.to_string_lossy().to_string(),
            is_stdin: false,
        }]
    }
}

/// Fans several readers into one by running each on its own task and
/// multiplexing their lines into a single queue, per `NewMultiReader` in
/// the source.
pub struct MultiReader {
    readers: Vec<Arc<dyn Reader>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<(String, SourceId)>>>,
}

impl MultiReader {
    #[must_use]
    pub fn new(readers: Vec<Arc<dyn Reader>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        for reader in readers.iter().cloned() {
            let tx = tx.clone();
            tokio::spawn(async move {
                loop {
                    let item = reader.read_line().await;
                    let is_end = matches!(item, Err(Error::EndOfStream));
                    if tx.send(item).is_err() {
                        return;
                    }
                    if is_end {
                        return;
                    }
                }
            });
        }
        Self {
            readers,
            rx: tokio::sync::Mutex::new(rx),
        }
    }
}

#[async_trait]
impl Reader for MultiReader {
    async fn read_line(&self) -> Result<(String, SourceId)> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(item) => item,
            None => Err(Error::EndOfStream),
        }
    }

    fn reset_lines(&self) {
        for reader in &self.readers {
            reader.reset_lines();
        }
    }

    fn total_lines(&self) -> u64 {
        self.readers.iter().map(|r| r.total_lines()).sum()
    }

    fn sources(&self) -> Vec<SourceMeta> {
        self.readers.iter().flat_map(|r| r.sources()).collect()
    }
}

/// Test-only readers: a finite, in-memory `Reader` used throughout
/// `ringlog-core`'s test suite so `BufferWindow` scenarios don't need a real
/// pipe or file.
pub mod test_support {
    use super::{Error, Reader, Result, SourceId, SourceMeta};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Yields each string in `lines`, in order, then `Err(EndOfStream)`
    /// forever after.
    pub struct VecReader {
        lines: Mutex<Vec<String>>,
        cursor: AtomicUsize,
        count: AtomicU64,
        id: SourceId,
    }

    impl VecReader {
        #[must_use]
        pub fn new(lines: Vec<String>) -> Self {
            Self {
                lines: Mutex::new(lines),
                cursor: AtomicUsize::new(0),
                count: AtomicU64::new(0),
                id: SourceId(0),
            }
        }
    }

    #[async_trait]
    impl Reader for VecReader {
        async fn read_line(&self) -> Result<(String, SourceId)> {
            let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
            let lines = self.lines.lock().unwrap();
            match lines.get(idx) {
                Some(line) => {
                    self.count.fetch_add(1, Ordering::Relaxed);
                    Ok((line.clone(), self.id))
                }
                None => Err(Error::EndOfStream),
            }
        }

        fn reset_lines(&self) {
            self.count.store(0, Ordering::Relaxed);
        }

        fn total_lines(&self) -> u64 {
            self.count.load(Ordering::Relaxed)
        }

        fn sources(&self) -> Vec<SourceMeta> {
            vec![SourceMeta {
                id: self.id,
                label: "<test>".to_string(),
                is_stdin: false,
            }]
        }
    }
}
