//! Frame sinks.
//!
//! The driver hands fully-assembled frames to a [`FrameSink`], one at a
//! time, under exactly two categories ("events" and "runs"). The
//! production sink is the podio ROOT writer, bound outside this
//! repository; [`JsonLinesSink`] is the in-repo reference sink and
//! [`RecordingSink`] captures frames in memory for tests.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use dst_edm4hep::Frame;

/// Append-only frame sink.
///
/// Implementations must not interleave or split frames; the driver
/// guarantees each frame is complete before the call.
pub trait FrameSink {
    /// Append one frame under its category.
    fn write_frame(&mut self, frame: &Frame) -> io::Result<()>;

    /// Flush and close the output.
    fn finish(&mut self) -> io::Result<()>;
}

/// Writes each frame as one category-tagged JSON object per line.
pub struct JsonLinesSink {
    writer: BufWriter<File>,
    path: PathBuf,
    frames: u64,
}

impl JsonLinesSink {
    /// Create (or truncate) the output file.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        info!(path = %path.display(), "opened output sink");
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            frames: 0,
        })
    }
}

impl FrameSink for JsonLinesSink {
    fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, frame).map_err(io::Error::from)?;
        self.writer.write_all(b"\n")?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        debug!(path = %self.path.display(), frames = self.frames, "closed output sink");
        Ok(())
    }
}

/// In-memory sink for tests; clones share the captured frames.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<Frame>>>,
    finished: Arc<Mutex<bool>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// Whether `finish` has been called.
    pub fn finished(&self) -> bool {
        self.finished.lock().map(|f| *f).unwrap_or(false)
    }
}

impl FrameSink for RecordingSink {
    fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        if let Ok(mut frames) = self.frames.lock() {
            frames.push(frame.clone());
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        if let Ok(mut finished) = self.finished.lock() {
            *finished = true;
        }
        Ok(())
    }
}
