//! Incremental PCM16 WAV decoder feeding the sample ring buffer.
//!
//! [`WavStream`] is driven by repeated calls to [`feed()`](WavStream::feed)
//! from the foreground loop. Each call does a bounded amount of work: it may
//! read one raw chunk from the file and decode at most one analysis frame
//! (`N` samples) into the ring buffer.
//!
//! ```text
//! file ──read chunk──► raw chunk ──decode/downmix──► RingBuffer<i16> (2N)
//!                                                      │
//!                              FramePipeline::drain_frame() ◄── frame_ready
//! ```
//!
//! ## Backpressure
//!
//! Nothing is decoded unless the ring buffer has room for a whole frame
//! (`unused_capacity() >= N`), so undrained samples are never overwritten.
//!
//! ## Frame handshake
//!
//! `frame_ready` is raised once the ring buffer holds at least `N` samples and
//! cleared by the pipeline after it drains a frame. At most one frame is
//! handed over per handshake.
//!
//! ## Session end
//!
//! The file is closed as soon as its data is exhausted or an I/O error
//! occurs. Frames already buffered stay drainable; once fewer than `N`
//! samples remain, the buffers are released and the session is finished
//! (the trailing partial frame is discarded).

use alloc::vec::Vec;
use core::fmt;

use embedded_io::{Error as _, ErrorKind, Read, Seek, SeekFrom};

use crate::constants::{CHUNK_MULTIPLIER, FFT_SIZE, WAV_DATA_OFFSET};
use crate::ring_buffer::RingBuffer;
use crate::storage::AudioStorage;
use crate::wav::{decode_sample, AudioFile, Channels};

/// Fatal stream errors. Every variant ends decoding for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamError {
    /// The file could not be opened. The session stays unopened and the next
    /// `feed()` retries.
    FileOpen(ErrorKind),
    Seek(ErrorKind),
    Read(ErrorKind),
    /// Ring buffer or raw chunk storage could not be allocated.
    BufferAlloc,
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::FileOpen(k) => write!(f, "open failed: {k:?}"),
            StreamError::Seek(k) => write!(f, "seek failed: {k:?}"),
            StreamError::Read(k) => write!(f, "read failed: {k:?}"),
            StreamError::BufferAlloc => f.write_str("stream buffer allocation failed"),
        }
    }
}

/// Outcome of one [`WavStream::feed()`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Feed {
    /// This many samples were pushed into the ring buffer.
    Decoded(usize),
    /// Less than a frame of room is left; a frame must be drained first.
    Backpressure,
    /// The file is fully read; buffered frames are waiting to be drained.
    Draining,
    /// The session ended during this call.
    EndOfStream,
    /// The session is finished or disabled.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// File not opened yet.
    Pending,
    /// File open, decoding.
    Open,
    /// File closed, buffered frames remain.
    Draining,
    Finished,
}

/// A streaming session over one WAV file.
///
/// `N` is the analysis frame length; the ring buffer holds `2N` samples and
/// the raw chunk `N * CHUNK_MULTIPLIER` bytes.
pub struct WavStream<S: AudioStorage, const N: usize = FFT_SIZE> {
    storage: S,
    file: AudioFile,
    phase: Phase,
    handle: Option<S::File>,
    /// Byte offset of the next unread data in the file.
    cursor: u32,
    /// Data bytes not yet read from the file.
    remaining: u32,
    chunk: Vec<u8>,
    /// Valid bytes in `chunk`.
    chunk_len: usize,
    /// Bytes of `chunk` already decoded.
    chunk_pos: usize,
    ring: Option<RingBuffer<i16>>,
    frame_ready: bool,
}

impl<S: AudioStorage, const N: usize> WavStream<S, N> {
    const FRAME_LEN_OK: () = assert!(N >= 1, "frame length must be at least 1");

    /// Create a session for `file`. Nothing is opened until the first
    /// [`feed()`](Self::feed).
    pub fn new(storage: S, file: AudioFile) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::FRAME_LEN_OK;

        WavStream {
            storage,
            file,
            phase: Phase::Pending,
            handle: None,
            cursor: WAV_DATA_OFFSET,
            remaining: 0,
            chunk: Vec::new(),
            chunk_len: 0,
            chunk_pos: 0,
            ring: None,
            frame_ready: false,
        }
    }

    /// Advance the stream by at most one chunk read and one frame decode.
    pub fn feed(&mut self) -> Result<Feed, StreamError> {
        match self.phase {
            Phase::Finished => return Ok(Feed::Idle),
            Phase::Pending => self.open()?,
            Phase::Open | Phase::Draining => {}
        }

        let outcome = self.pump().map_err(|e| {
            error!("stream aborted, file closed");
            self.close_file();
            e
        });

        if self.refresh() {
            return outcome.map(|_| Feed::EndOfStream);
        }
        outcome
    }

    /// Stop the session immediately, closing the file and freeing buffers.
    pub fn disable(&mut self) {
        if self.phase != Phase::Finished {
            info!("stream disabled");
        }
        self.release();
    }

    /// A full frame is buffered and may be drained.
    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    /// The file handle is currently open.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// The session has ended; further `feed()` calls do nothing.
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Decoded samples waiting in the ring buffer.
    pub fn buffered(&self) -> usize {
        self.ring.as_ref().map_or(0, RingBuffer::len)
    }

    /// Data bytes not yet read from the file.
    pub fn bytes_remaining(&self) -> u32 {
        self.remaining
    }

    pub fn channels(&self) -> Channels {
        self.file.channels
    }

    pub fn file(&self) -> &AudioFile {
        &self.file
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// End the session and hand back the storage for the next file.
    pub fn into_storage(mut self) -> S {
        self.release();
        self.storage
    }

    pub(crate) fn ring_mut(&mut self) -> Option<&mut RingBuffer<i16>> {
        self.ring.as_mut()
    }

    /// Called by the pipeline after draining a frame.
    pub(crate) fn frame_consumed(&mut self) {
        self.frame_ready = false;
        self.refresh();
    }

    fn open(&mut self) -> Result<(), StreamError> {
        let mut handle = self.storage.open(&self.file.path).map_err(|e| {
            warn!("open failed");
            StreamError::FileOpen(e.kind())
        })?;

        let ring = RingBuffer::with_capacity(2 * N);
        let chunk = alloc_chunk(N);
        let (ring, chunk) = match (ring, chunk) {
            (Ok(ring), Some(chunk)) => (ring, chunk),
            _ => {
                error!("stream buffer allocation failed");
                self.phase = Phase::Finished;
                return Err(StreamError::BufferAlloc);
            }
        };

        if let Err(e) = handle.seek(SeekFrom::Start(WAV_DATA_OFFSET as u64)) {
            error!("seek to sample data failed");
            self.phase = Phase::Finished;
            return Err(StreamError::Seek(e.kind()));
        }

        info!(
            "stream opened: {} data bytes, stereo={}",
            self.file.data_bytes(),
            self.file.channels == Channels::Stereo
        );
        self.handle = Some(handle);
        self.ring = Some(ring);
        self.chunk = chunk;
        self.chunk_len = 0;
        self.chunk_pos = 0;
        self.cursor = WAV_DATA_OFFSET;
        self.remaining = self.file.data_bytes();
        self.phase = Phase::Open;
        Ok(())
    }

    fn pump(&mut self) -> Result<Feed, StreamError> {
        if self.handle.is_none() {
            return Ok(Feed::Draining);
        }
        if self.chunk_pos >= self.chunk_len {
            self.load_chunk()?;
            if self.handle.is_none() {
                return Ok(Feed::Draining);
            }
        }

        let Some(ring) = self.ring.as_mut() else {
            return Ok(Feed::Draining);
        };
        if ring.unused_capacity() < N {
            return Ok(Feed::Backpressure);
        }

        let frame_bytes = self.file.channels.bytes_per_frame();
        let count = ((self.chunk_len - self.chunk_pos) / frame_bytes).min(N);
        let end = self.chunk_pos + count * frame_bytes;
        for bytes in self.chunk[self.chunk_pos..end].chunks_exact(frame_bytes) {
            let written = ring.write(decode_sample(self.file.channels, bytes));
            debug_assert!(written.is_ok());
        }
        self.chunk_pos = end;

        if self.chunk_pos >= self.chunk_len && self.remaining == 0 {
            debug!("end of file reached");
            self.close_file();
        }
        Ok(Feed::Decoded(count))
    }

    /// Read the next raw chunk at the file cursor. Short reads are retried
    /// until a whole channel frame boundary is reached or the file returns
    /// no data. Only whole channel frames are consumed; leftover bytes are
    /// read again next time.
    fn load_chunk(&mut self) -> Result<(), StreamError> {
        let frame_bytes = self.file.channels.bytes_per_frame();
        if (self.remaining as usize) < frame_bytes {
            self.remaining = 0;
            self.close_file();
            return Ok(());
        }
        let Some(handle) = self.handle.as_mut() else {
            return Ok(());
        };

        handle
            .seek(SeekFrom::Start(self.cursor as u64))
            .map_err(|e| StreamError::Seek(e.kind()))?;

        let want = self.chunk.len().min(self.remaining as usize);
        let mut filled = 0;
        while filled < want {
            let read = handle
                .read(&mut self.chunk[filled..want])
                .map_err(|e| StreamError::Read(e.kind()))?;
            filled += read;
            if read == 0 || filled % frame_bytes == 0 {
                break;
            }
        }

        let usable = filled - filled % frame_bytes;
        if usable == 0 {
            warn!("file shorter than declared, {} bytes unread", self.remaining);
            self.remaining = 0;
            self.close_file();
            return Ok(());
        }

        trace!("chunk loaded: {} bytes at {}", usable, self.cursor);
        self.chunk_len = usable;
        self.chunk_pos = 0;
        // usable <= want <= remaining, which is a u32
        self.cursor += usable as u32;
        self.remaining -= usable as u32;
        Ok(())
    }

    fn close_file(&mut self) {
        if self.handle.take().is_some() {
            debug!("file closed");
        }
        if self.phase == Phase::Open {
            self.phase = Phase::Draining;
        }
    }

    /// Re-evaluate the frame handshake. Returns `true` if the session ended
    /// during this call.
    fn refresh(&mut self) -> bool {
        let buffered = self.buffered();
        if buffered >= N {
            self.frame_ready = true;
            return false;
        }
        if self.phase == Phase::Draining {
            info!("end of stream, {} trailing samples dropped", buffered);
            self.release();
            return true;
        }
        false
    }

    fn release(&mut self) {
        self.handle = None;
        self.ring = None;
        self.chunk = Vec::new();
        self.chunk_len = 0;
        self.chunk_pos = 0;
        self.frame_ready = false;
        self.phase = Phase::Finished;
    }
}

fn alloc_chunk(frame_len: usize) -> Option<Vec<u8>> {
    let len = frame_len.checked_mul(CHUNK_MULTIPLIER)?;
    let mut chunk = Vec::new();
    chunk.try_reserve_exact(len).ok()?;
    chunk.resize(len, 0);
    Some(chunk)
}
