//! PCM16 WAV helpers: header validation, channel layout, downmix and the
//! audio file descriptor consumed by [`WavStream`](crate::stream::WavStream).
//!
//! Only canonical 44-byte PCM headers are understood. Field offsets:
//!
//! | Offset | Field | Expected |
//! |--------|-------|----------|
//! | 0  | RIFF chunk id     | `"RIFF"` |
//! | 8  | RIFF type         | `"WAVE"` |
//! | 16 | format chunk size | 16 |
//! | 20 | compression       | 1 (PCM) |
//! | 22 | channel count     | 1 or 2 |
//! | 24 | sample rate       | |
//! | 32 | block align       | |
//! | 34 | bits per sample   | 16 |
//! | 40 | data size         | |
//! | 44 | first sample      | left channel first |

use core::fmt;
use heapless::String;

use crate::constants::{MAX_PATH_LEN, WAV_DATA_OFFSET};

/// FatFs logical drive prefix used when building sample paths.
pub const ROOT_PATH: &str = "0:/";

/// Default directory holding the WAV files on the SD card.
pub const AUDIO_DIRECTORY: &str = "AUDIO";

const RIFF_CHUNK_ID: &[u8; 4] = b"RIFF";
const WAVE_RIFF_TYPE: &[u8; 4] = b"WAVE";
const PCM_FORMAT_CHUNK_SIZE: u32 = 16;
const COMPRESSION_PCM: u16 = 1;
const BITS_PER_SAMPLE_16: u16 = 16;

/// Channel layout of a PCM16 stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channels {
    Mono,
    Stereo,
}

impl Channels {
    /// Map a WAV channel count to a layout.
    pub fn from_count(count: u16) -> Option<Self> {
        match count {
            1 => Some(Channels::Mono),
            2 => Some(Channels::Stereo),
            _ => None,
        }
    }

    /// Bytes occupied by one sample of every channel.
    pub const fn bytes_per_frame(self) -> usize {
        match self {
            Channels::Mono => 2,
            Channels::Stereo => 4,
        }
    }
}

/// Average two channels into one, truncating toward zero.
///
/// The sum is formed in `i32`, so it cannot overflow.
#[inline]
pub fn downmix(left: i16, right: i16) -> i16 {
    ((left as i32 + right as i32) / 2) as i16
}

/// Decode one channel frame from `bytes` (little-endian PCM16) into a mono sample.
///
/// `bytes` must hold at least [`Channels::bytes_per_frame()`] bytes.
#[inline]
pub fn decode_sample(channels: Channels, bytes: &[u8]) -> i16 {
    let left = i16::from_le_bytes([bytes[0], bytes[1]]);
    match channels {
        Channels::Mono => left,
        Channels::Stereo => downmix(left, i16::from_le_bytes([bytes[2], bytes[3]])),
    }
}

/// Reasons a WAV header is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaderError {
    /// Fewer than 44 bytes.
    TooShort,
    NotRiff,
    NotWave,
    /// Format chunk size other than 16.
    FormatChunkSize(u32),
    /// Compression code other than PCM.
    NotPcm(u16),
    /// Sample width other than 16 bits.
    BitsPerSample(u16),
    /// Channel count other than 1 or 2.
    Channels(u16),
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderError::TooShort => f.write_str("header shorter than 44 bytes"),
            HeaderError::NotRiff => f.write_str("missing RIFF chunk id"),
            HeaderError::NotWave => f.write_str("RIFF type is not WAVE"),
            HeaderError::FormatChunkSize(n) => write!(f, "format chunk size {n}, expected 16"),
            HeaderError::NotPcm(c) => write!(f, "compression code {c}, expected PCM"),
            HeaderError::BitsPerSample(b) => write!(f, "{b} bits per sample, expected 16"),
            HeaderError::Channels(c) => write!(f, "{c} channels, expected 1 or 2"),
        }
    }
}

/// The fields of a canonical PCM WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WavHeader {
    pub riff_chunk_size: u32,
    pub channels: Channels,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Parse and validate the first 44 bytes of a WAV file.
    pub fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        let h = bytes
            .get(..WAV_DATA_OFFSET as usize)
            .ok_or(HeaderError::TooShort)?;

        let u16_at = |o: usize| u16::from_le_bytes([h[o], h[o + 1]]);
        let u32_at = |o: usize| u32::from_le_bytes([h[o], h[o + 1], h[o + 2], h[o + 3]]);

        if &h[0..4] != RIFF_CHUNK_ID {
            return Err(HeaderError::NotRiff);
        }
        if &h[8..12] != WAVE_RIFF_TYPE {
            return Err(HeaderError::NotWave);
        }
        let format_size = u32_at(16);
        if format_size != PCM_FORMAT_CHUNK_SIZE {
            return Err(HeaderError::FormatChunkSize(format_size));
        }
        let compression = u16_at(20);
        if compression != COMPRESSION_PCM {
            return Err(HeaderError::NotPcm(compression));
        }
        let bits = u16_at(34);
        if bits != BITS_PER_SAMPLE_16 {
            return Err(HeaderError::BitsPerSample(bits));
        }
        let count = u16_at(22);
        let channels = Channels::from_count(count).ok_or(HeaderError::Channels(count))?;

        Ok(WavHeader {
            riff_chunk_size: u32_at(4),
            channels,
            sample_rate: u32_at(24),
            byte_rate: u32_at(28),
            block_align: u16_at(32),
            bits_per_sample: bits,
            data_size: u32_at(40),
        })
    }
}

/// A WAV file selected for streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    /// Full path handed to the storage collaborator.
    pub path: String<MAX_PATH_LEN>,
    /// File size in bytes, header included.
    pub size_bytes: u32,
    pub channels: Channels,
}

impl AudioFile {
    pub fn new(path: String<MAX_PATH_LEN>, size_bytes: u32, channels: Channels) -> Self {
        AudioFile {
            path,
            size_bytes,
            channels,
        }
    }

    /// Describe a file from its validated header.
    pub fn from_header(path: String<MAX_PATH_LEN>, size_bytes: u32, header: &WavHeader) -> Self {
        Self::new(path, size_bytes, header.channels)
    }

    /// Bytes of PCM data following the header.
    pub fn data_bytes(&self) -> u32 {
        self.size_bytes.saturating_sub(WAV_DATA_OFFSET)
    }
}

/// `true` if `name` carries a `.wav`, `.WAV` or `.Wav` extension.
pub fn is_wav_file(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => matches!(ext, "wav" | "WAV" | "Wav"),
        _ => false,
    }
}

/// The path did not fit in [`MAX_PATH_LEN`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PathTooLong;

/// Build `0:/<directory>/<file_name>`.
pub fn build_path(directory: &str, file_name: &str) -> Result<String<MAX_PATH_LEN>, PathTooLong> {
    let mut path = String::new();
    for part in [ROOT_PATH, directory, "/", file_name] {
        path.push_str(part).map_err(|_| PathTooLong)?;
    }
    Ok(path)
}
