/// Number of samples in one analysis frame (FFT input length).
pub const FFT_SIZE: usize = 1024;

/// Raw chunk size as a multiple of the frame size. Must be even and at least 4
/// so a chunk always holds whole mono and stereo frames.
pub const CHUNK_MULTIPLIER: usize = 8;

/// Raw chunk buffer size in bytes at the default frame size.
pub const MAX_CHUNK_BUFFER: usize = FFT_SIZE * CHUNK_MULTIPLIER;

/// Byte offset of the first PCM sample in a canonical 44-byte WAV file.
pub const WAV_DATA_OFFSET: u32 = 44;

/// Longest `0:/DIR/NAME.wav` path the file descriptor can hold.
pub const MAX_PATH_LEN: usize = 128;

/// Default SCLK divider for the dual AD7476A IP (`SCLK = SYSCLK / (2 * (N + 1))`).
pub const ADC_CLOCK_DIVIDER: u8 = 4;

const _: () = assert!(CHUNK_MULTIPLIER % 2 == 0, "CHUNK_MULTIPLIER must be even");
const _: () = assert!(CHUNK_MULTIPLIER >= 4, "CHUNK_MULTIPLIER must be >= 4");
