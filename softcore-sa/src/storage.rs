//! File collaborator used by the stream decoder.
//!
//! The SD card / FAT layer lives outside this crate. A file handle is any
//! [`embedded_io`] reader that can also seek; closing a file is dropping its
//! handle.

use embedded_io::{Read, Seek};

/// Opens files by path.
pub trait AudioStorage {
    /// Error reported when a path cannot be opened.
    type Error: embedded_io::Error;

    /// Open handle to a file.
    type File: Read + Seek;

    /// Open the file at `path` for reading.
    fn open(&mut self, path: &str) -> Result<Self::File, Self::Error>;
}

impl<T: AudioStorage + ?Sized> AudioStorage for &mut T {
    type Error = T::Error;
    type File = T::File;

    fn open(&mut self, path: &str) -> Result<Self::File, Self::Error> {
        (**self).open(path)
    }
}
