//! Bounded access to byte ranges of a package and chunked copying.

use std::io::{self, Read, Seek, Write};

use tracing::instrument;

/// Reader limited to one `[start, start + limit)` range of the underlying package
pub(crate) struct RpkBlockReader<'a, R: Read + Seek> {
    inner: io::Take<&'a mut R>,
}

impl<'a, R: Read + Seek> RpkBlockReader<'a, R> {
    #[instrument(skip(reader))]
    pub fn new(reader: &'a mut R, start: u64, limit: u64) -> io::Result<Self> {
        reader.seek(io::SeekFrom::Start(start))?;

        Ok(RpkBlockReader {
            inner: reader.by_ref().take(limit),
        })
    }
}

impl<R: Read + Seek> Read for RpkBlockReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Copy everything `reader` yields into `writer`, `buffer_size` bytes at a time.
///
/// Returns the number of bytes copied.
#[instrument(skip(reader, writer), err)]
pub(crate) fn copy_chunked<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
) -> io::Result<u64> {
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(total),
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..read])?;
        total += read as u64;
    }
}
