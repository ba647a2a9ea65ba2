use std::io::{self, Write};

/// `Write` adapter that tallies bytes and newline-terminated lines passing through it.
#[derive(Debug, Default)]
pub struct CountingWriter<W> {
    inner: W,
    bytes: u64,
    lines: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes: 0,
            lines: 0,
        }
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl CountingWriter<io::Sink> {
    /// Counts output without keeping it.
    pub fn discarding() -> Self {
        Self::new(io::sink())
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        let written = &buf[..n];
        self.bytes += n as u64;
        self.lines += written.iter().filter(|&&b| b == b'\n').count() as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
