//! Splits an async byte stream into newline-terminated records.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// Default size of a single raw read.
pub const DEFAULT_CHUNK_SIZE: usize = 32;

/// Reads fixed-size chunks from `source` and hands out complete lines.
///
/// Lines may span any number of reads and have no length limit. A line is
/// only complete once its `\n` has been seen; bytes after the last
/// terminator at end-of-input are kept in [`LineScanner::remainder`].
///
/// `next_line` is cancel safe: if the future is dropped while waiting on
/// the source, bytes already buffered stay buffered for the next call.
pub struct LineScanner<R> {
    source: R,
    chunk: Box<[u8]>,
    pos: usize,
    filled: usize,
    line: Vec<u8>,
    line_done: bool,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineScanner<R> {
    pub fn new(source: R) -> Self {
        Self::with_chunk_size(source, DEFAULT_CHUNK_SIZE)
    }

    /// `chunk_size` is clamped to at least one byte.
    pub fn with_chunk_size(source: R, chunk_size: usize) -> Self {
        Self {
            source,
            chunk: vec![0; chunk_size.max(1)].into_boxed_slice(),
            pos: 0,
            filled: 0,
            line: Vec::with_capacity(chunk_size.max(1)),
            line_done: false,
            eof: false,
        }
    }

    /// Next complete line including its `\n`, or `None` at end-of-input.
    pub async fn next_line(&mut self) -> io::Result<Option<&[u8]>> {
        if self.line_done {
            self.line.clear();
            self.line_done = false;
        }

        loop {
            let pending = &self.chunk[self.pos..self.filled];
            if let Some(idx) = pending.iter().position(|b| *b == b'\n') {
                self.line.extend_from_slice(&pending[..=idx]);
                self.pos += idx + 1;
                self.line_done = true;
                return Ok(Some(&self.line));
            }
            self.line.extend_from_slice(pending);
            self.pos = self.filled;

            if self.eof {
                return Ok(None);
            }

            let n = self.source.read(&mut self.chunk).await?;
            self.pos = 0;
            self.filled = n;
            if n == 0 {
                self.eof = true;
            }
        }
    }

    /// Unterminated bytes left over at end-of-input.
    pub fn remainder(&self) -> &[u8] {
        if self.line_done {
            &[]
        } else {
            &self.line
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.eof && self.pos == self.filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    async fn collect<R: AsyncRead + Unpin>(scanner: &mut LineScanner<R>) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        while let Some(line) = scanner.next_line().await.unwrap() {
            lines.push(line.to_vec());
        }
        lines
    }

    #[tokio::test]
    async fn splits_lines_across_any_chunk_size() {
        let input = b"Time,Level\n1,0\n2,1\n4,1\n5,0\n".to_vec();
        for chunk_size in [1, 2, 3, 7, 32, 1024] {
            let mut scanner = LineScanner::with_chunk_size(Cursor::new(input.clone()), chunk_size);
            let lines = collect(&mut scanner).await;
            assert_eq!(
                lines,
                vec![
                    b"Time,Level\n".to_vec(),
                    b"1,0\n".to_vec(),
                    b"2,1\n".to_vec(),
                    b"4,1\n".to_vec(),
                    b"5,0\n".to_vec(),
                ],
                "chunk size {}",
                chunk_size
            );
            assert!(scanner.is_exhausted());
            assert!(scanner.remainder().is_empty());
        }
    }

    #[tokio::test]
    async fn long_lines_have_no_limit() {
        let long = format!("{},1\n", "9".repeat(18));
        let mut scanner = LineScanner::with_chunk_size(Cursor::new(long.clone().into_bytes()), 4);
        let lines = collect(&mut scanner).await;
        assert_eq!(lines, vec![long.into_bytes()]);
    }

    #[tokio::test]
    async fn unterminated_tail_is_kept_as_remainder() {
        let mut scanner = LineScanner::with_chunk_size(Cursor::new(b"1,1\n2,2".to_vec()), 3);
        let lines = collect(&mut scanner).await;
        assert_eq!(lines, vec![b"1,1\n".to_vec()]);
        assert_eq!(scanner.remainder(), b"2,2");
    }

    #[tokio::test]
    async fn empty_input() {
        let mut scanner = LineScanner::new(Cursor::new(Vec::new()));
        assert!(scanner.next_line().await.unwrap().is_none());
        assert!(scanner.is_exhausted());
    }

    #[tokio::test]
    async fn partial_line_survives_dropped_read() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut scanner = LineScanner::with_chunk_size(rx, 2);

        use tokio::io::AsyncWriteExt;
        tx.write_all(b"12,").await.unwrap();

        // No terminator yet, so this times out while waiting on the source.
        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(20), scanner.next_line()).await;
        assert!(waited.is_err());

        tx.write_all(b"2\n").await.unwrap();
        let line = scanner.next_line().await.unwrap().map(<[u8]>::to_vec);
        assert_eq!(line, Some(b"12,2\n".to_vec()));
    }
}
