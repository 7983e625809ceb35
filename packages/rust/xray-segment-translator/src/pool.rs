//! Reusable encode buffers.
//!
//! Encoding a segment document needs a scratch buffer. [`WriterPool`] keeps a
//! bounded free list of them so steady-state translation does not allocate
//! one per span. A borrowed buffer is handed back when its [`PooledWriter`]
//! guard drops, on success and error paths alike.

use crate::constants::defaults::{WRITER_BUFFER_CAPACITY, WRITER_POOL_SIZE};
use std::io::{self, Write};
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// A bounded pool of byte buffers, shared between translators via `Arc`.
#[derive(Debug)]
pub struct WriterPool {
    buffers: Mutex<Vec<Vec<u8>>>,
    max_size: usize,
}

impl Default for WriterPool {
    fn default() -> Self {
        Self::new(WRITER_POOL_SIZE)
    }
}

impl WriterPool {
    /// Creates a pool that retains at most `max_size` idle buffers.
    pub fn new(max_size: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            max_size,
        }
    }

    /// Takes a cleared buffer from the pool, allocating one if none is idle.
    pub fn borrow(&self) -> PooledWriter<'_> {
        let buffer = self
            .buffers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(WRITER_BUFFER_CAPACITY));
        PooledWriter {
            pool: self,
            buffer,
        }
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.buffers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn give_back(&self, mut buffer: Vec<u8>) {
        buffer.clear();
        let mut buffers = self
            .buffers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if buffers.len() < self.max_size {
            buffers.push(buffer);
        }
    }
}

/// A buffer borrowed from a [`WriterPool`].
#[derive(Debug)]
pub struct PooledWriter<'a> {
    pool: &'a WriterPool,
    buffer: Vec<u8>,
}

impl Deref for PooledWriter<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl DerefMut for PooledWriter<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl Write for PooledWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for PooledWriter<'_> {
    fn drop(&mut self) {
        self.pool.give_back(std::mem::take(&mut self.buffer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_buffer_is_returned_cleared() {
        let pool = WriterPool::new(4);
        {
            let mut writer = pool.borrow();
            writer.write_all(b"{\"name\":\"a\"}").unwrap();
            assert_eq!(writer.as_slice(), b"{\"name\":\"a\"}");
        }
        assert_eq!(pool.idle(), 1);

        let writer = pool.borrow();
        assert!(writer.is_empty());
        assert!(writer.capacity() >= 12);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = WriterPool::new(2);
        let writers: Vec<_> = (0..5).map(|_| pool.borrow()).collect();
        drop(writers);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_buffer_returned_on_error_path() {
        fn failing(pool: &WriterPool) -> io::Result<()> {
            let mut writer = pool.borrow();
            writer.write_all(b"partial")?;
            Err(io::Error::new(io::ErrorKind::Other, "encode failed"))
        }

        let pool = WriterPool::new(1);
        assert!(failing(&pool).is_err());
        assert_eq!(pool.idle(), 1);
        assert!(pool.borrow().is_empty());
    }

    #[test]
    fn test_shared_across_threads() {
        let pool = Arc::new(WriterPool::default());
        assert_eq!(pool.max_size(), WRITER_POOL_SIZE);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let mut writer = pool.borrow();
                        write!(writer, "segment-{i}").unwrap();
                        assert!(writer.starts_with(b"segment-"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pool.idle() <= 8);
    }
}
