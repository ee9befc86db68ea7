//! Caller-supplied operational memory.
//!
//! Every stage answers "how many bytes do you need for `n` points" with an
//! [`OpMemSize`] and then runs against an [`Arena`] carved from one [`OpMem`]
//! block of at least that size. Stages never touch the heap.

use std::{
    mem::{align_of, size_of},
    ops::Deref,
};

use bytemuck::Pod;

use crate::{Error, Result};

const WORD: usize = size_of::<u64>();

/// Owned, 8-byte aligned byte block. The only heap allocation of a solve.
pub struct OpMem {
    words: Vec<u64>,
}

impl OpMem {
    pub fn new(bytes: usize) -> Self {
        Self {
            words: vec![0; bytes.div_ceil(WORD)],
        }
    }

    pub fn len(&self) -> usize {
        self.words.len() * WORD
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn arena(&mut self) -> Arena<'_> {
        Arena::new(bytemuck::cast_slice_mut(&mut self.words))
    }
}

/// Byte count for a sequence of arena allocations.
///
/// Each slice is charged its payload plus worst-case alignment padding, so an
/// arena of `bytes()` always fits the same allocations in the same order.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OpMemSize {
    bytes: usize,
}

impl OpMemSize {
    pub const fn new() -> Self {
        Self { bytes: 0 }
    }

    pub fn slice<T: Pod>(self, len: usize) -> Self {
        let payload = len.saturating_mul(size_of::<T>());
        Self {
            bytes: self
                .bytes
                .saturating_add(payload)
                .saturating_add(align_of::<T>() - 1),
        }
    }

    /// Both regions live at the same time.
    pub fn and(self, other: Self) -> Self {
        Self {
            bytes: self.bytes.saturating_add(other.bytes),
        }
    }

    /// Only one of the regions lives at a time (successive scratch users).
    pub fn or(self, other: Self) -> Self {
        Self {
            bytes: self.bytes.max(other.bytes),
        }
    }

    pub fn bytes(self) -> usize {
        self.bytes
    }
}

/// Bump allocator over a borrowed byte region.
pub struct Arena<'a> {
    buf: &'a mut [u8],
    used: usize,
}

impl<'a> Arena<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, used: 0 }
    }

    /// Bytes handed out so far, padding included.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Bytes not yet handed out.
    pub fn available(&self) -> usize {
        self.buf.len()
    }

    /// Zero-initialised slice of `len` elements.
    pub fn alloc<T: Pod>(&mut self, len: usize) -> Result<&'a mut [T]> {
        let payload = len.checked_mul(size_of::<T>()).ok_or(Error::OpMemExhausted {
            requested: usize::MAX,
            available: self.buf.len(),
        })?;
        let pad = match self.buf.as_ptr().align_offset(align_of::<T>()) {
            pad if pad <= self.buf.len() => pad,
            _ => self.buf.len(),
        };
        let requested = pad.saturating_add(payload);
        if requested > self.buf.len() {
            return Err(Error::OpMemExhausted {
                requested,
                available: self.buf.len(),
            });
        }

        let buf = std::mem::take(&mut self.buf);
        let (head, tail) = buf.split_at_mut(requested);
        self.buf = tail;
        self.used += requested;

        let bytes = &mut head[pad..];
        bytes.fill(0);
        bytemuck::try_cast_slice_mut(bytes)
            .map_err(|e| Error::other(format!("arena cast failed: {e}")))
    }

    pub fn buffer<T: Pod>(&mut self, capacity: usize) -> Result<Buffer<'a, T>> {
        Ok(Buffer::new(self.alloc(capacity)?))
    }

    /// Reborrows the unused tail for one stage call. Dropping the scratch
    /// arena hands the space back.
    pub fn scratch(&mut self) -> Arena<'_> {
        Arena {
            buf: &mut *self.buf,
            used: 0,
        }
    }
}

/// Capacity-bounded vector over arena storage.
pub struct Buffer<'a, T> {
    data: &'a mut [T],
    len: usize,
}

impl<'a, T: Copy> Buffer<'a, T> {
    pub fn new(data: &'a mut [T]) -> Self {
        Self { data, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    pub fn push(&mut self, value: T) -> Result<()> {
        if self.is_full() {
            return Err(Error::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        self.data[self.len] = value;
        self.len += 1;
        Ok(())
    }

    /// Shifts `[at, len)` right by one and writes `value` at `at`.
    pub fn insert(&mut self, at: usize, value: T) -> Result<()> {
        if at > self.len {
            return Err(Error::other(format!(
                "insert position {at} past length {}",
                self.len
            )));
        }
        if self.is_full() {
            return Err(Error::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        self.data.copy_within(at..self.len, at + 1);
        self.data[at] = value;
        self.len += 1;
        Ok(())
    }

    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<()> {
        let end = self.len + values.len();
        if end > self.capacity() {
            return Err(Error::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        self.data[self.len..end].copy_from_slice(values);
        self.len = end;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data[..self.len]
    }
}

impl<T: Copy> Deref for Buffer<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}
