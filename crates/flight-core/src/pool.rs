// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! C1: buffer pool, shared handle, and nested child views.
//!
//! The pool owns a contiguous byte arena sliced into `num_frames` frames of
//! `frame_size` bytes each, plus a free-mask guarded by a mutex (the "internal
//! mutex" option from the contract, chosen over an atomic bitmap because
//! handles here carry genuine, sharable refcounts rather than the teacher
//! slab pool's single-owner slots). A frame's reference count is simply the
//! strong-count of the `Arc<FrameSlot>` its handles share: cloning a `Handle`
//! clones that `Arc`, and the `Arc`'s own drop glue releases the frame back to
//! the pool exactly once, when the last handle (or child view) referencing it
//! is dropped. There is no cycle: `FrameSlot` holds a strong `Arc<PoolShared>`
//! back-pointer, but `PoolShared` never holds a strong reference to a
//! `FrameSlot`.
use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::sync::Arc;

struct PoolShared {
    frame_size: usize,
    num_frames: usize,
    // SAFETY: access to disjoint frame ranges is guarded by `offset`/`length`
    // bookkeeping on `Handle`; concurrent handles to the *same* frame may
    // alias, which is intentional (writability is by convention, not
    // enforced, per the contract). `free` serializes allocate/release only.
    storage: UnsafeCell<Box<[u8]>>,
    free: Mutex<Vec<bool>>,
}

unsafe impl Sync for PoolShared {}
unsafe impl Send for PoolShared {}

struct FrameSlot {
    pool: Arc<PoolShared>,
    index: usize,
}

impl Drop for FrameSlot {
    fn drop(&mut self) {
        let mut free = self.pool.free.lock();
        free[self.index] = true;
    }
}

/// A statically-sized pool of fixed-size frames.
///
/// `Pool` is cheap to clone (it's a thin `Arc` wrapper); clones refer to the
/// same underlying arena.
#[derive(Clone)]
pub struct Pool {
    shared: Arc<PoolShared>,
}

impl Pool {
    /// Creates a pool of `num_frames` frames, each `frame_size` bytes.
    pub fn new(frame_size: usize, num_frames: usize) -> Self {
        let storage = vec![0u8; frame_size * num_frames].into_boxed_slice();
        Self {
            shared: Arc::new(PoolShared {
                frame_size,
                num_frames,
                storage: UnsafeCell::new(storage),
                free: Mutex::new(vec![true; num_frames]),
            }),
        }
    }

    /// The fixed element size `F` of this pool.
    pub fn frame_size(&self) -> usize {
        self.shared.frame_size
    }

    /// Total frame count `N`.
    pub fn capacity(&self) -> usize {
        self.shared.num_frames
    }

    /// Number of currently-free frames.
    pub fn number_of_free_elements(&self) -> usize {
        self.shared.free.lock().iter().filter(|f| **f).count()
    }

    /// Finds the first free frame, marks it owned (refcount 1), and returns a
    /// handle spanning the whole frame. Returns `None` iff the pool is
    /// exhausted. Never calls user code while the free-mask lock is held.
    pub fn allocate(&self) -> Option<Handle> {
        let index = {
            let mut free = self.shared.free.lock();
            let index = free.iter().position(|f| *f)?;
            free[index] = false;
            index
        };
        let frame = Arc::new(FrameSlot {
            pool: Arc::clone(&self.shared),
            index,
        });
        Some(Handle {
            frame: Some(frame),
            offset: 0,
            length: self.shared.frame_size,
            type_id: 0,
        })
    }
}

/// An opaque, refcounted, bounds-checked view of a frame (or a sub-range of
/// one). An invalid handle (no backing frame) is the default.
#[derive(Clone)]
pub struct Handle {
    frame: Option<Arc<FrameSlot>>,
    offset: usize,
    length: usize,
    type_id: u16,
}

impl Default for Handle {
    fn default() -> Self {
        Self::invalid()
    }
}

impl Handle {
    /// An invalid handle referencing no frame.
    pub fn invalid() -> Self {
        Self {
            frame: None,
            offset: 0,
            length: 0,
            type_id: 0,
        }
    }

    /// Whether this handle references a live frame.
    pub fn is_valid(&self) -> bool {
        self.frame.is_some()
    }

    /// Number of bytes this handle's view spans.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the view spans zero bytes.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// 16-bit user tag, used by the software bus for admission filtering.
    pub fn get_type(&self) -> u16 {
        self.type_id
    }

    /// Sets the 16-bit user tag.
    pub fn set_type(&mut self, type_id: u16) {
        self.type_id = type_id;
    }

    /// Current reference count: the number of live handles (including this
    /// one and all of its child views) sharing the backing frame. `0` for an
    /// invalid handle.
    pub fn refcount(&self) -> usize {
        self.frame.as_ref().map_or(0, Arc::strong_count)
    }

    /// Yields a child handle over `[offset, offset+length)` of this handle's
    /// own view, sharing the same frame and refcount. Returns an invalid
    /// handle if out of range or if `self` is already invalid.
    pub fn sub_slice(&self, offset: usize, length: usize) -> Handle {
        if !self.is_valid() || offset + length > self.length {
            return Handle::invalid();
        }
        Handle {
            frame: self.frame.clone(),
            offset: self.offset + offset,
            length,
            type_id: self.type_id,
        }
    }

    /// Child view skipping the first `n` bytes.
    pub fn skip_first(&self, n: usize) -> Handle {
        if n > self.length {
            return Handle::invalid();
        }
        self.sub_slice(n, self.length - n)
    }

    /// Child view of the first `n` bytes.
    pub fn first(&self, n: usize) -> Handle {
        if n > self.length {
            return Handle::invalid();
        }
        self.sub_slice(0, n)
    }

    /// Child view of the last `n` bytes.
    pub fn last(&self, n: usize) -> Handle {
        if n > self.length {
            return Handle::invalid();
        }
        self.sub_slice(self.length - n, n)
    }

    fn byte_offset(&self, i: usize) -> Option<usize> {
        let frame = self.frame.as_ref()?;
        if i >= self.length {
            return None;
        }
        Some(frame.index * frame.pool.frame_size + self.offset + i)
    }

    /// Reads byte `i` of the view. `None` if invalid or out of range.
    pub fn get(&self, i: usize) -> Option<u8> {
        let byte_index = self.byte_offset(i)?;
        let frame = self.frame.as_ref()?;
        // SAFETY: byte_index was bounds-checked against this handle's own
        // length, which was itself bounds-checked against the parent's.
        unsafe { Some((*frame.pool.storage.get())[byte_index]) }
    }

    /// Writes byte `i` of the view. Returns `false` if invalid or out of range.
    pub fn set(&self, i: usize, value: u8) -> bool {
        let Some(byte_index) = self.byte_offset(i) else {
            return false;
        };
        let frame = self.frame.as_ref().unwrap();
        // SAFETY: see `get`; mutation through a shared handle is permitted by
        // convention (contract §4.1).
        unsafe {
            (*frame.pool.storage.get())[byte_index] = value;
        }
        true
    }

    /// Copies `src` into the view starting at byte 0. Returns `false` if
    /// `src` does not fit or the handle is invalid.
    pub fn write_bytes(&self, src: &[u8]) -> bool {
        if !self.is_valid() || src.len() > self.length {
            return false;
        }
        for (i, b) in src.iter().enumerate() {
            self.set(i, *b);
        }
        true
    }

    /// Copies the first `dst.len()` bytes of the view into `dst`. Returns
    /// `false` if that range does not fit or the handle is invalid.
    pub fn read_bytes(&self, dst: &mut [u8]) -> bool {
        if !self.is_valid() || dst.len() > self.length {
            return false;
        }
        for (i, b) in dst.iter_mut().enumerate() {
            *b = self.get(i).unwrap();
        }
        true
    }
}
