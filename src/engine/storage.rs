//! Chunked row storage for one archetype.
//!
//! Rows live in fixed-size 16 KiB chunks allocated at the family alignment
//! and zero-filled, so components start life as all-zero bytes. A chunk
//! tracks how many rows are in use at its head; freed rows are remembered on
//! a recycled stack and handed out again before any new chunk is allocated.
//!
//! Row reservation is a two-phase protocol: [`RowStore::request_rows`]
//! produces region descriptors covering the requested rows without removing
//! anything from the recycled stack, and the caller later either
//! [`RowStore::commit`]s (truncating the recycled stack) or
//! [`RowStore::abort`]s (returning fresh rows to the recycled stack). Chunk
//! memory is never released mid-life, so committed row pointers stay valid
//! until the store is dropped.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use log::{debug, warn};

use crate::engine::error::StorageError;
use crate::engine::layout::FamilyLayout;
use crate::engine::types::{ChunkId, RowId, CHUNK_BYTE_SIZE};


/// A fixed-size aligned allocation carved into `capacity` rows.
///
/// A *virtual* chunk (zero-sized family) owns no memory and exists only so
/// systems can be invoked once per row; its row pointers are dangling and
/// must never be dereferenced.
pub struct Chunk {
    data: Option<NonNull<u8>>,
    layout: Option<Layout>,
    capacity: u32,
    count: u32,
}

impl Chunk {
    fn allocate(alignment: usize, capacity: u32) -> Result<Self, StorageError> {
        let layout = Layout::from_size_align(CHUNK_BYTE_SIZE, alignment)
            .map_err(|_| StorageError::AllocFailed { bytes: CHUNK_BYTE_SIZE, alignment })?;

        // SAFETY: `layout` has nonzero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        let data = NonNull::new(ptr)
            .ok_or(StorageError::AllocFailed { bytes: CHUNK_BYTE_SIZE, alignment })?;

        Ok(Self { data: Some(data), layout: Some(layout), capacity, count: 0 })
    }

    fn virtual_chunk(count: u32) -> Self {
        Self { data: None, layout: None, capacity: count, count }
    }

    /// Number of rows currently in use at the head of this chunk.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Total rows this chunk can hold.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns `true` if this chunk owns no memory.
    #[inline]
    pub fn is_virtual(&self) -> bool {
        self.data.is_none()
    }

    /// Base pointer of the chunk, dangling for virtual chunks.
    #[inline]
    pub fn base_ptr(&self) -> NonNull<u8> {
        self.data.unwrap_or(NonNull::dangling())
    }

    /// Pointer to the row at `row * family_size` from the chunk base.
    ///
    /// The caller is responsible for `row < capacity`; for virtual chunks
    /// the result is dangling and must not be dereferenced.
    #[inline]
    pub fn row_ptr(&self, row: RowId, family_size: usize) -> NonNull<u8> {
        match self.data {
            // SAFETY: the offset stays within the 16 KiB allocation because
            // row < capacity = CHUNK_BYTE_SIZE / family_size.
            Some(base) => unsafe {
                NonNull::new_unchecked(base.as_ptr().add(row as usize * family_size))
            },
            None => NonNull::dangling(),
        }
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        if let (Some(data), Some(layout)) = (self.data, self.layout) {
            // SAFETY: `data` was returned by `alloc_zeroed` with `layout`.
            unsafe { dealloc(data.as_ptr(), layout) };
        }
    }
}

/// Address of one free or assigned row slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSlot {
    /// Chunk index within the store.
    pub chunk: ChunkId,

    /// Row index within the chunk.
    pub row: RowId,
}

/// A run of contiguous reserved rows inside one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Chunk index within the store.
    pub chunk: ChunkId,

    /// First reserved row.
    pub row: RowId,

    /// Number of reserved rows.
    pub count: u32,
}

/// Outcome of phase one of the reservation protocol.
///
/// Holds the reserved regions plus the bookkeeping needed to either commit
/// (drop the consumed recycled slots) or abort (return fresh rows to the
/// recycled stack). Recycled-drawn regions come first, one row each, in
/// LIFO order; fresh regions follow.
#[derive(Debug)]
pub struct RegionRequest {
    regions: Vec<Region>,
    new_recycled_len: usize,
    fresh_from: usize,
}

impl RegionRequest {
    /// Reserved regions in assignment order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Recycled-stack length after a commit of this request.
    pub fn new_recycled_len(&self) -> usize {
        self.new_recycled_len
    }

    /// Iterates over every reserved row slot in assignment order.
    pub fn row_slots(&self) -> impl Iterator<Item = RowSlot> + '_ {
        self.regions.iter().flat_map(|region| {
            (0..region.count).map(move |i| RowSlot { chunk: region.chunk, row: region.row + i })
        })
    }

    /// Total number of reserved rows.
    pub fn row_count(&self) -> usize {
        self.regions.iter().map(|r| r.count as usize).sum()
    }
}

/// Row storage for a single archetype.
pub struct RowStore {
    family_size: usize,
    alignment: usize,
    rows_per_chunk: u32,
    chunks: Vec<Chunk>,
    recycled: Vec<RowSlot>,
}

impl RowStore {
    /// Creates an empty store for rows of the given layout.
    pub fn new(layout: &FamilyLayout) -> Self {
        let rows_per_chunk = if layout.family_size == 0 {
            0
        } else {
            (CHUNK_BYTE_SIZE / layout.family_size) as u32
        };

        Self {
            family_size: layout.family_size,
            alignment: layout.alignment,
            rows_per_chunk,
            chunks: Vec::new(),
            recycled: Vec::new(),
        }
    }

    /// Row stride in bytes.
    #[inline]
    pub fn family_size(&self) -> usize {
        self.family_size
    }

    /// Rows held by each full-size chunk (0 for zero-sized families).
    #[inline]
    pub fn rows_per_chunk(&self) -> u32 {
        self.rows_per_chunk
    }

    /// Chunks in allocation order; execution walks this slice in reverse so
    /// the newest chunk is visited first.
    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Number of chunks currently allocated.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of row slots waiting on the recycled stack.
    #[inline]
    pub fn recycled_len(&self) -> usize {
        self.recycled.len()
    }

    /// Phase one: reserve `n` rows.
    ///
    /// Rows are drawn from the recycled stack first (LIFO, one region per
    /// slot, without popping), then from the free tail of the newest chunk,
    /// then from newly allocated chunks. For a zero-sized family a single
    /// virtual chunk covering the entire request is appended instead.
    ///
    /// ## Errors
    /// `AllocFailed` if a chunk allocation fails or the family exceeds the
    /// chunk size; all reservations made so far are rolled back, leaving the
    /// store untouched.

    pub fn request_rows(&mut self, n: usize) -> Result<RegionRequest, StorageError> {
        let mut regions = Vec::new();

        if n == 0 {
            return Ok(RegionRequest {
                regions,
                new_recycled_len: self.recycled.len(),
                fresh_from: 0,
            });
        }

        if self.family_size == 0 {
            let chunk = self.chunks.len() as ChunkId;
            self.chunks.push(Chunk::virtual_chunk(n as u32));
            regions.push(Region { chunk, row: 0, count: n as u32 });
            return Ok(RegionRequest {
                regions,
                new_recycled_len: self.recycled.len(),
                fresh_from: 0,
            });
        }

        if self.rows_per_chunk == 0 {
            // A family wider than a chunk can never be stored.
            return Err(StorageError::AllocFailed {
                bytes: self.family_size,
                alignment: self.alignment,
            });
        }

        let mut remaining = n;

        // Recycled slots, newest first. The stack itself is only truncated
        // at commit so an abort costs nothing.
        let take = remaining.min(self.recycled.len());
        for i in 0..take {
            let slot = self.recycled[self.recycled.len() - 1 - i];
            regions.push(Region { chunk: slot.chunk, row: slot.row, count: 1 });
        }
        remaining -= take;
        let new_recycled_len = self.recycled.len() - take;
        let fresh_from = regions.len();

        // Free tail of the newest chunk.
        let mut tail_reserved: Option<(usize, u32)> = None;
        if remaining > 0 {
            if let Some(index) = self.chunks.len().checked_sub(1) {
                let chunk = &mut self.chunks[index];
                let free = chunk.capacity - chunk.count;
                if free > 0 {
                    let rows = remaining.min(free as usize) as u32;
                    regions.push(Region { chunk: index as ChunkId, row: chunk.count, count: rows });
                    chunk.count += rows;
                    remaining -= rows as usize;
                    tail_reserved = Some((index, rows));
                }
            }
        }

        // Fresh chunks for the overflow.
        let first_new_chunk = self.chunks.len();
        while remaining > 0 {
            let mut chunk = match Chunk::allocate(self.alignment, self.rows_per_chunk) {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("chunk allocation failed mid-reserve; rolling back {n}-row request");
                    self.chunks.truncate(first_new_chunk);
                    if let Some((index, rows)) = tail_reserved {
                        self.chunks[index].count -= rows;
                    }
                    return Err(e);
                }
            };

            let rows = remaining.min(self.rows_per_chunk as usize) as u32;
            chunk.count = rows;
            regions.push(Region { chunk: self.chunks.len() as ChunkId, row: 0, count: rows });
            self.chunks.push(chunk);
            remaining -= rows as usize;
        }

        if self.chunks.len() > first_new_chunk {
            debug!(
                "allocated {} chunk(s) of {} rows for {n}-row request",
                self.chunks.len() - first_new_chunk,
                self.rows_per_chunk
            );
        }

        Ok(RegionRequest { regions, new_recycled_len, fresh_from })
    }

    /// Phase two, success path: drop the consumed recycled slots.
    pub fn commit(&mut self, request: RegionRequest) {
        self.recycled.truncate(request.new_recycled_len);
    }

    /// Phase two, failure path: return every fresh row to the recycled
    /// stack. Recycled-drawn regions were never removed, and chunk memory
    /// is kept; abandoned rows become free slots rather than unwinding
    /// allocations.
    pub fn abort(&mut self, request: RegionRequest) {
        for region in &request.regions[request.fresh_from..] {
            for i in 0..region.count {
                self.recycled.push(RowSlot { chunk: region.chunk, row: region.row + i });
            }
        }
    }

    /// Pointer to an assigned row, or `None` if the address is out of
    /// bounds. Virtual chunks yield dangling pointers.
    pub fn row_ptr(&self, chunk: ChunkId, row: RowId) -> Option<NonNull<u8>> {
        let chunk = self.chunks.get(chunk as usize)?;
        if row >= chunk.count {
            return None;
        }
        Some(chunk.row_ptr(row, self.family_size))
    }

    /// Zeroes a row and pushes it onto the recycled stack.
    ///
    /// Zeroing happens at recycle time so rows handed out of the stack
    /// satisfy the same all-zero guarantee as rows from a fresh chunk.
    pub fn recycle_row(&mut self, slot: RowSlot) {
        if let Some(ptr) = self.row_ptr(slot.chunk, slot.row) {
            if !self.chunks[slot.chunk as usize].is_virtual() && self.family_size > 0 {
                // SAFETY: `ptr` addresses `family_size` bytes inside the
                // chunk allocation; no references to them exist.
                unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0, self.family_size) };
            }
            self.recycled.push(slot);
        }
    }
}
