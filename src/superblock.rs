/*
 * Copyright 2026 simplefs contributors
 *
 * This file is part of simplefs.
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to
 * deal in the Software without restriction, including without limitation the
 * rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
 * sell copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in
 * all copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
 * FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
 * DEALINGS IN THE SOFTWARE.
 */

//! The superblock (§2/§3, component S): block 0 of the partition. Holds the
//! layout parameters and free counters; owns the two bitmaps for the
//! lifetime of the mount, mirroring the teacher's `Superblock`
//! (`kernel/src/file/fs/ext2/mod.rs`) in role, though the on-disk shape here
//! is SimpleFS's own (extents and a gap-encoded directory, not block
//! groups).

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use crate::{
    consts::{BLOCK_SIZE, MAGIC},
    device::{Block, BlockDevice},
    error::{Error, Result},
};

/// The raw, on-disk layout of block 0. Every integer is little-endian; the
/// trailing bytes are reserved and must be zero (§6: "the trailing bytes of
/// the block are unused and should be zero").
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RawSuperblock {
    pub magic: u32,
    pub nr_blocks: u32,
    pub nr_inodes: u32,
    pub nr_istore_blocks: u32,
    pub nr_ifree_blocks: u32,
    pub nr_bfree_blocks: u32,
    pub nr_free_inodes: u32,
    pub nr_free_blocks: u32,
    _reserved: [u8; BLOCK_SIZE - 8 * 4],
}

const_assert_eq!(core::mem::size_of::<RawSuperblock>(), BLOCK_SIZE);

impl RawSuperblock {
    /// Builds a fresh record with the trailing reserved bytes zeroed, as
    /// written by the formatter.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        magic: u32,
        nr_blocks: u32,
        nr_inodes: u32,
        nr_istore_blocks: u32,
        nr_ifree_blocks: u32,
        nr_bfree_blocks: u32,
        nr_free_inodes: u32,
        nr_free_blocks: u32,
    ) -> Self {
        Self {
            magic,
            nr_blocks,
            nr_inodes,
            nr_istore_blocks,
            nr_ifree_blocks,
            nr_bfree_blocks,
            nr_free_inodes,
            nr_free_blocks,
            _reserved: [0u8; BLOCK_SIZE - 8 * 4],
        }
    }

    fn from_block(block: &Block) -> Self {
        *bytemuck::from_bytes(block)
    }

    fn to_block(self) -> Block {
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(bytemuck::bytes_of(&self));
        block
    }
}

/// The block-aligned partition layout derived from a [`RawSuperblock`] (§3,
/// "Partition layout"): superblock, inode table, inode-free bitmap,
/// block-free bitmap, then the data region.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub istore_start: u32,
    pub ifree_start: u32,
    pub bfree_start: u32,
    pub data_start: u32,
}

impl Layout {
    fn from_raw(raw: &RawSuperblock) -> Self {
        let istore_start = 1;
        let ifree_start = istore_start + raw.nr_istore_blocks;
        let bfree_start = ifree_start + raw.nr_ifree_blocks;
        let data_start = bfree_start + raw.nr_bfree_blocks;
        Self {
            istore_start,
            ifree_start,
            bfree_start,
            data_start,
        }
    }
}

/// The in-memory superblock: the raw on-disk record plus the layout it
/// implies. Owned for the mount's lifetime by whoever calls [`Superblock::mount`].
#[derive(Debug, Clone, Copy)]
pub struct Superblock {
    pub raw: RawSuperblock,
    pub layout: Layout,
}

impl Superblock {
    /// Builds an in-memory superblock directly from a raw record, deriving
    /// its layout. Used by the formatter, which has no on-disk record to
    /// read yet.
    pub fn from_parts(raw: RawSuperblock) -> Self {
        let layout = Layout::from_raw(&raw);
        Self { raw, layout }
    }

    /// Reads and validates the superblock from block 0 of `dev`.
    ///
    /// Checks the invariants of §3: the magic matches, and the five layout
    /// regions sum exactly to `nr_blocks`. Bitmap-population invariants
    /// (`nr_free_inodes`/`nr_free_blocks` matching zero-bit counts) are the
    /// bitmap allocator's responsibility to maintain, not re-derived here on
    /// every mount.
    pub fn mount(dev: &mut dyn BlockDevice) -> Result<Self> {
        let mut block = [0u8; BLOCK_SIZE];
        dev.read_block(0, &mut block)?;
        let raw = RawSuperblock::from_block(&block);
        if raw.magic != MAGIC {
            log::error!("superblock magic mismatch: {:#x}", raw.magic);
            return Err(Error::Inval);
        }
        let layout = Layout::from_raw(&raw);
        if layout.data_start > raw.nr_blocks {
            log::error!(
                "superblock layout regions (data starts at block {}) exceed nr_blocks ({})",
                layout.data_start,
                raw.nr_blocks
            );
            return Err(Error::Inval);
        }
        log::debug!(
            "mounted: {} blocks, {} inodes, data region starts at block {}",
            raw.nr_blocks,
            raw.nr_inodes,
            layout.data_start
        );
        Ok(Self { raw, layout })
    }

    /// Writes the superblock back to block 0, as on flush.
    pub fn flush(&self, dev: &mut dyn BlockDevice) -> Result<()> {
        dev.write_block(0, &self.raw.to_block())?;
        Ok(())
    }

    /// Number of blocks in the data region (everything after the two
    /// bitmaps).
    pub fn data_blocks(&self) -> u32 {
        self.raw.nr_blocks - self.layout.data_start
    }
}
