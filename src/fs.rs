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

//! The mounted filesystem handle: wires the superblock, bitmaps, inode
//! store, and extent index together behind the operations §6 exposes to the
//! host (`mount`, `iget`). Grounded in the teacher's top-level `Ext2Fs`
//! (`kernel/src/file/fs/ext2/mod.rs`), which plays the same orchestrating
//! role over its own block-group/bitmap/inode pieces.

use std::collections::HashMap;

use crate::{
    clock::Clock,
    consts::{BLOCK_SIZE, MAGIC},
    device::{Block, BlockDevice},
    error::Result,
    extent::{self, ExtentIndexBlock},
    inode::{self, FileKind, RawInode},
    superblock::{RawSuperblock, Superblock},
};

/// An in-memory, materialized inode: the raw record plus its number. Mirrors
/// the identity-mapped cache entry of §4.5/§5 ("inode identity map"); the
/// host is expected to own the actual cache, keyed by `ino`, and hand
/// `SimpleFs` back a `&mut Inode` it already resolved or freshly
/// materialized.
#[derive(Debug, Clone, Copy)]
pub struct Inode {
    pub ino: u32,
    pub raw: RawInode,
}

impl Inode {
    pub fn kind(&self) -> Option<FileKind> {
        self.raw.kind()
    }
}

/// A content-addressed, identity-mapped inode cache keyed by `ino` (§5:
/// "the host provides a content-addressed cache keyed by ino"). A minimal,
/// in-process stand-in for the real host cache, sufficient for driving the
/// core from tests or a simple embedder.
#[derive(Debug, Default)]
pub struct InodeCache {
    entries: HashMap<u32, Inode>,
}

impl InodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materializes inode `ino`, returning the cached copy if already
    /// populated (§4.5: "if it is already populated, return it").
    pub fn get(&mut self, sb: &Superblock, dev: &mut dyn BlockDevice, ino: u32) -> Result<Inode> {
        if let Some(existing) = self.entries.get(&ino) {
            return Ok(*existing);
        }
        let raw = inode::read_inode(sb, dev, ino)?;
        let entry = Inode { ino, raw };
        self.entries.insert(ino, entry);
        Ok(entry)
    }

    /// Writes an inode's record back to disk and refreshes the cache entry.
    pub fn put(&mut self, sb: &Superblock, dev: &mut dyn BlockDevice, entry: Inode) -> Result<()> {
        inode::write_inode(sb, dev, entry.ino, &entry.raw)?;
        self.entries.insert(entry.ino, entry);
        Ok(())
    }

    /// Drops a cache entry, as on final unlink.
    pub fn forget(&mut self, ino: u32) {
        self.entries.remove(&ino);
    }
}

/// The mounted filesystem (§6: `mount(device) -> superblock handle`).
/// Combines the superblock with its backing device; namespace operations
/// (`src/namespace.rs`) take a `&mut SimpleFs` plus an [`InodeCache`] and a
/// [`Clock`].
pub struct SimpleFs<'d> {
    pub sb: Superblock,
    pub dev: &'d mut dyn BlockDevice,
}

impl<'d> SimpleFs<'d> {
    /// `mount` (§6).
    pub fn mount(dev: &'d mut dyn BlockDevice) -> Result<Self> {
        let sb = Superblock::mount(dev)?;
        Ok(Self { sb, dev })
    }

    /// `iget` (§6): materializes (or returns the cached) inode `ino`.
    pub fn iget(&mut self, cache: &mut InodeCache, ino: u32) -> Result<Inode> {
        cache.get(&self.sb, self.dev, ino)
    }

    /// Reads `ino`'s extent-index block. `ino` must not be a symlink (§4.5:
    /// symlinks have no `ei_block`).
    pub fn read_extent_index(&mut self, inode: &Inode) -> Result<ExtentIndexBlock> {
        extent::read_index(self.dev, inode.raw.ei_block)
    }

    pub fn write_extent_index(&mut self, bno: u32, index: &ExtentIndexBlock) -> Result<()> {
        extent::write_index(self.dev, bno, index)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sb.flush(self.dev)
    }
}

/// Computes the region sizes a superblock for `nr_blocks` total blocks and
/// `nr_inodes` total inodes would need (§3: "Partition layout"). The block
/// bitmap's own size depends on the data region it covers, which in turn
/// depends on the bitmap's size, so this converges iteratively — in
/// practice one or two iterations, since a bitmap block covers `BS*8`
/// blocks.
fn layout_for(nr_blocks: u32, nr_inodes: u32) -> (u32, u32, u32) {
    let bits_per_block = (BLOCK_SIZE * 8) as u32;
    let nr_istore_blocks = (nr_inodes as u64 * crate::consts::INODE_REC as u64)
        .div_ceil(BLOCK_SIZE as u64) as u32;
    let nr_ifree_blocks = nr_inodes.div_ceil(bits_per_block).max(1);
    let overhead = 1 + nr_istore_blocks + nr_ifree_blocks;
    let mut nr_bfree_blocks = 1u32;
    loop {
        let data_blocks = nr_blocks.saturating_sub(overhead + nr_bfree_blocks);
        let needed = data_blocks.div_ceil(bits_per_block).max(1);
        if needed == nr_bfree_blocks {
            break;
        }
        nr_bfree_blocks = needed;
    }
    (nr_istore_blocks, nr_ifree_blocks, nr_bfree_blocks)
}

/// Formats `dev` with a fresh SimpleFS image: writes the superblock and
/// zeroes the bitmaps, leaving every inode and data block free. This is not
/// the mkfs-equivalent formatter or a command-line front end (both
/// deliberately out of scope, §1) — just the minimal bootstrap a test or
/// embedder needs to obtain a mountable image, built directly on the
/// allocator and superblock primitives rather than duplicating them.
pub fn format(dev: &mut dyn BlockDevice, nr_blocks: u32, nr_inodes: u32) -> Result<Superblock> {
    let (nr_istore_blocks, nr_ifree_blocks, nr_bfree_blocks) = layout_for(nr_blocks, nr_inodes);
    let overhead = 1 + nr_istore_blocks + nr_ifree_blocks + nr_bfree_blocks;
    let nr_free_blocks = nr_blocks.saturating_sub(overhead);

    let raw = RawSuperblock::new(
        MAGIC,
        nr_blocks,
        nr_inodes,
        nr_istore_blocks,
        nr_ifree_blocks,
        nr_bfree_blocks,
        nr_inodes - 1,
        nr_free_blocks,
    );
    let zero: Block = [0u8; BLOCK_SIZE];
    for blk in 1..nr_blocks {
        dev.write_block(blk, &zero)?;
    }
    let mut sb = Superblock::from_parts(raw);
    // ino 0 is reserved to mean NONE (§3, §4.1); the bitmap's zero bits must
    // match nr_free_inodes exactly, so bit 0 is marked used even though
    // nothing is ever materialized there.
    crate::bitmap::reserve_zero_inode(&mut sb, dev)?;
    sb.flush(dev)?;
    Superblock::mount(dev)
}

/// Test-only convenience: formats a fresh in-memory image and mounts it.
/// Exercised directly by `bitmap`'s and `extent`'s unit tests, which need a
/// laid-out superblock without going through a real block device.
#[cfg(test)]
pub fn format_for_tests(block_count: u32, inode_count: u32) -> (Superblock, crate::device::MemBlockDevice) {
    let mut dev = crate::device::MemBlockDevice::new(block_count);
    let sb = format(&mut dev, block_count, inode_count).expect("format_for_tests: layout must be valid");
    (sb, dev)
}

/// Bootstraps inode 1 as the (empty) root directory: allocates it, gives it
/// an extent-index block, and sets `nlink=2` per §4.4's directory-creation
/// convention. Not part of the namespace operation surface in §6 (there is
/// no root-creation op there) — a one-time step the host performs once,
/// right after [`format`], before any namespace call can have a directory to
/// operate on.
pub fn bootstrap_root(
    sb: &mut Superblock,
    dev: &mut dyn BlockDevice,
    clock: &dyn Clock,
) -> Result<u32> {
    let ino = crate::bitmap::alloc_inode(sb, dev)?;
    let eiblk = crate::bitmap::alloc_blocks(sb, dev, 1)?;
    let zero: Block = [0u8; BLOCK_SIZE];
    dev.write_block(eiblk, &zero)?;
    dev.mark_dirty(eiblk);

    let now = clock.now_secs();
    let mut raw = RawInode::new(FileKind::Directory, 0o755, 0, 0, now);
    raw.i_blocks = 1;
    raw.i_size = BLOCK_SIZE as u32;
    raw.i_nlink = 2;
    raw.ei_block = eiblk;
    inode::write_inode(sb, dev, ino, &raw)?;
    Ok(ino)
}
