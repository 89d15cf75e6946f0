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

//! The block device adapter (§2, component B): a fixed-size block store the
//! core reads and writes by number. Everything about how blocks reach
//! physical storage — paging, caching, real hardware — is the host's
//! problem; the core only ever sees this trait.

use std::io;

use crate::consts::BLOCK_SIZE;

/// One block's worth of bytes.
pub type Block = [u8; BLOCK_SIZE];

/// A fixed-size block store of exactly [`BLOCK_SIZE`]-byte blocks.
///
/// Implementors are expected to be simple: read and write a whole block at a
/// time, and remember which blocks have been written since the last flush if
/// that is useful to them. The core never assumes a particular flush policy;
/// per §4.1, it marks a block dirty through [`BlockDevice::mark_dirty`] on
/// every mutation and leaves the actual flush to the host.
pub trait BlockDevice {
    /// Reads block number `block` into `buf`.
    fn read_block(&mut self, block: u32, buf: &mut Block) -> io::Result<()>;

    /// Writes `buf` to block number `block`.
    fn write_block(&mut self, block: u32, buf: &Block) -> io::Result<()>;

    /// Total number of blocks backing this device.
    fn block_count(&self) -> u32;

    /// Hook called whenever the core mutates a block in place (bitmaps,
    /// inode table, extent-index and directory blocks). The default is a
    /// no-op; a host with a page cache can use this to mark the
    /// corresponding page dirty instead of writing through immediately.
    fn mark_dirty(&mut self, _block: u32) {}
}

/// A `Vec<u8>`-backed [`BlockDevice`], useful for tests and for exploring the
/// crate without a real disk behind it.
pub struct MemBlockDevice {
    blocks: Vec<Block>,
}

impl MemBlockDevice {
    /// Creates a new in-memory device with `block_count` zeroed blocks.
    pub fn new(block_count: u32) -> Self {
        Self {
            blocks: vec![[0u8; BLOCK_SIZE]; block_count as usize],
        }
    }
}

impl BlockDevice for MemBlockDevice {
    fn read_block(&mut self, block: u32, buf: &mut Block) -> io::Result<()> {
        let blk = self.blocks.get(block as usize).ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "block index out of range")
        })?;
        buf.copy_from_slice(blk);
        Ok(())
    }

    fn write_block(&mut self, block: u32, buf: &Block) -> io::Result<()> {
        let blk = self.blocks.get_mut(block as usize).ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "block index out of range")
        })?;
        blk.copy_from_slice(buf);
        Ok(())
    }

    fn block_count(&self) -> u32 {
        self.blocks.len() as u32
    }
}
