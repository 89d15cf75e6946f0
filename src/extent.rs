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

//! The extent index (§2/§4.2, component X): one block per file or directory,
//! listing up to `MAX_EXT` contiguous-block runs. Grounded in the teacher's
//! `BlockGroupDescriptor`/indirect-block handling
//! (`kernel/src/file/fs/ext2/bgd.rs`, `inode.rs`) for the role a per-object
//! index block plays, though SimpleFS replaces the teacher's indirect-block
//! scheme with a flat extent array (§3: "Extent record").

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use crate::{
    bitmap,
    consts::{BLOCK_SIZE, EXT_REC, FPE, MAX_BPE, MAX_EXT},
    device::{Block, BlockDevice},
    error::Result,
    superblock::Superblock,
};

/// One contiguous run of data blocks (§3: "Extent record"). `nr_files` is
/// meaningful only for directory extents (count of live entries across the
/// extent's directory blocks); always `0` for regular-file extents.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ExtentRecord {
    pub ee_block: u32,
    pub ee_len: u32,
    pub ee_start: u32,
    pub nr_files: u32,
}

const_assert_eq!(core::mem::size_of::<ExtentRecord>(), EXT_REC);

impl ExtentRecord {
    /// An extent record is "empty" iff `ee_start == 0` (§3).
    pub fn is_empty(&self) -> bool {
        self.ee_start == 0
    }
}

/// The per-object extent-index block (§3/§6): a header count followed
/// immediately by the extent array, with the trailing bytes unused and zero.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ExtentIndexBlock {
    /// Directory: total live entries across all extents. File: unused, 0.
    pub nr_files: u32,
    pub extents: [ExtentRecord; MAX_EXT],
    _reserved: [u8; BLOCK_SIZE - 4 - MAX_EXT * EXT_REC],
}

const_assert_eq!(core::mem::size_of::<ExtentIndexBlock>(), BLOCK_SIZE);

impl ExtentIndexBlock {
    pub fn from_block(block: &Block) -> Self {
        *bytemuck::from_bytes(block)
    }

    pub fn to_block(self) -> Block {
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(bytemuck::bytes_of(&self));
        block
    }
}

/// Reads the extent-index block at `bno`.
pub fn read_index(dev: &mut dyn BlockDevice, bno: u32) -> Result<ExtentIndexBlock> {
    let mut block: Block = [0u8; BLOCK_SIZE];
    dev.read_block(bno, &mut block)?;
    Ok(ExtentIndexBlock::from_block(&block))
}

/// Writes the extent-index block back to `bno`.
pub fn write_index(dev: &mut dyn BlockDevice, bno: u32, index: &ExtentIndexBlock) -> Result<()> {
    dev.write_block(bno, &(*index).to_block())?;
    dev.mark_dirty(bno);
    Ok(())
}

/// `ext_search` (§4.2): the extent index `i` whose logical range covers
/// `logical_blk`, or `None`.
pub fn ext_search(index: &ExtentIndexBlock, logical_blk: u32) -> Option<usize> {
    index.extents[..MAX_EXT].iter().position(|e| {
        !e.is_empty() && logical_blk >= e.ee_block && logical_blk < e.ee_block + e.ee_len
    })
}

/// `available_ext` (§4.2): the extent slot a new directory entry should go
/// into. `live_count` is the directory's current total entry count
/// (`index.nr_files`).
pub fn available_ext(index: &ExtentIndexBlock, live_count: u32) -> Option<usize> {
    let mut remaining = live_count;
    let mut tentative: Option<usize> = None;
    for i in 0..MAX_EXT {
        let e = &index.extents[i];
        if !e.is_empty() {
            if e.nr_files < FPE {
                return Some(i);
            }
            remaining = remaining.saturating_sub(e.nr_files);
            if remaining == 0 && tentative.is_none() {
                return (i + 1 < MAX_EXT).then_some(i + 1);
            }
        } else if tentative.is_none() {
            tentative = Some(i);
        }
    }
    tentative
}

/// `put_new_ext` (§4.2): allocates `MAX_BPE` contiguous data blocks for
/// extent slot `i`, records it in `index`, and seeds every block as a fresh
/// directory block (header `nr_files=0`, slot 0 a `(inode=0, nr_blk=FPB)`
/// gap).
pub fn put_new_ext(
    index: &mut ExtentIndexBlock,
    sb: &mut Superblock,
    dev: &mut dyn BlockDevice,
    i: usize,
) -> Result<()> {
    let ee_block = if i == 0 {
        0
    } else {
        index.extents[i - 1].ee_block + index.extents[i - 1].ee_len
    };
    let ee_start = bitmap::alloc_blocks(sb, dev, MAX_BPE)?;
    for off in 0..MAX_BPE {
        crate::dirent::seed_fresh_block(dev, ee_start + off)?;
    }
    index.extents[i] = ExtentRecord {
        ee_block,
        ee_len: MAX_BPE,
        ee_start,
        nr_files: 0,
    };
    Ok(())
}
