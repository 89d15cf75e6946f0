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

//! The bitmap allocator (§4.1, component A): two on-disk bitmaps, one per
//! resource (inodes, data blocks). Mirrors the scanning strategy of the
//! teacher's `Ext2Fs::bitmap_alloc`/`bitmap_free`
//! (`kernel/src/file/fs/ext2/mod.rs`) — lowest index wins, no best-fit — but
//! drops the atomics: per §5, the host serializes all namespace operations
//! per directory, so the core never needs to protect a bitmap scan against a
//! concurrent mutation of its own.

use crate::{
    consts::BLOCK_SIZE,
    device::{Block, BlockDevice},
    error::{Error, Result},
    superblock::Superblock,
};

/// Scans `n_blocks` blocks starting at `start_blk`, each holding 8 bits per
/// byte, for the first zero bit among the first `bit_count` bits. Returns
/// its bit index, or `None` if none is found.
fn scan_first_zero(
    dev: &mut dyn BlockDevice,
    start_blk: u32,
    n_blocks: u32,
    bit_count: u32,
    skip_bits: u32,
) -> Result<Option<u32>> {
    let mut block: Block = [0u8; BLOCK_SIZE];
    for blk_off in 0..n_blocks {
        dev.read_block(start_blk + blk_off, &mut block)?;
        for (byte_off, byte) in block.iter().enumerate() {
            let base = blk_off * (BLOCK_SIZE as u32 * 8) + byte_off as u32 * 8;
            if base + 8 <= skip_bits {
                continue;
            }
            if base >= bit_count {
                return Ok(None);
            }
            if *byte == 0xff {
                continue;
            }
            for bit in 0..8 {
                let idx = base + bit;
                if idx < skip_bits || idx >= bit_count {
                    continue;
                }
                if byte & (1 << bit) == 0 {
                    return Ok(Some(idx));
                }
            }
        }
    }
    Ok(None)
}

/// Scans for the first run of `run_len` consecutive zero bits among the
/// first `bit_count` bits.
fn scan_zero_run(
    dev: &mut dyn BlockDevice,
    start_blk: u32,
    n_blocks: u32,
    bit_count: u32,
    run_len: u32,
) -> Result<Option<u32>> {
    let mut block: Block = [0u8; BLOCK_SIZE];
    let mut run_start: Option<u32> = None;
    let mut run_have: u32 = 0;
    for blk_off in 0..n_blocks {
        dev.read_block(start_blk + blk_off, &mut block)?;
        for (byte_off, byte) in block.iter().enumerate() {
            let base = blk_off * (BLOCK_SIZE as u32 * 8) + byte_off as u32 * 8;
            if base >= bit_count {
                break;
            }
            for bit in 0..8 {
                let idx = base + bit;
                if idx >= bit_count {
                    break;
                }
                let free = byte & (1 << bit) == 0;
                if free {
                    if run_have == 0 {
                        run_start = Some(idx);
                    }
                    run_have += 1;
                    if run_have >= run_len {
                        return Ok(run_start);
                    }
                } else {
                    run_have = 0;
                    run_start = None;
                }
            }
        }
    }
    Ok(None)
}

fn bit_at(start_blk: u32, idx: u32) -> (u32, usize, u8) {
    let blk_off = start_blk + idx / (BLOCK_SIZE as u32 * 8);
    let byte_off = (idx / 8) % BLOCK_SIZE as u32;
    let bit = (idx % 8) as u8;
    (blk_off, byte_off as usize, bit)
}

fn set_bit(dev: &mut dyn BlockDevice, start_blk: u32, idx: u32, value: bool) -> Result<()> {
    let (blk_off, byte_off, bit) = bit_at(start_blk, idx);
    let mut block: Block = [0u8; BLOCK_SIZE];
    dev.read_block(blk_off, &mut block)?;
    if value {
        block[byte_off] |= 1 << bit;
    } else {
        block[byte_off] &= !(1 << bit);
    }
    dev.write_block(blk_off, &block)?;
    dev.mark_dirty(blk_off);
    Ok(())
}

/// Finds and allocates the first free inode number. `ino = 0` is reserved
/// to mean "none," so bit 0 of the inode bitmap is never handed out.
pub fn alloc_inode(sb: &mut Superblock, dev: &mut dyn BlockDevice) -> Result<u32> {
    if sb.raw.nr_free_inodes == 0 {
        log::warn!("inode allocation failed: no free inodes");
        return Err(Error::NoSpace);
    }
    let found = scan_first_zero(
        dev,
        sb.layout.ifree_start,
        sb.raw.nr_ifree_blocks,
        sb.raw.nr_inodes,
        1,
    )?;
    let Some(ino) = found else {
        log::warn!("inode bitmap exhausted despite nonzero free counter");
        return Err(Error::NoSpace);
    };
    set_bit(dev, sb.layout.ifree_start, ino, true)?;
    sb.raw.nr_free_inodes -= 1;
    log::trace!("allocated inode {ino}");
    Ok(ino)
}

/// Marks bit 0 of the inode bitmap used without touching any free counter.
/// Called once by the formatter so the bitmap's zero-bit population matches
/// `nr_free_inodes` even though `ino == 0` is never handed out or counted as
/// free (§3, §4.1: "ino=0 is reserved to mean NONE").
pub(crate) fn reserve_zero_inode(sb: &mut Superblock, dev: &mut dyn BlockDevice) -> Result<()> {
    set_bit(dev, sb.layout.ifree_start, 0, true)
}

/// Releases inode `ino` back to the free pool. A no-op if `ino == 0`.
pub fn free_inode(sb: &mut Superblock, dev: &mut dyn BlockDevice, ino: u32) -> Result<()> {
    if ino == 0 {
        return Ok(());
    }
    set_bit(dev, sb.layout.ifree_start, ino, false)?;
    sb.raw.nr_free_inodes += 1;
    log::trace!("freed inode {ino}");
    Ok(())
}

/// Finds and allocates the first run of `n` contiguous free data blocks,
/// returning the physical block number of the first one. `n` is either `1`
/// or `MAX_BPE` per §4.1.
pub fn alloc_blocks(sb: &mut Superblock, dev: &mut dyn BlockDevice, n: u32) -> Result<u32> {
    if sb.raw.nr_free_blocks < n {
        log::warn!("block allocation failed: {n} requested, {} free", sb.raw.nr_free_blocks);
        return Err(Error::NoSpace);
    }
    let data_blocks = sb.data_blocks();
    let found = scan_zero_run(dev, sb.layout.bfree_start, sb.raw.nr_bfree_blocks, data_blocks, n)?;
    let Some(bit) = found else {
        log::warn!("block bitmap has no run of {n} despite nonzero free counter");
        return Err(Error::NoSpace);
    };
    for i in 0..n {
        set_bit(dev, sb.layout.bfree_start, bit + i, true)?;
    }
    sb.raw.nr_free_blocks -= n;
    let first_bno = sb.layout.data_start + bit;
    log::trace!("allocated {n} block(s) starting at {first_bno}");
    Ok(first_bno)
}

/// Releases `n` contiguous data blocks starting at physical block `bno`.
pub fn free_blocks(sb: &mut Superblock, dev: &mut dyn BlockDevice, bno: u32, n: u32) -> Result<()> {
    let bit = bno - sb.layout.data_start;
    for i in 0..n {
        set_bit(dev, sb.layout.bfree_start, bit + i, false)?;
    }
    sb.raw.nr_free_blocks += n;
    log::trace!("freed {n} block(s) starting at {bno}");
    Ok(())
}
