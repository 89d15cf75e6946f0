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

//! The inode store (§2/§3/§4.5, component I): a fixed-size array of on-disk
//! inode records, indexed by inode number, plus the materialization routine
//! that turns a raw record into something namespace operations can work
//! with. Grounded in the teacher's `Ext2INode` (`kernel/src/file/fs/ext2/inode.rs`)
//! for role and naming, though the on-disk shape is SimpleFS's own (one
//! extent-index block per inode, no direct/indirect block pointers).

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use crate::{
    consts::{BLOCK_SIZE, INODE_REC, NO_BLOCK, SYMLINK_INLINE_LEN},
    device::{Block, BlockDevice},
    error::{Error, Result},
    superblock::Superblock,
};

const S_IFMT: u32 = 0o17_0000;
const S_IFREG: u32 = 0o10_0000;
const S_IFDIR: u32 = 0o04_0000;
const S_IFLNK: u32 = 0o12_0000;

/// The kind of filesystem object an inode represents (§4.4: `mode ∈ {REG,
/// DIR, LNK}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
}

impl FileKind {
    fn type_bits(self) -> u32 {
        match self {
            FileKind::Regular => S_IFREG,
            FileKind::Directory => S_IFDIR,
            FileKind::Symlink => S_IFLNK,
        }
    }

    fn from_mode(mode: u32) -> Option<Self> {
        match mode & S_IFMT {
            S_IFREG => Some(FileKind::Regular),
            S_IFDIR => Some(FileKind::Directory),
            S_IFLNK => Some(FileKind::Symlink),
            _ => None,
        }
    }
}

/// The on-disk inode record: exactly [`INODE_REC`] (104) bytes, packed with
/// no padding beyond the trailing reserved field (§3: "Inode record").
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RawInode {
    pub i_mode: u32,
    pub i_uid: u32,
    pub i_gid: u32,
    pub i_size: u32,
    pub i_ctime: u32,
    pub i_atime: u32,
    pub i_mtime: u32,
    pub i_blocks: u32,
    pub i_nlink: u32,
    /// Block number of the extent-index block, or [`NO_BLOCK`] for symlinks.
    pub ei_block: u32,
    /// Inline symlink target (NUL-padded), unused otherwise.
    pub i_data: [u8; SYMLINK_INLINE_LEN],
    _reserved: [u8; INODE_REC - 10 * 4 - SYMLINK_INLINE_LEN],
}

const_assert_eq!(core::mem::size_of::<RawInode>(), INODE_REC);

impl RawInode {
    /// Builds a fresh, populated record. `i_blocks` and `ei_block` are left
    /// at zero; the caller fills them in once the extent-index block (if
    /// any) is allocated.
    pub fn new(kind: FileKind, perm: u32, uid: u32, gid: u32, now: u32) -> Self {
        Self {
            i_mode: kind.type_bits() | (perm & 0o7777),
            i_uid: uid,
            i_gid: gid,
            i_size: 0,
            i_ctime: now,
            i_atime: now,
            i_mtime: now,
            i_blocks: 0,
            i_nlink: 0,
            ei_block: NO_BLOCK,
            i_data: [0u8; SYMLINK_INLINE_LEN],
            _reserved: [0u8; INODE_REC - 10 * 4 - SYMLINK_INLINE_LEN],
        }
    }

    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_mode(self.i_mode)
    }

    /// Reads the inline symlink target, if this is a symlink.
    pub fn symlink_target(&self) -> &[u8] {
        let len = self.i_data.iter().position(|&b| b == 0).unwrap_or(self.i_data.len());
        &self.i_data[..len]
    }

    pub fn set_symlink_target(&mut self, target: &[u8]) {
        self.i_data = [0u8; SYMLINK_INLINE_LEN];
        self.i_data[..target.len()].copy_from_slice(target);
    }
}

/// The byte offset of inode `ino`'s record within the inode table.
fn table_offset(ino: u32) -> u64 {
    ino as u64 * INODE_REC as u64
}

/// Reads arbitrary bytes at `byte_off` (relative to the start of the inode
/// table) into `out`, transparently handling a record that straddles two
/// blocks — `INODE_REC` (104) does not evenly divide [`BLOCK_SIZE`].
fn read_table_bytes(
    dev: &mut dyn BlockDevice,
    istore_start: u32,
    byte_off: u64,
    out: &mut [u8],
) -> Result<()> {
    let mut remaining = out;
    let mut off = byte_off;
    let mut block: Block = [0u8; BLOCK_SIZE];
    while !remaining.is_empty() {
        let blk = istore_start + (off / BLOCK_SIZE as u64) as u32;
        let in_blk = (off % BLOCK_SIZE as u64) as usize;
        dev.read_block(blk, &mut block)?;
        let n = remaining.len().min(BLOCK_SIZE - in_blk);
        remaining[..n].copy_from_slice(&block[in_blk..in_blk + n]);
        remaining = &mut remaining[n..];
        off += n as u64;
    }
    Ok(())
}

fn write_table_bytes(
    dev: &mut dyn BlockDevice,
    istore_start: u32,
    byte_off: u64,
    data: &[u8],
) -> Result<()> {
    let mut remaining = data;
    let mut off = byte_off;
    let mut block: Block = [0u8; BLOCK_SIZE];
    while !remaining.is_empty() {
        let blk = istore_start + (off / BLOCK_SIZE as u64) as u32;
        let in_blk = (off % BLOCK_SIZE as u64) as usize;
        dev.read_block(blk, &mut block)?;
        let n = remaining.len().min(BLOCK_SIZE - in_blk);
        block[in_blk..in_blk + n].copy_from_slice(&remaining[..n]);
        dev.write_block(blk, &block)?;
        dev.mark_dirty(blk);
        remaining = &remaining[n..];
        off += n as u64;
    }
    Ok(())
}

/// Reads inode `ino`'s on-disk record. Returns [`Error::Inval`] if `ino` is
/// out of range (§4.5).
pub fn read_inode(sb: &Superblock, dev: &mut dyn BlockDevice, ino: u32) -> Result<RawInode> {
    if ino >= sb.raw.nr_inodes {
        return Err(Error::Inval);
    }
    let mut buf = [0u8; INODE_REC];
    read_table_bytes(dev, sb.layout.istore_start, table_offset(ino), &mut buf)?;
    Ok(*bytemuck::from_bytes(&buf))
}

/// Writes inode `ino`'s on-disk record back.
pub fn write_inode(sb: &Superblock, dev: &mut dyn BlockDevice, ino: u32, raw: &RawInode) -> Result<()> {
    if ino >= sb.raw.nr_inodes {
        return Err(Error::Inval);
    }
    write_table_bytes(dev, sb.layout.istore_start, table_offset(ino), bytemuck::bytes_of(raw))
}

/// Zeroes inode `ino`'s on-disk record, as done on final unlink (§4.4).
pub fn clear_inode(sb: &Superblock, dev: &mut dyn BlockDevice, ino: u32) -> Result<()> {
    write_inode(sb, dev, ino, &RawInode::zeroed())
}
