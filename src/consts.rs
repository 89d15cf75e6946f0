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

//! Derived layout constants (see the on-disk data model: block size, record
//! sizes, and the capacities they imply).

use static_assertions::const_assert_eq;

/// Size of one block, in bytes.
pub const BLOCK_SIZE: usize = 4096;

/// Blocks per extent.
pub const MAX_BPE: u32 = 8;

/// Size of one on-disk extent record, in bytes.
pub const EXT_REC: usize = 16;

/// Extents per extent-index block: `(BLOCK_SIZE - 4) / EXT_REC`.
pub const MAX_EXT: usize = (BLOCK_SIZE - 4) / EXT_REC;

/// Maximum filename length, NUL-padded on disk.
pub const FN_LEN: usize = 255;

/// Size of one on-disk directory-entry record: `4 + 4 + FN_LEN`.
pub const FILE_REC: usize = 4 + 4 + FN_LEN;

/// Directory entries per directory block: `BLOCK_SIZE / FILE_REC`.
pub const FPB: usize = BLOCK_SIZE / FILE_REC;

/// Directory entries per directory extent: `FPB * MAX_BPE`.
pub const FPE: u32 = FPB as u32 * MAX_BPE;

/// Maximum entries in a single directory: `FPE * MAX_EXT`.
pub const MAX_CHILD: u32 = FPE * MAX_EXT as u32;

/// Maximum size, in bytes, of a regular file: `MAX_BPE * BLOCK_SIZE * MAX_EXT`.
pub const MAX_FSIZE: u64 = MAX_BPE as u64 * BLOCK_SIZE as u64 * MAX_EXT as u64;

/// Size of one on-disk inode record, fixed regardless of the logical fields
/// it carries.
pub const INODE_REC: usize = 104;

/// Maximum length of an inline symlink target (including the NUL terminator).
pub const SYMLINK_INLINE_LEN: usize = 32;

/// On-disk magic number identifying a SimpleFS superblock.
pub const MAGIC: u32 = 0xDEAD_CE11;

/// Reserved inode number meaning "no inode."
pub const NO_INODE: u32 = 0;

/// Reserved block number meaning "no block."
pub const NO_BLOCK: u32 = 0;

const_assert_eq!(MAX_EXT, 255);
const_assert_eq!(FPB, 15);
const_assert_eq!(FPE, 120);
const_assert_eq!(MAX_CHILD, 30_600);
const_assert_eq!(MAX_FSIZE, 8_355_840);
