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

//! SimpleFS: the on-disk layout and algorithms for a small block-oriented,
//! extent-indexed, POSIX-shaped namespace (regular files, directories,
//! symbolic links, hard links). This crate is the filesystem core only: it
//! has no opinion about how it is hosted (kernel VFS, FUSE, or a plain test
//! harness) and no opinion about how its block device reaches physical
//! storage. Grounded in the teacher's `ext2` filesystem implementation
//! (`kernel/src/file/fs/ext2/`) for role and idiom, reworked around
//! SimpleFS's own on-disk shapes: a flat per-object extent index instead of
//! direct/indirect block pointers, and a run-length gap encoding for
//! directory free space instead of a free-standing linked list of records.
//!
//! Module map (mirroring the components of the specification this crate
//! implements):
//!
//! - [`device`] — the block device adapter consumed from the host (B).
//! - [`superblock`] — layout parameters and free counters (S).
//! - [`bitmap`] — the inode/block free-space allocator (A).
//! - [`inode`] — the on-disk inode table and materialization (I).
//! - [`extent`] — the per-object extent index (X).
//! - [`dirent`] — the directory encoding and its gap scheme (D).
//! - [`namespace`] — `lookup`/`create`/`unlink`/`mkdir`/`rmdir`/`rename`/
//!   `link`/`symlink`, built atop the above (N).
//! - [`fs`] — the mounted filesystem handle tying the above together, plus
//!   the formatter a test or embedder uses to obtain a mountable image.
//! - [`clock`] and [`ownership`] — the wall-clock and caller-identity
//!   services the host supplies (§6).
//! - [`error`] — the crate-wide error taxonomy (§7).
//! - [`consts`] — the derived layout constants of §3.

pub mod bitmap;
pub mod clock;
pub mod consts;
pub mod device;
pub mod dirent;
pub mod error;
pub mod extent;
pub mod fs;
pub mod inode;
pub mod namespace;
pub mod ownership;
pub mod superblock;

pub use clock::{Clock, FixedClock, SystemClock};
pub use device::{Block, BlockDevice, MemBlockDevice};
pub use error::{Error, Result};
pub use fs::{format, Inode, InodeCache, SimpleFs};
pub use inode::FileKind;
pub use ownership::Caller;
pub use superblock::Superblock;
