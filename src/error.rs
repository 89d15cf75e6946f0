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

//! The error taxonomy every fallible operation in this crate returns.
//!
//! This plays the role the teacher's `errno!`/`EResult` pair plays in
//! `maestro`'s ext2 implementation, adapted to a hosted crate: one variant
//! per outcome in the specification's error taxonomy, plus a transparent
//! wrapper for the block device's own I/O failures.

use std::io;

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;

/// The error taxonomy of §7: every mutating or resolving operation returns
/// one of these, never panics, and never unwinds.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The inode or data-block bitmap is exhausted.
    #[error("no space left on device")]
    NoSpace,
    /// A directory already holds `MAX_CHILD` entries, or an inode's link
    /// count would overflow.
    #[error("link limit reached")]
    LinkLimit,
    /// A filename exceeds `FN_LEN`, or a symlink target does not fit inline.
    #[error("name too long")]
    NameTooLong,
    /// No directory entry matches the requested name.
    #[error("no such entry")]
    NotFound,
    /// A rename or link target name is already occupied.
    #[error("entry already exists")]
    Exists,
    /// `rmdir` was called on a directory that still has entries.
    #[error("directory not empty")]
    NotEmpty,
    /// An inode number was out of range, an unsupported rename flag was
    /// requested, or a create was asked for an unsupported mode.
    #[error("invalid argument")]
    Inval,
    /// The block device reported a read or write failure.
    #[error("block device I/O error: {0}")]
    Io(#[from] io::Error),
}
