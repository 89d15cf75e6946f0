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

//! Namespace operations (§2/§4.4, component N): `lookup`, `create`, `unlink`,
//! `mkdir`, `rmdir`, `rename`, `link`, `symlink`, built atop the bitmap
//! allocator, inode store, extent index, and directory encoding. Grounded in
//! the teacher's `DirOps` implementation for ext2
//! (`kernel/src/file/fs/ext2/mod.rs`, the `create`/`link`/`symlink`/`unlink`/
//! `rename` methods), generalized from ext2's indirect-block inodes and
//! literal `.`/`..` directory entries to SimpleFS's extent index and
//! nlink-only parent/child accounting (§9: "directory entries weakly
//! reference inodes by number; inodes do not point back to parents").

use crate::{
    bitmap,
    consts::{BLOCK_SIZE, FN_LEN, SYMLINK_INLINE_LEN},
    device::Block,
    dirent,
    error::{Error, Result},
    extent::ExtentIndexBlock,
    fs::{Inode, InodeCache, SimpleFs},
    inode::{self, FileKind, RawInode},
    ownership::Caller,
    clock::Clock,
};

/// `rename` flag requesting an atomic swap of the source and destination
/// (unsupported here; rejected with [`Error::Inval`]).
pub const RENAME_EXCHANGE: u32 = 1 << 1;
/// `rename` flag requesting a whiteout be left behind (unsupported here;
/// rejected with [`Error::Inval`]).
pub const RENAME_WHITEOUT: u32 = 1 << 2;

fn check_name_len(name: &[u8]) -> Result<()> {
    if name.len() > FN_LEN {
        return Err(Error::NameTooLong);
    }
    Ok(())
}

/// Decrements `inode`'s link count by one, saturating at zero. A directory
/// unlink drives this twice — once for the self `.` link, once for the
/// removed parent dentry (§4.4 unlink steps 2–3) — a regular unlink or a
/// surviving hard link drives it once.
fn drop_nlink(inode: &mut Inode) {
    inode.raw.i_nlink = inode.raw.i_nlink.saturating_sub(1);
}

/// `lookup(dir, name)` (§4.4): resolves `name` within `dir`, materializing
/// and returning the child inode. Updates `dir`'s `atime`.
pub fn lookup(
    fs: &mut SimpleFs,
    cache: &mut InodeCache,
    clock: &dyn Clock,
    dir_ino: u32,
    name: &[u8],
) -> Result<Inode> {
    check_name_len(name)?;
    let mut dir = cache.get(&fs.sb, fs.dev, dir_ino)?;
    let dir_index = fs.read_extent_index(&dir)?;
    let ino = dirent::lookup(&dir_index, fs.dev, name)?.ok_or(Error::NotFound)?;
    let child = cache.get(&fs.sb, fs.dev, ino)?;
    dir.raw.i_atime = clock.now_secs();
    cache.put(&fs.sb, fs.dev, dir)?;
    Ok(child)
}

/// The shared engine behind `create` and `mkdir` (§4.4 `create`): allocates
/// an inode and, for everything but a symlink, an extent-index block, inserts
/// the new entry into `dir`, and rolls back on any failure without touching
/// `dir` itself (§7: "If an inode was allocated but the directory insertion
/// fails, the inode and its index block are released").
fn create_inode(
    fs: &mut SimpleFs,
    cache: &mut InodeCache,
    clock: &dyn Clock,
    caller: Caller,
    dir_ino: u32,
    name: &[u8],
    kind: FileKind,
    perm: u32,
) -> Result<u32> {
    debug_assert_ne!(kind, FileKind::Symlink, "symlink goes through its own entry point");
    check_name_len(name)?;

    let mut dir = cache.get(&fs.sb, fs.dev, dir_ino)?;
    if kind == FileKind::Directory && dir.raw.i_nlink == u32::MAX {
        return Err(Error::LinkLimit);
    }
    let mut dir_index = fs.read_extent_index(&dir)?;

    let ino = bitmap::alloc_inode(&mut fs.sb, fs.dev)?;
    let now = clock.now_secs();
    let mut raw = RawInode::new(kind, perm, caller.uid, caller.gid, now);

    let ei_block = match bitmap::alloc_blocks(&mut fs.sb, fs.dev, 1) {
        Ok(bno) => {
            let zero: Block = [0u8; BLOCK_SIZE];
            if let Err(e) = fs.dev.write_block(bno, &zero) {
                let _ = bitmap::free_blocks(&mut fs.sb, fs.dev, bno, 1);
                let _ = bitmap::free_inode(&mut fs.sb, fs.dev, ino);
                return Err(e.into());
            }
            fs.dev.mark_dirty(bno);
            bno
        }
        Err(e) => {
            let _ = bitmap::free_inode(&mut fs.sb, fs.dev, ino);
            return Err(e);
        }
    };
    raw.ei_block = ei_block;
    raw.i_blocks = 1;
    raw.i_size = if kind == FileKind::Directory { BLOCK_SIZE as u32 } else { 0 };
    raw.i_nlink = if kind == FileKind::Directory { 2 } else { 1 };

    if let Err(e) = dirent::insert(&mut dir_index, &mut fs.sb, fs.dev, name, ino) {
        let _ = bitmap::free_blocks(&mut fs.sb, fs.dev, ei_block, 1);
        let _ = bitmap::free_inode(&mut fs.sb, fs.dev, ino);
        log::warn!("create: rolled back inode {ino} after directory insertion failed");
        return Err(e);
    }

    if kind == FileKind::Directory {
        dir.raw.i_nlink += 1;
    }
    dir.raw.i_mtime = now;
    dir.raw.i_ctime = now;

    fs.write_extent_index(dir.raw.ei_block, &dir_index)?;
    cache.put(&fs.sb, fs.dev, dir)?;
    cache.put(&fs.sb, fs.dev, Inode { ino, raw })?;
    log::trace!("created inode {ino} ({kind:?}) in directory {dir_ino}");
    Ok(ino)
}

/// `create(dir, name, mode)` (§4.4/§6) for a regular file.
pub fn create(
    fs: &mut SimpleFs,
    cache: &mut InodeCache,
    clock: &dyn Clock,
    caller: Caller,
    dir_ino: u32,
    name: &[u8],
    perm: u32,
) -> Result<u32> {
    create_inode(fs, cache, clock, caller, dir_ino, name, FileKind::Regular, perm)
}

/// `mkdir(dir, name, mode)` (§4.4/§6).
pub fn mkdir(
    fs: &mut SimpleFs,
    cache: &mut InodeCache,
    clock: &dyn Clock,
    caller: Caller,
    dir_ino: u32,
    name: &[u8],
    perm: u32,
) -> Result<u32> {
    create_inode(fs, cache, clock, caller, dir_ino, name, FileKind::Directory, perm)
}

/// `symlink(dir, name, target)` (§4.4): stores `target` inline in the new
/// inode's `i_data`, allocating neither a data block nor an extent-index
/// block (§3: "`i_data[32]` (symlink target when `i_mode` indicates
/// symlink)").
pub fn symlink(
    fs: &mut SimpleFs,
    cache: &mut InodeCache,
    clock: &dyn Clock,
    caller: Caller,
    dir_ino: u32,
    name: &[u8],
    target: &[u8],
) -> Result<u32> {
    check_name_len(name)?;
    if target.len() + 1 > SYMLINK_INLINE_LEN {
        return Err(Error::NameTooLong);
    }

    let mut dir = cache.get(&fs.sb, fs.dev, dir_ino)?;
    let mut dir_index = fs.read_extent_index(&dir)?;

    let ino = bitmap::alloc_inode(&mut fs.sb, fs.dev)?;
    let now = clock.now_secs();
    let mut raw = RawInode::new(FileKind::Symlink, 0o777, caller.uid, caller.gid, now);
    raw.set_symlink_target(target);
    raw.i_size = target.len() as u32;
    raw.i_nlink = 1;

    if let Err(e) = dirent::insert(&mut dir_index, &mut fs.sb, fs.dev, name, ino) {
        let _ = bitmap::free_inode(&mut fs.sb, fs.dev, ino);
        return Err(e);
    }

    dir.raw.i_mtime = now;
    dir.raw.i_ctime = now;
    fs.write_extent_index(dir.raw.ei_block, &dir_index)?;
    cache.put(&fs.sb, fs.dev, dir)?;
    cache.put(&fs.sb, fs.dev, Inode { ino, raw })?;
    log::trace!("created symlink inode {ino} in directory {dir_ino}");
    Ok(ino)
}

/// `link(src_ino, newdir, newname)` (§4.4/§6): adds another directory entry
/// pointing at an existing inode and bumps its link count. Allocates no new
/// inode or data blocks.
pub fn link(
    fs: &mut SimpleFs,
    cache: &mut InodeCache,
    clock: &dyn Clock,
    src_ino: u32,
    newdir_ino: u32,
    newname: &[u8],
) -> Result<()> {
    check_name_len(newname)?;
    let mut newdir = cache.get(&fs.sb, fs.dev, newdir_ino)?;
    let mut newdir_index = fs.read_extent_index(&newdir)?;
    let mut src = cache.get(&fs.sb, fs.dev, src_ino)?;
    if src.raw.i_nlink == u32::MAX {
        return Err(Error::LinkLimit);
    }

    dirent::insert(&mut newdir_index, &mut fs.sb, fs.dev, newname, src_ino)?;

    src.raw.i_nlink += 1;
    let now = clock.now_secs();
    src.raw.i_ctime = now;
    newdir.raw.i_mtime = now;
    newdir.raw.i_ctime = now;

    fs.write_extent_index(newdir.raw.ei_block, &newdir_index)?;
    cache.put(&fs.sb, fs.dev, newdir)?;
    cache.put(&fs.sb, fs.dev, src)?;
    Ok(())
}

/// Frees a final-reference inode's extents, extent-index block, and the
/// inode number itself (§4.4 unlink step 4; §7: IO errors while scrubbing
/// freed data blocks are logged and ignored, never propagated, "avoids
/// leaking freed blocks"). Symlinks own neither, so this is a no-op for them.
fn release_inode_storage(fs: &mut SimpleFs, target: &Inode) -> Result<()> {
    if target.kind() == Some(FileKind::Symlink) {
        return Ok(());
    }
    let index = fs.read_extent_index(target)?;
    let zero: Block = [0u8; BLOCK_SIZE];
    for ext in index.extents.iter() {
        if ext.is_empty() {
            continue;
        }
        for off in 0..ext.ee_len {
            let bno = ext.ee_start + off;
            if let Err(e) = fs.dev.write_block(bno, &zero) {
                log::warn!("unlink: failed to scrub freed block {bno}: {e}");
            } else {
                fs.dev.mark_dirty(bno);
            }
        }
        bitmap::free_blocks(&mut fs.sb, fs.dev, ext.ee_start, ext.ee_len)?;
    }
    fs.write_extent_index(target.raw.ei_block, &ExtentIndexBlock::zeroed())?;
    bitmap::free_blocks(&mut fs.sb, fs.dev, target.raw.ei_block, 1)?;
    Ok(())
}

/// `unlink(dir, name)` (§4.4): removes the directory entry, then drops a
/// reference on the target. A directory target drops two references (its
/// self `.` link plus the removed dentry) and also drops one reference on
/// `dir` (the child's `..` no longer points at it); a regular unlink drops
/// just the one dentry reference. Only when the target's link count reaches
/// zero are its blocks, extent index, and inode number released.
pub fn unlink(
    fs: &mut SimpleFs,
    cache: &mut InodeCache,
    clock: &dyn Clock,
    dir_ino: u32,
    name: &[u8],
) -> Result<()> {
    check_name_len(name)?;
    let mut dir = cache.get(&fs.sb, fs.dev, dir_ino)?;
    let mut dir_index = fs.read_extent_index(&dir)?;
    let target_ino = dirent::lookup(&dir_index, fs.dev, name)?.ok_or(Error::NotFound)?;
    let mut target = cache.get(&fs.sb, fs.dev, target_ino)?;

    dirent::remove(&mut dir_index, fs.dev, name, target_ino)?;

    let is_dir = target.kind() == Some(FileKind::Directory);
    if is_dir {
        drop_nlink(&mut dir);
        drop_nlink(&mut target);
    }
    drop_nlink(&mut target);

    let now = clock.now_secs();
    dir.raw.i_mtime = now;
    dir.raw.i_ctime = now;
    fs.write_extent_index(dir.raw.ei_block, &dir_index)?;

    if target.raw.i_nlink > 0 {
        cache.put(&fs.sb, fs.dev, dir)?;
        cache.put(&fs.sb, fs.dev, target)?;
        return Ok(());
    }

    release_inode_storage(fs, &target)?;
    bitmap::free_inode(&mut fs.sb, fs.dev, target_ino)?;
    inode::clear_inode(&fs.sb, fs.dev, target_ino)?;
    cache.put(&fs.sb, fs.dev, dir)?;
    cache.forget(target_ino);
    log::trace!("released inode {target_ino} on final unlink");
    Ok(())
}

/// `rmdir(dir, name)` (§4.4): rejects a non-empty directory with
/// [`Error::NotEmpty`], otherwise delegates to [`unlink`]. A directory with
/// subdirectories has `nlink > 2` (each subdirectory's `..` contributes one);
/// a directory with any other live entries has a nonzero extent-index
/// `nr_files`.
pub fn rmdir(
    fs: &mut SimpleFs,
    cache: &mut InodeCache,
    clock: &dyn Clock,
    dir_ino: u32,
    name: &[u8],
) -> Result<()> {
    check_name_len(name)?;
    let dir = cache.get(&fs.sb, fs.dev, dir_ino)?;
    let dir_index = fs.read_extent_index(&dir)?;
    let child_ino = dirent::lookup(&dir_index, fs.dev, name)?.ok_or(Error::NotFound)?;
    let child = cache.get(&fs.sb, fs.dev, child_ino)?;

    if child.raw.i_nlink > 2 {
        return Err(Error::NotEmpty);
    }
    let child_index = fs.read_extent_index(&child)?;
    if child_index.nr_files != 0 {
        return Err(Error::NotEmpty);
    }

    unlink(fs, cache, clock, dir_ino, name)
}

/// `rename(olddir, oldname, newdir, newname, flags)` (§4.4): `EXCHANGE` and
/// `WHITEOUT` are unsupported (§1 Non-goals) and rejected with
/// [`Error::Inval`]. A collision on `newname` always fails with
/// [`Error::Exists`] — this filesystem never implicitly replaces a rename
/// target (§4.4 step 2: "If collision is found first, fail").
pub fn rename(
    fs: &mut SimpleFs,
    cache: &mut InodeCache,
    clock: &dyn Clock,
    olddir_ino: u32,
    oldname: &[u8],
    newdir_ino: u32,
    newname: &[u8],
    flags: u32,
) -> Result<()> {
    if flags & (RENAME_EXCHANGE | RENAME_WHITEOUT) != 0 {
        return Err(Error::Inval);
    }
    check_name_len(oldname)?;
    check_name_len(newname)?;

    let mut olddir = cache.get(&fs.sb, fs.dev, olddir_ino)?;
    let mut olddir_index = fs.read_extent_index(&olddir)?;
    let src_ino = dirent::lookup(&olddir_index, fs.dev, oldname)?.ok_or(Error::NotFound)?;

    let same_dir = olddir_ino == newdir_ino;
    if same_dir && oldname == newname {
        return Ok(());
    }

    let now = clock.now_secs();

    if same_dir {
        if dirent::lookup(&olddir_index, fs.dev, newname)?.is_some() {
            return Err(Error::Exists);
        }
        dirent::rename_in_place(&olddir_index, fs.dev, oldname, newname, src_ino)?;
        olddir.raw.i_mtime = now;
        olddir.raw.i_ctime = now;
        cache.put(&fs.sb, fs.dev, olddir)?;
        return Ok(());
    }

    let mut newdir = cache.get(&fs.sb, fs.dev, newdir_ino)?;
    let mut newdir_index = fs.read_extent_index(&newdir)?;
    if dirent::lookup(&newdir_index, fs.dev, newname)?.is_some() {
        return Err(Error::Exists);
    }

    let src = cache.get(&fs.sb, fs.dev, src_ino)?;
    let src_is_dir = src.kind() == Some(FileKind::Directory);
    if src_is_dir && newdir.raw.i_nlink == u32::MAX {
        return Err(Error::LinkLimit);
    }

    dirent::insert(&mut newdir_index, &mut fs.sb, fs.dev, newname, src_ino)?;
    dirent::remove(&mut olddir_index, fs.dev, oldname, src_ino)?;

    if src_is_dir {
        newdir.raw.i_nlink += 1;
        olddir.raw.i_nlink = olddir.raw.i_nlink.saturating_sub(1);
    }
    newdir.raw.i_mtime = now;
    newdir.raw.i_ctime = now;
    olddir.raw.i_mtime = now;
    olddir.raw.i_ctime = now;

    fs.write_extent_index(newdir.raw.ei_block, &newdir_index)?;
    fs.write_extent_index(olddir.raw.ei_block, &olddir_index)?;
    cache.put(&fs.sb, fs.dev, newdir)?;
    cache.put(&fs.sb, fs.dev, olddir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::FixedClock, device::MemBlockDevice, fs};

    fn mounted(dev: &mut MemBlockDevice, block_count: u32, inode_count: u32) -> (SimpleFs<'_>, InodeCache, u32) {
        fs::format(dev, block_count, inode_count).expect("format");
        let mut fs = SimpleFs::mount(dev).expect("mount");
        let clock = FixedClock(1_700_000_000);
        let root = fs::bootstrap_root(&mut fs.sb, fs.dev, &clock).expect("bootstrap root");
        (fs, InodeCache::new(), root)
    }

    #[test]
    fn create_then_lookup_then_unlink() {
        let mut dev = MemBlockDevice::new(4096);
        let (mut fs, mut cache, root) = mounted(&mut dev, 4096, 256);
        let clock = FixedClock(1);
        let ino = create(&mut fs, &mut cache, &clock, Caller::ROOT, root, b"a.txt", 0o644).unwrap();
        let found = lookup(&mut fs, &mut cache, &clock, root, b"a.txt").unwrap();
        assert_eq!(found.ino, ino);
        assert_eq!(found.raw.i_nlink, 1);
        assert_eq!(found.raw.i_blocks, 1);
        assert_eq!(found.raw.i_size, 0);

        unlink(&mut fs, &mut cache, &clock, root, b"a.txt").unwrap();
        assert!(matches!(
            lookup(&mut fs, &mut cache, &clock, root, b"a.txt"),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn empty_root_first_file_matches_boundary_scenario() {
        let mut dev = MemBlockDevice::new(4096);
        let (mut fs, mut cache, root) = mounted(&mut dev, 4096, 256);
        let clock = FixedClock(1);
        let free_blocks_before = fs.sb.raw.nr_free_blocks;
        let ino = create(&mut fs, &mut cache, &clock, Caller::ROOT, root, b"a.txt", 0o644).unwrap();
        let child = cache.get(&fs.sb, fs.dev, ino).unwrap();
        assert_eq!(child.raw.i_nlink, 1);
        assert_eq!(child.raw.i_blocks, 1);
        assert_eq!(child.raw.i_size, 0);

        let root_inode = cache.get(&fs.sb, fs.dev, root).unwrap();
        let root_index = fs.read_extent_index(&root_inode).unwrap();
        assert_eq!(root_index.nr_files, 1);
        assert_eq!(root_index.extents[0].nr_files, 1);
        // two blocks consumed: the child's own extent-index block plus its
        // directory-entry's first data extent is not allocated for a REG
        // file until it is written, but the root directory's first extent
        // (MAX_BPE blocks) was allocated to hold this very entry.
        assert!(fs.sb.raw.nr_free_blocks < free_blocks_before);
    }

    #[test]
    fn create_sixteen_files_spills_into_second_block_of_one_extent() {
        // `available_ext` only moves past an extent once its own `nr_files`
        // reaches `FPE` (§4.2), not once a single directory block's `FPB`
        // slots fill, so all 16 entries land in extent 0 across its first two
        // directory blocks; extent 1 is untouched until the extent itself is
        // full.
        let mut dev = MemBlockDevice::new(8192);
        let (mut fs, mut cache, root) = mounted(&mut dev, 8192, 512);
        let clock = FixedClock(1);
        for i in 0..16u32 {
            let name = format!("f{i}");
            create(&mut fs, &mut cache, &clock, Caller::ROOT, root, name.as_bytes(), 0o644).unwrap();
        }
        let root_inode = cache.get(&fs.sb, fs.dev, root).unwrap();
        let root_index = fs.read_extent_index(&root_inode).unwrap();
        assert_eq!(root_index.extents[0].nr_files, 16);
        assert!(root_index.extents[1].is_empty());
    }

    #[test]
    fn filling_one_extent_spills_the_next_into_a_second_extent() {
        let mut dev = MemBlockDevice::new(32768);
        let (mut fs, mut cache, root) = mounted(&mut dev, 32768, 1024);
        let clock = FixedClock(1);
        for i in 0..crate::consts::FPE {
            let name = format!("f{i}");
            create(&mut fs, &mut cache, &clock, Caller::ROOT, root, name.as_bytes(), 0o644).unwrap();
        }
        let root_inode = cache.get(&fs.sb, fs.dev, root).unwrap();
        let root_index = fs.read_extent_index(&root_inode).unwrap();
        assert_eq!(root_index.extents[0].nr_files, crate::consts::FPE);
        assert!(root_index.extents[1].is_empty());

        create(&mut fs, &mut cache, &clock, Caller::ROOT, root, b"overflow", 0o644).unwrap();
        let root_inode = cache.get(&fs.sb, fs.dev, root).unwrap();
        let root_index = fs.read_extent_index(&root_inode).unwrap();
        assert_eq!(root_index.extents[0].nr_files, crate::consts::FPE);
        assert_eq!(root_index.extents[1].nr_files, 1);
        assert!(!root_index.extents[1].is_empty());
    }

    #[test]
    fn symlink_stores_target_inline_with_no_data_block() {
        let mut dev = MemBlockDevice::new(4096);
        let (mut fs, mut cache, root) = mounted(&mut dev, 4096, 256);
        let clock = FixedClock(1);
        let free_blocks_before = fs.sb.raw.nr_free_blocks;
        let ino = symlink(&mut fs, &mut cache, &clock, Caller::ROOT, root, b"lnk", b"target").unwrap();
        let child = cache.get(&fs.sb, fs.dev, ino).unwrap();
        assert_eq!(child.kind(), Some(FileKind::Symlink));
        assert_eq!(child.raw.i_size, 6);
        assert_eq!(child.raw.symlink_target(), b"target");
        assert_eq!(child.raw.ei_block, crate::consts::NO_BLOCK);
        assert_eq!(child.raw.i_blocks, 0);
        // only the directory entry's own extent consumes blocks, not the
        // symlink's storage
        let root_inode = cache.get(&fs.sb, fs.dev, root).unwrap();
        let root_index = fs.read_extent_index(&root_inode).unwrap();
        assert!(fs.sb.raw.nr_free_blocks <= free_blocks_before);
        assert_eq!(root_index.nr_files, 1);
    }

    #[test]
    fn rename_collision_in_same_directory_is_rejected() {
        let mut dev = MemBlockDevice::new(4096);
        let (mut fs, mut cache, root) = mounted(&mut dev, 4096, 256);
        let clock = FixedClock(1);
        create(&mut fs, &mut cache, &clock, Caller::ROOT, root, b"a", 0o644).unwrap();
        create(&mut fs, &mut cache, &clock, Caller::ROOT, root, b"b", 0o644).unwrap();
        let err = rename(&mut fs, &mut cache, &clock, root, b"a", root, b"b", 0).unwrap_err();
        assert!(matches!(err, Error::Exists));
        assert!(lookup(&mut fs, &mut cache, &clock, root, b"a").is_ok());
        assert!(lookup(&mut fs, &mut cache, &clock, root, b"b").is_ok());
    }

    #[test]
    fn rename_moves_entry_across_directories() {
        let mut dev = MemBlockDevice::new(8192);
        let (mut fs, mut cache, root) = mounted(&mut dev, 8192, 512);
        let clock = FixedClock(1);
        let sub = mkdir(&mut fs, &mut cache, &clock, Caller::ROOT, root, b"sub", 0o755).unwrap();
        let file = create(&mut fs, &mut cache, &clock, Caller::ROOT, root, b"f", 0o644).unwrap();
        rename(&mut fs, &mut cache, &clock, root, b"f", sub, b"g", 0).unwrap();
        assert!(matches!(
            lookup(&mut fs, &mut cache, &clock, root, b"f"),
            Err(Error::NotFound)
        ));
        let found = lookup(&mut fs, &mut cache, &clock, sub, b"g").unwrap();
        assert_eq!(found.ino, file);
    }

    #[test]
    fn link_then_unlink_restores_nlink() {
        let mut dev = MemBlockDevice::new(4096);
        let (mut fs, mut cache, root) = mounted(&mut dev, 4096, 256);
        let clock = FixedClock(1);
        let ino = create(&mut fs, &mut cache, &clock, Caller::ROOT, root, b"a", 0o644).unwrap();
        link(&mut fs, &mut cache, &clock, ino, root, b"b").unwrap();
        let after_link = cache.get(&fs.sb, fs.dev, ino).unwrap();
        assert_eq!(after_link.raw.i_nlink, 2);

        unlink(&mut fs, &mut cache, &clock, root, b"b").unwrap();
        let after_unlink = cache.get(&fs.sb, fs.dev, ino).unwrap();
        assert_eq!(after_unlink.raw.i_nlink, 1);
        assert!(lookup(&mut fs, &mut cache, &clock, root, b"a").is_ok());
    }

    #[test]
    fn mkdir_then_rmdir_frees_storage() {
        let mut dev = MemBlockDevice::new(4096);
        let (mut fs, mut cache, root) = mounted(&mut dev, 4096, 256);
        let clock = FixedClock(1);
        let free_inodes_before = fs.sb.raw.nr_free_inodes;
        let free_blocks_before = fs.sb.raw.nr_free_blocks;
        mkdir(&mut fs, &mut cache, &clock, Caller::ROOT, root, b"sub", 0o755).unwrap();
        rmdir(&mut fs, &mut cache, &clock, root, b"sub").unwrap();
        assert_eq!(fs.sb.raw.nr_free_inodes, free_inodes_before);
        assert_eq!(fs.sb.raw.nr_free_blocks, free_blocks_before);
        assert!(matches!(
            lookup(&mut fs, &mut cache, &clock, root, b"sub"),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn rmdir_on_nonempty_directory_fails() {
        let mut dev = MemBlockDevice::new(4096);
        let (mut fs, mut cache, root) = mounted(&mut dev, 4096, 256);
        let clock = FixedClock(1);
        let sub = mkdir(&mut fs, &mut cache, &clock, Caller::ROOT, root, b"sub", 0o755).unwrap();
        create(&mut fs, &mut cache, &clock, Caller::ROOT, sub, b"child", 0o644).unwrap();
        assert!(matches!(
            rmdir(&mut fs, &mut cache, &clock, root, b"sub"),
            Err(Error::NotEmpty)
        ));
    }

    #[test]
    fn rmdir_rejects_subdirectory_nlink() {
        let mut dev = MemBlockDevice::new(8192);
        let (mut fs, mut cache, root) = mounted(&mut dev, 8192, 512);
        let clock = FixedClock(1);
        let sub = mkdir(&mut fs, &mut cache, &clock, Caller::ROOT, root, b"sub", 0o755).unwrap();
        mkdir(&mut fs, &mut cache, &clock, Caller::ROOT, sub, b"nested", 0o755).unwrap();
        assert!(matches!(
            rmdir(&mut fs, &mut cache, &clock, root, b"sub"),
            Err(Error::NotEmpty)
        ));
    }

    #[test]
    fn rename_rejects_exchange_and_whiteout_flags() {
        let mut dev = MemBlockDevice::new(4096);
        let (mut fs, mut cache, root) = mounted(&mut dev, 4096, 256);
        let clock = FixedClock(1);
        create(&mut fs, &mut cache, &clock, Caller::ROOT, root, b"a", 0o644).unwrap();
        assert!(matches!(
            rename(&mut fs, &mut cache, &clock, root, b"a", root, b"b", RENAME_EXCHANGE),
            Err(Error::Inval)
        ));
        assert!(matches!(
            rename(&mut fs, &mut cache, &clock, root, b"a", root, b"b", RENAME_WHITEOUT),
            Err(Error::Inval)
        ));
    }

    #[test]
    fn create_up_to_max_child_then_link_limit() {
        // A directory small enough in inode/block budget that MAX_CHILD
        // itself is impractical to reach in a unit test; instead this drives
        // `available_ext`/`insert`'s LINK_LIMIT path directly via a
        // synthetic `nr_files` at the cap, exercised in `dirent`'s own unit
        // tests (`fill_block_to_capacity_and_drain_in_reverse`) and in the
        // `tests/namespace.rs` integration suite's smaller bounded variant.
        let mut dev = MemBlockDevice::new(4096);
        let (mut fs, mut cache, root) = mounted(&mut dev, 4096, 256);
        let clock = FixedClock(1);
        let root_inode = cache.get(&fs.sb, fs.dev, root).unwrap();
        let mut root_index = fs.read_extent_index(&root_inode).unwrap();
        root_index.nr_files = crate::consts::MAX_CHILD;
        fs.write_extent_index(root_inode.raw.ei_block, &root_index).unwrap();
        assert!(matches!(
            create(&mut fs, &mut cache, &clock, Caller::ROOT, root, b"one_too_many", 0o644),
            Err(Error::LinkLimit)
        ));
    }
}
