//! Cross-reference table.
//!
//! Maps object numbers to their location descriptors. Incremental
//! updates are folded in with `merge_up`; the loaders walk revisions
//! newest to oldest, then apply entries oldest first so later
//! revisions win.

use crate::model::Dict;
use std::collections::BTreeMap;

/// Largest object number a conforming file may use.
pub const MAX_OBJECT_NUMBER: u32 = 0x7FFF_FFFF;

/// Ceiling on entries accepted from a single cross-reference section.
pub const MAX_XREF_SIZE: u32 = 1_048_576;

/// Where an object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectInfo {
    /// Deleted or never used.
    Free,
    /// Placeholder from a declared /Size beyond any real entry.
    /// Reported as free, but a later entry may claim the slot.
    Null,
    /// Stored at an absolute file offset.
    Normal { pos: u64, gennum: u32 },
    /// Stored at an offset, and known to be an object stream container.
    ObjStream { pos: u64, gennum: u32 },
    /// Stored inside an object stream.
    Compressed { container: u32, index: u32 },
}

/// Coarse classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Free,
    Normal,
    ObjStream,
    Compressed,
}

impl ObjectInfo {
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Free | Self::Null => ObjectKind::Free,
            Self::Normal { .. } => ObjectKind::Normal,
            Self::ObjStream { .. } => ObjectKind::ObjStream,
            Self::Compressed { .. } => ObjectKind::Compressed,
        }
    }
}

/// Object-number to location map plus the trailer dictionary that
/// described it.
#[derive(Debug, Default)]
pub struct CrossRefTable {
    trailer: Dict,
    /// Object number of the cross-reference stream holding the
    /// trailer, or 0 for a classic trailer. That object must never be
    /// fetched through the encryption path.
    trailer_objnum: u32,
    objects: BTreeMap<u32, ObjectInfo>,
}

impl CrossRefTable {
    pub fn new(trailer: Dict, trailer_objnum: u32) -> Self {
        Self {
            trailer,
            trailer_objnum,
            objects: BTreeMap::new(),
        }
    }

    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    pub const fn trailer_objnum(&self) -> u32 {
        self.trailer_objnum
    }

    pub fn set_trailer(&mut self, trailer: Dict, trailer_objnum: u32) {
        self.trailer = trailer;
        self.trailer_objnum = trailer_objnum;
    }

    fn valid_objnum(objnum: u32) -> bool {
        objnum > 0 && objnum < MAX_OBJECT_NUMBER
    }

    /// Record an object at a file offset. An existing entry with a
    /// higher generation is kept, and a container marker keeps its
    /// marker while taking the new position.
    pub fn add_normal(&mut self, objnum: u32, gennum: u32, pos: u64) {
        if !Self::valid_objnum(objnum) {
            return;
        }
        let info = match self.objects.get(&objnum) {
            Some(ObjectInfo::Normal { gennum: g, .. } | ObjectInfo::ObjStream { gennum: g, .. })
                if *g > gennum =>
            {
                return;
            }
            Some(ObjectInfo::Compressed { .. }) if gennum == 0 => return,
            Some(ObjectInfo::ObjStream { .. }) => ObjectInfo::ObjStream { pos, gennum },
            _ => ObjectInfo::Normal { pos, gennum },
        };
        self.objects.insert(objnum, info);
    }

    /// Record an object stored inside container `container` at local
    /// `index`. The container is marked as an object stream right
    /// away; its own entry may arrive later and fill in the position.
    pub fn add_compressed(&mut self, objnum: u32, container: u32, index: u32) {
        if !Self::valid_objnum(objnum) || !Self::valid_objnum(container) {
            return;
        }
        match self.objects.get(&objnum) {
            Some(ObjectInfo::ObjStream { .. }) => return,
            Some(ObjectInfo::Normal { gennum, .. }) if *gennum > 0 => return,
            _ => {}
        }
        self.objects
            .insert(objnum, ObjectInfo::Compressed { container, index });

        let marker = match self.objects.get(&container) {
            Some(
                ObjectInfo::Normal { pos, gennum } | ObjectInfo::ObjStream { pos, gennum },
            ) => ObjectInfo::ObjStream {
                pos: *pos,
                gennum: *gennum,
            },
            _ => ObjectInfo::ObjStream { pos: 0, gennum: 0 },
        };
        self.objects.insert(container, marker);
    }

    /// Mark an object free, unconditionally.
    pub fn set_free(&mut self, objnum: u32) {
        if !Self::valid_objnum(objnum) {
            return;
        }
        self.objects.insert(objnum, ObjectInfo::Free);
    }

    pub fn get_object_info(&self, objnum: u32) -> Option<&ObjectInfo> {
        self.objects.get(&objnum)
    }

    /// Classification for an object number; absent entries read as
    /// free.
    pub fn object_kind(&self, objnum: u32) -> ObjectKind {
        self.objects
            .get(&objnum)
            .map_or(ObjectKind::Free, ObjectInfo::kind)
    }

    /// File offset for a plain normal entry, otherwise 0. Container
    /// streams and compressed objects are reached through their own
    /// paths.
    pub fn get_object_position_or_zero(&self, objnum: u32) -> u64 {
        match self.objects.get(&objnum) {
            Some(ObjectInfo::Normal { pos, .. }) => *pos,
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Greatest known object number.
    pub fn last_objnum(&self) -> u32 {
        self.objects.keys().next_back().copied().unwrap_or(0)
    }

    /// Iterate entries in object-number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &ObjectInfo)> {
        self.objects.iter().map(|(k, v)| (*k, v))
    }

    /// Drop entries at or beyond `size` and pin the declared ceiling:
    /// if slot `size - 1` is unknown a placeholder is inserted so
    /// `last_objnum` reflects the declared /Size.
    pub fn shrink_object_map(&mut self, size: u32) {
        if size == 0 {
            self.objects.clear();
            return;
        }
        self.objects.split_off(&size);
        self.objects.entry(size - 1).or_insert(ObjectInfo::Null);
    }

    /// Fold a later revision into this one. The newer table's entries
    /// win conflicts, except that an object-stream marker is never
    /// demoted back to a plain normal entry. Newer trailer keys
    /// shadow older ones.
    pub fn merge_up(&mut self, newer: Self) {
        for (objnum, mut info) in newer.objects {
            if let Some(ObjectInfo::ObjStream { .. }) = self.objects.get(&objnum) {
                if let ObjectInfo::Normal { pos, gennum } = info {
                    info = ObjectInfo::ObjStream { pos, gennum };
                }
            }
            self.objects.insert(objnum, info);
        }
        if !newer.trailer.is_empty() {
            for (key, value) in newer.trailer {
                self.trailer.insert(key, value);
            }
            self.trailer_objnum = newer.trailer_objnum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_reads_free() {
        let table = CrossRefTable::default();
        assert_eq!(table.object_kind(5), ObjectKind::Free);
        assert_eq!(table.get_object_position_or_zero(5), 0);
    }

    #[test]
    fn test_higher_generation_wins() {
        let mut table = CrossRefTable::default();
        table.add_normal(3, 2, 100);
        table.add_normal(3, 1, 200);
        assert_eq!(
            table.get_object_info(3),
            Some(&ObjectInfo::Normal { pos: 100, gennum: 2 })
        );
        table.add_normal(3, 2, 300);
        assert_eq!(table.get_object_position_or_zero(3), 300);
    }

    #[test]
    fn test_object_zero_rejected() {
        let mut table = CrossRefTable::default();
        table.add_normal(0, 0, 50);
        assert!(table.get_object_info(0).is_none());
        assert_eq!(table.last_objnum(), 0);
    }

    #[test]
    fn test_compressed_promotes_container() {
        let mut table = CrossRefTable::default();
        table.add_normal(10, 0, 4096);
        table.add_compressed(7, 10, 2);
        assert_eq!(table.object_kind(10), ObjectKind::ObjStream);
        assert_eq!(
            table.get_object_info(10),
            Some(&ObjectInfo::ObjStream { pos: 4096, gennum: 0 })
        );
        assert_eq!(
            table.get_object_info(7),
            Some(&ObjectInfo::Compressed { container: 10, index: 2 })
        );
    }

    #[test]
    fn test_container_marked_before_its_own_entry() {
        let mut table = CrossRefTable::default();
        table.add_compressed(7, 10, 2);
        assert_eq!(
            table.get_object_info(10),
            Some(&ObjectInfo::ObjStream { pos: 0, gennum: 0 })
        );
        table.add_normal(10, 0, 4096);
        assert_eq!(
            table.get_object_info(10),
            Some(&ObjectInfo::ObjStream { pos: 4096, gennum: 0 })
        );
    }

    #[test]
    fn test_set_free_overwrites() {
        let mut table = CrossRefTable::default();
        table.add_normal(4, 0, 900);
        table.set_free(4);
        assert_eq!(table.object_kind(4), ObjectKind::Free);
    }

    #[test]
    fn test_shrink_inserts_size_ceiling() {
        let mut table = CrossRefTable::default();
        table.add_normal(1, 0, 10);
        table.add_normal(9, 0, 20);
        table.shrink_object_map(6);
        assert!(table.get_object_info(9).is_none());
        assert_eq!(table.last_objnum(), 5);
        assert_eq!(table.object_kind(5), ObjectKind::Free);
    }

    #[test]
    fn test_merge_up_newer_wins_older_fills() {
        let mut older = CrossRefTable::new(Dict::new(), 0);
        older.add_normal(1, 0, 100);
        older.add_normal(2, 0, 200);

        let mut newer = CrossRefTable::new(Dict::new(), 0);
        newer.add_normal(2, 0, 999);
        newer.set_free(3);

        older.merge_up(newer);
        assert_eq!(older.get_object_position_or_zero(1), 100);
        assert_eq!(older.get_object_position_or_zero(2), 999);
        assert_eq!(older.object_kind(3), ObjectKind::Free);
    }

    #[test]
    fn test_merge_up_keeps_objstream_marker() {
        let mut older = CrossRefTable::default();
        older.add_normal(10, 0, 500);
        older.add_compressed(3, 10, 0);

        let mut newer = CrossRefTable::default();
        newer.add_normal(10, 0, 500);

        older.merge_up(newer);
        assert_eq!(older.object_kind(10), ObjectKind::ObjStream);
    }
}
