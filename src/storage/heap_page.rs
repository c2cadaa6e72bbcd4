use std::sync::Arc;

use crate::common::config::page_size;
use crate::common::{DbError, PageId, RecordId, Result, TransactionId};
use crate::tuple::{Tuple, TupleDesc};

/// Number of set bits for every 8-bit value.
const fn build_popcount() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 1;
    while i < 256 {
        table[i] = table[i >> 1] + (i & 1) as u8;
        i += 1;
    }
    table
}

static POPCOUNT: [u8; 256] = build_popcount();

/// One fixed-size page of a heap file.
///
/// ## Page Binary Format
///
/// ```text
/// +----------------+--------------------------------+---------+
/// | Header bitmap  | N tuple slots, tupleSize bytes | Zero    |
/// | ceil(N/8) B    | each (zeroed when empty)       | padding |
/// +----------------+--------------------------------+---------+
/// ```
///
/// Slot `i` is live iff bit `i % 8` of header byte `i / 8` is set
/// (LSB-first). `N = pageSize * 8 / (tupleSize * 8 + 1)` so that the
/// header bit and the slot body together never exceed the page.
///
/// The page keeps a byte snapshot of its last clean state (the
/// before-image) so an aborting transaction can roll its changes back.
pub struct HeapPage {
    page_id: PageId,
    desc: Arc<TupleDesc>,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    num_slots: usize,
    dirtied_by: Option<TransactionId>,
    before_image: Vec<u8>,
}

impl HeapPage {
    /// Parses a page from exactly `page_size()` bytes read from disk.
    pub fn new(page_id: PageId, data: &[u8], desc: Arc<TupleDesc>) -> Result<Self> {
        if data.len() != page_size() {
            return Err(DbError::PageReadError {
                page_id,
                reason: format!("expected {} bytes, got {}", page_size(), data.len()),
            });
        }

        let num_slots = Self::slot_count(&desc);
        let header_len = Self::header_len(num_slots);
        let header = data[..header_len].to_vec();
        let tuple_size = desc.size();

        let mut tuples = Vec::with_capacity(num_slots);
        let mut offset = header_len;
        for slot in 0..num_slots {
            if header[slot / 8] >> (slot % 8) & 1 == 1 {
                let mut tuple = Tuple::new(desc.clone());
                let mut pos = offset;
                for i in 0..desc.num_fields() {
                    let field_type = desc.field_type(i)?;
                    let field = field_type.parse(&data[pos..]).map_err(|e| {
                        DbError::PageReadError {
                            page_id,
                            reason: format!("slot {} field {}: {}", slot, i, e),
                        }
                    })?;
                    pos += field_type.size();
                    tuple.set_field(i, field)?;
                }
                tuple.set_record_id(Some(RecordId::new(page_id, slot)));
                tuples.push(Some(tuple));
            } else {
                tuples.push(None);
            }
            offset += tuple_size;
        }

        let mut page = Self {
            page_id,
            desc,
            header,
            tuples,
            num_slots,
            dirtied_by: None,
            before_image: Vec::new(),
        };
        page.set_before_image();
        Ok(page)
    }

    /// Number of tuple slots a page holds for the given schema.
    pub fn slot_count(desc: &TupleDesc) -> usize {
        page_size() * 8 / (desc.size() * 8 + 1)
    }

    fn header_len(num_slots: usize) -> usize {
        (num_slots + 7) / 8
    }

    /// An all-zero page image, used when a heap file grows.
    pub fn empty_page_data() -> Vec<u8> {
        vec![0; page_size()]
    }

    pub fn id(&self) -> PageId {
        self.page_id
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Serializes the page back to exactly `page_size()` bytes.
    ///
    /// Feeding the result to [`HeapPage::new`] must reproduce the same
    /// bytes: empty slots are zero-filled, live slots hold their fields
    /// in schema order, and the tail is zero padding.
    pub fn get_page_data(&self) -> Vec<u8> {
        let tuple_size = self.desc.size();
        let mut out = Vec::with_capacity(page_size());
        out.extend_from_slice(&self.header);

        for slot in 0..self.num_slots {
            match self.tuples.get(slot) {
                Some(Some(tuple)) if self.is_slot_used(slot) => {
                    // Stored tuples always have every field set.
                    let start = out.len();
                    if tuple.serialize_into(&mut out).is_err() {
                        out.truncate(start);
                        out.resize(start + tuple_size, 0);
                    }
                }
                _ => out.resize(out.len() + tuple_size, 0),
            }
        }

        out.resize(page_size(), 0);
        out
    }

    /// Stores `t` in the lowest-indexed empty slot and records its new
    /// location in `t`.
    pub fn insert_tuple(&mut self, t: &mut Tuple) -> Result<()> {
        if *t.desc().as_ref() != *self.desc {
            return Err(DbError::SchemaMismatch(format!(
                "tuple schema ({}) does not match page schema ({})",
                t.desc(),
                self.desc
            )));
        }
        let slot = (0..self.num_slots)
            .find(|&slot| !self.is_slot_used(slot))
            .ok_or(DbError::NoEmptySlots(self.page_id))?;

        t.set_record_id(Some(RecordId::new(self.page_id, slot)));
        self.tuples[slot] = Some(t.clone());
        self.mark_slot_used(slot, true);
        Ok(())
    }

    /// Clears the header bit of `t`'s slot. The slot's bytes remain in
    /// place but the slot is logically empty.
    pub fn delete_tuple(&mut self, t: &Tuple) -> Result<()> {
        let rid = t
            .record_id()
            .ok_or_else(|| DbError::NotOnPage(self.page_id))?;
        if rid.page_id != self.page_id || rid.slot >= self.num_slots {
            return Err(DbError::NotOnPage(self.page_id));
        }
        if !self.is_slot_used(rid.slot) {
            return Err(DbError::EmptySlot(rid.slot));
        }
        match &self.tuples[rid.slot] {
            Some(stored) if stored == t => {}
            _ => return Err(DbError::NotOnPage(self.page_id)),
        }
        self.mark_slot_used(rid.slot, false);
        Ok(())
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.num_slots && self.header[slot / 8] >> (slot % 8) & 1 == 1
    }

    fn mark_slot_used(&mut self, slot: usize, used: bool) {
        if used {
            self.header[slot / 8] |= 1 << (slot % 8);
        } else {
            self.header[slot / 8] &= !(1 << (slot % 8));
        }
    }

    /// Counts empty slots via the header popcount table.
    pub fn num_empty_slots(&self) -> usize {
        let used: usize = self
            .header
            .iter()
            .map(|&b| POPCOUNT[b as usize] as usize)
            .sum();
        self.num_slots - used
    }

    /// Records `tid` as the dirtying transaction.
    pub fn mark_dirty(&mut self, tid: TransactionId) {
        self.dirtied_by = Some(tid);
    }

    pub fn mark_clean(&mut self) {
        self.dirtied_by = None;
    }

    /// The transaction that last dirtied this page, or `None` if clean.
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    /// Yields the tuples of used slots in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.tuples
            .iter()
            .enumerate()
            .filter(move |(slot, _)| self.is_slot_used(*slot))
            .filter_map(|(_, t)| t.as_ref())
    }

    /// Snapshots the current page bytes as the revert point for abort.
    pub fn set_before_image(&mut self) {
        self.before_image = self.get_page_data();
    }

    /// Reconstructs the page as of the most recent snapshot.
    pub fn before_image(&self) -> Result<HeapPage> {
        HeapPage::new(self.page_id, &self.before_image, self.desc.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;
    use crate::tuple::{Field, FieldType};

    fn test_desc() -> Arc<TupleDesc> {
        Arc::new(TupleDesc::named(
            vec![FieldType::Int, FieldType::Int],
            &["a", "b"],
        ))
    }

    fn test_pid() -> PageId {
        PageId::new(TableId::new(7), 0)
    }

    fn empty_page() -> HeapPage {
        HeapPage::new(test_pid(), &HeapPage::empty_page_data(), test_desc()).unwrap()
    }

    fn tuple(a: i32, b: i32) -> Tuple {
        Tuple::from_fields(test_desc(), vec![Field::Int(a), Field::Int(b)])
    }

    #[test]
    fn test_slot_count_and_header_len() {
        // 4096 * 8 / (8 * 8 + 1) = 504 slots, 63 header bytes
        let desc = test_desc();
        assert_eq!(HeapPage::slot_count(&desc), 504);
        let page = empty_page();
        assert_eq!(page.num_slots(), 504);
        assert_eq!(page.num_empty_slots(), 504);
    }

    #[test]
    fn test_page_data_round_trip() {
        let mut page = empty_page();
        for i in 0..10 {
            let mut t = tuple(i, i * 10);
            page.insert_tuple(&mut t).unwrap();
        }

        let data = page.get_page_data();
        assert_eq!(data.len(), page_size());

        let reparsed = HeapPage::new(test_pid(), &data, test_desc()).unwrap();
        assert_eq!(reparsed.get_page_data(), data);
        assert_eq!(reparsed.num_empty_slots(), page.num_empty_slots());
    }

    #[test]
    fn test_insert_assigns_lowest_empty_slot() {
        let mut page = empty_page();
        let mut first = tuple(1, 10);
        let mut second = tuple(2, 20);
        page.insert_tuple(&mut first).unwrap();
        page.insert_tuple(&mut second).unwrap();

        assert_eq!(first.record_id().unwrap().slot, 0);
        assert_eq!(second.record_id().unwrap().slot, 1);

        page.delete_tuple(&first).unwrap();
        let mut third = tuple(3, 30);
        page.insert_tuple(&mut third).unwrap();
        assert_eq!(third.record_id().unwrap().slot, 0);
    }

    #[test]
    fn test_slot_accounting() {
        let mut page = empty_page();
        let before = page.num_empty_slots();

        let mut t = tuple(5, 50);
        page.insert_tuple(&mut t).unwrap();
        assert_eq!(page.num_empty_slots(), before - 1);

        page.delete_tuple(&t).unwrap();
        assert_eq!(page.num_empty_slots(), before);
    }

    #[test]
    fn test_insert_rejects_wrong_schema() {
        let mut page = empty_page();
        let other = Arc::new(TupleDesc::unnamed(vec![FieldType::Int]));
        let mut t = Tuple::from_fields(other, vec![Field::Int(1)]);
        assert!(matches!(
            page.insert_tuple(&mut t),
            Err(DbError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_insert_into_full_page() {
        let mut page = empty_page();
        for i in 0..page.num_slots() {
            let mut t = tuple(i as i32, 0);
            page.insert_tuple(&mut t).unwrap();
        }
        let mut overflow = tuple(-1, -1);
        assert!(matches!(
            page.insert_tuple(&mut overflow),
            Err(DbError::NoEmptySlots(_))
        ));
    }

    #[test]
    fn test_delete_errors() {
        let mut page = empty_page();
        let mut stored = tuple(1, 10);
        page.insert_tuple(&mut stored).unwrap();

        // Same slot, different content
        let mut imposter = tuple(9, 90);
        imposter.set_record_id(stored.record_id());
        assert!(matches!(
            page.delete_tuple(&imposter),
            Err(DbError::NotOnPage(_))
        ));

        page.delete_tuple(&stored).unwrap();
        assert!(matches!(
            page.delete_tuple(&stored),
            Err(DbError::EmptySlot(0))
        ));
    }

    #[test]
    fn test_iterator_skips_empty_slots() {
        let mut page = empty_page();
        let mut kept = Vec::new();
        for i in 0..5 {
            let mut t = tuple(i, i);
            page.insert_tuple(&mut t).unwrap();
            kept.push(t);
        }
        page.delete_tuple(&kept[1]).unwrap();
        page.delete_tuple(&kept[3]).unwrap();

        let seen: Vec<i32> = page
            .iter()
            .map(|t| match t.field(0).unwrap() {
                Field::Int(v) => *v,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(seen, vec![0, 2, 4]);

        // restartable
        assert_eq!(page.iter().count(), 3);
    }

    #[test]
    fn test_before_image_revert() {
        let mut page = empty_page();
        let mut t = tuple(1, 2);
        page.insert_tuple(&mut t).unwrap();
        page.set_before_image();

        let mut extra = tuple(3, 4);
        page.insert_tuple(&mut extra).unwrap();
        assert_eq!(page.iter().count(), 2);

        let reverted = page.before_image().unwrap();
        assert_eq!(reverted.iter().count(), 1);
        assert_eq!(reverted.get_page_data(), page.before_image);
    }
}
