use crate::access::tuple::{RecordId, Tuple};
use crate::access::tuple_desc::TupleDesc;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{Page, PageId};
use crate::storage::PAGE_SIZE;
use crate::transaction::TransactionId;
use std::io::Cursor;
use std::sync::Arc;

// Page layout:
//   [header bitmap: ceil(num_slots / 8) bytes][slot 0]...[slot n-1][zero padding]
// Bit i of the header (byte i / 8, LSB first) marks slot i as occupied.

/// A page of fixed-size tuple slots.
#[derive(Debug, Clone)]
pub struct HeapPage {
    pid: PageId,
    desc: Arc<TupleDesc>,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    dirty: Option<TransactionId>,
}

impl HeapPage {
    /// Decode a page from its on-disk bytes.
    pub fn new(pid: PageId, data: &[u8], desc: Arc<TupleDesc>) -> StorageResult<Self> {
        if data.len() != PAGE_SIZE {
            return Err(StorageError::InvalidPage {
                pid,
                reason: format!("expected {} bytes, got {}", PAGE_SIZE, data.len()),
            });
        }

        let num_slots = Self::slots_per_page(&desc);
        let header_size = Self::header_size(num_slots);
        let header = data[..header_size].to_vec();
        let tuple_size = desc.size();

        let mut tuples = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            if !bit_is_set(&header, slot) {
                tuples.push(None);
                continue;
            }
            let start = header_size + slot * tuple_size;
            let mut reader = Cursor::new(&data[start..start + tuple_size]);
            let fields = desc
                .types()
                .map(|t| t.parse(&mut reader))
                .collect::<StorageResult<Vec<_>>>()?;
            let mut tuple = Tuple::new(desc.clone(), fields)?;
            tuple.set_record_id(Some(RecordId::new(pid, slot as u16)));
            tuples.push(Some(tuple));
        }

        Ok(Self {
            pid,
            desc,
            header,
            tuples,
            dirty: None,
        })
    }

    /// A page with every slot empty.
    pub fn empty(pid: PageId, desc: Arc<TupleDesc>) -> StorageResult<Self> {
        Self::new(pid, &Self::empty_page_data(), desc)
    }

    pub fn empty_page_data() -> Vec<u8> {
        vec![0u8; PAGE_SIZE]
    }

    /// Number of tuples of this schema that fit on one page, one header bit each.
    pub fn slots_per_page(desc: &TupleDesc) -> usize {
        (PAGE_SIZE * 8) / (desc.size() * 8 + 1)
    }

    fn header_size(num_slots: usize) -> usize {
        num_slots.div_ceil(8)
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn num_slots(&self) -> usize {
        self.tuples.len()
    }

    pub fn num_empty_slots(&self) -> usize {
        (0..self.num_slots())
            .filter(|slot| !self.is_slot_used(*slot))
            .count()
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.num_slots() && bit_is_set(&self.header, slot)
    }

    fn set_slot(&mut self, slot: usize, used: bool) {
        let mask = 1u8 << (slot % 8);
        if used {
            self.header[slot / 8] |= mask;
        } else {
            self.header[slot / 8] &= !mask;
        }
    }

    /// Place `tuple` in the first free slot and stamp its record id.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> StorageResult<RecordId> {
        if **tuple.tuple_desc() != *self.desc {
            return Err(StorageError::SchemaMismatch {
                expected: self.desc.to_string(),
                found: tuple.tuple_desc().to_string(),
            });
        }

        let slot = (0..self.num_slots())
            .find(|slot| !self.is_slot_used(*slot))
            .ok_or(StorageError::PageFull {
                pid: self.pid,
                num_slots: self.num_slots(),
            })?;

        let rid = RecordId::new(self.pid, slot as u16);
        tuple.set_record_id(Some(rid));
        self.set_slot(slot, true);
        self.tuples[slot] = Some(tuple);
        Ok(rid)
    }

    /// Clear the slot `tuple` occupies on this page.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> StorageResult<()> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| StorageError::TupleNotFound("tuple has no record id".to_string()))?;
        if rid.page_id != self.pid {
            return Err(StorageError::TupleNotFound(format!(
                "{} is not on {}",
                rid, self.pid
            )));
        }
        let slot = rid.tuple_number as usize;
        if !self.is_slot_used(slot) {
            return Err(StorageError::TupleNotFound(format!("slot {} is empty", rid)));
        }

        self.set_slot(slot, false);
        self.tuples[slot] = None;
        Ok(())
    }

    pub fn tuple(&self, slot: usize) -> Option<&Tuple> {
        self.tuples.get(slot).and_then(Option::as_ref)
    }

    /// Occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter().flatten()
    }

    /// Owned copies of the occupied slots, in slot order.
    pub fn tuples(&self) -> Vec<Tuple> {
        self.iter().cloned().collect()
    }
}

impl Page for HeapPage {
    fn id(&self) -> PageId {
        self.pid
    }

    fn page_data(&self) -> StorageResult<Vec<u8>> {
        let tuple_size = self.desc.size();
        let mut data = Vec::with_capacity(PAGE_SIZE);
        data.extend_from_slice(&self.header);

        for slot in &self.tuples {
            match slot {
                Some(tuple) => {
                    for field in tuple.fields() {
                        field.serialize(&mut data)?;
                    }
                }
                None => data.resize(data.len() + tuple_size, 0),
            }
        }

        data.resize(PAGE_SIZE, 0);
        Ok(data)
    }

    fn is_dirty(&self) -> Option<TransactionId> {
        self.dirty
    }

    fn mark_dirty(&mut self, dirty: bool, tid: TransactionId) {
        self.dirty = if dirty { Some(tid) } else { None };
    }
}

fn bit_is_set(header: &[u8], slot: usize) -> bool {
    header[slot / 8] & (1u8 << (slot % 8)) != 0
}
