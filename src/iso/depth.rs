//! Per-layer draw-order index for on-screen entities.
//!
//! Entities must interleave with the map tiles in painter's order: an entity
//! standing on map row N draws after row N's tiles and before row N+1's. The
//! index keeps, per render layer, a list of visible entities sorted by their
//! cartesian height, tagged with the map row their feet are on. The render
//! system rebuilds it during the entity pass and drains it front-to-back
//! while sweeping tile rows; the collision probe reads the previous frame's
//! contents.

use crate::ecs::EntityId;

/// Entity slots reserved per layer up front.
const INITIAL_ENTRIES_PER_LAYER: usize = 100;

/// Slots added whenever a layer's live count passes half its reservation.
const ENTRY_GROWTH_STEP: usize = 1000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DepthEntry {
    pub entity: EntityId,
    /// Cartesian vertical coordinate; ascending order is back-to-front.
    pub depth_key: i32,
    /// Diagonal map row (tile units) the entity's foot position falls on.
    pub row: i32,
}

struct Layer {
    entries: Vec<DepthEntry>,
    /// Complete previous-frame entries, read by the collision probe.
    snapshot: Vec<DepthEntry>,
    /// Next entry to hand to the draw loop.
    cursor: usize,
    /// Capacity target; grown ahead of need so the shifting insert never
    /// reallocates mid-frame.
    reserved: usize,
}

impl Layer {
    fn new() -> Self {
        Self {
            entries: Vec::with_capacity(INITIAL_ENTRIES_PER_LAYER),
            snapshot: Vec::new(),
            cursor: 0,
            reserved: INITIAL_ENTRIES_PER_LAYER,
        }
    }
}

pub struct DepthSortIndex {
    layers: Vec<Layer>,
}

impl Default for DepthSortIndex {
    fn default() -> Self {
        Self { layers: Vec::new() }
    }
}

impl DepthSortIndex {
    /// Size the index for a map's layer count. Drops any previous contents.
    pub fn configure(&mut self, num_layers: usize) {
        self.layers = (0..num_layers).map(|_| Layer::new()).collect();
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Frame boundary: retire the live lists into the snapshots, clear them,
    /// and rewind the draw cursors.
    pub fn begin_frame(&mut self) {
        for layer in &mut self.layers {
            std::mem::swap(&mut layer.entries, &mut layer.snapshot);
            layer.entries.clear();
            layer.cursor = 0;
        }
    }

    /// Insert an entry keeping the layer sorted ascending by depth key.
    ///
    /// Equal keys insert after all existing equals, so insertion order is
    /// preserved for ties. Returns `false` when the layer is out of range or
    /// reserving more storage failed; the entity is simply absent from this
    /// frame's index then.
    pub fn insert(&mut self, layer: usize, entry: DepthEntry) -> bool {
        let Some(layer) = self.layers.get_mut(layer) else {
            return false;
        };

        // Stay ahead of the shifting insert: grow once the live count passes
        // half the reservation.
        if layer.entries.len() >= layer.reserved / 2 {
            let target = layer.reserved + ENTRY_GROWTH_STEP;
            let additional = target.saturating_sub(layer.entries.len());
            if layer.entries.try_reserve_exact(additional).is_err() {
                log::error!("depth index layer storage exhausted; entity dropped this frame");
                return false;
            }
            layer.reserved = target;
        }

        if layer.entries.is_empty() {
            layer.entries.push(entry);
            return true;
        }

        let at = layer
            .entries
            .partition_point(|e| e.depth_key <= entry.depth_key);
        layer.entries.insert(at, entry);
        true
    }

    pub fn len(&self, layer: usize) -> usize {
        self.layers.get(layer).map_or(0, |l| l.entries.len())
    }

    pub fn is_empty(&self, layer: usize) -> bool {
        self.len(layer) == 0
    }

    pub fn entries(&self, layer: usize) -> &[DepthEntry] {
        self.layers.get(layer).map_or(&[], |l| &l.entries)
    }

    /// Previous frame's entries for a layer — the collision snapshot.
    pub fn snapshot(&self, layer: usize) -> &[DepthEntry] {
        self.layers.get(layer).map_or(&[], |l| &l.snapshot)
    }

    /// Pop the front-most undrawn entry whose row bucket has been reached by
    /// the tile sweep. `<=` rather than `==`: a row the sweep skipped must
    /// not strand its entities in the list.
    pub fn take_due(&mut self, layer: usize, row: i32) -> Option<DepthEntry> {
        let layer = self.layers.get_mut(layer)?;
        let entry = layer.entries.get(layer.cursor)?;
        if entry.row <= row {
            layer.cursor += 1;
            Some(*entry)
        } else {
            None
        }
    }

    /// Remaining undrawn entries after the tile sweep finished a layer.
    pub fn take_remaining(&mut self, layer: usize) -> Option<DepthEntry> {
        self.take_due(layer, i32::MAX)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(entity: EntityId, depth_key: i32) -> DepthEntry {
        DepthEntry { entity, depth_key, row: 0 }
    }

    fn keys(index: &DepthSortIndex, layer: usize) -> Vec<i32> {
        index.entries(layer).iter().map(|e| e.depth_key).collect()
    }

    #[test]
    fn inserts_sort_ascending() {
        let mut index = DepthSortIndex::default();
        index.configure(1);
        for (i, key) in [100, 50, 150, 75].into_iter().enumerate() {
            assert!(index.insert(0, entry(i as EntityId, key)));
        }
        assert_eq!(keys(&index, 0), vec![50, 75, 100, 150]);
    }

    #[test]
    fn equal_keys_keep_insertion_order() {
        let mut index = DepthSortIndex::default();
        index.configure(1);
        index.insert(0, entry(10, 42));
        index.insert(0, entry(20, 42));
        index.insert(0, entry(30, 42));

        let ids: Vec<EntityId> = index.entries(0).iter().map(|e| e.entity).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn insert_at_both_ends() {
        let mut index = DepthSortIndex::default();
        index.configure(1);
        index.insert(0, entry(0, 10));
        index.insert(0, entry(1, 5)); // new head
        index.insert(0, entry(2, 20)); // new tail
        assert_eq!(keys(&index, 0), vec![5, 10, 20]);
    }

    #[test]
    fn single_entry_layer_accepts_second() {
        let mut index = DepthSortIndex::default();
        index.configure(1);
        index.insert(0, entry(0, 7));
        index.insert(0, entry(1, 3));
        assert_eq!(keys(&index, 0), vec![3, 7]);
    }

    #[test]
    fn unknown_layer_is_rejected() {
        let mut index = DepthSortIndex::default();
        index.configure(1);
        assert!(!index.insert(3, entry(0, 0)));
    }

    #[test]
    fn begin_frame_snapshots_and_clears() {
        let mut index = DepthSortIndex::default();
        index.configure(2);
        index.insert(0, entry(1, 10));
        index.insert(1, entry(2, 20));

        index.begin_frame();
        assert_eq!(index.len(0), 0);
        assert_eq!(index.snapshot(0).len(), 1);
        assert_eq!(index.snapshot(0)[0].entity, 1);
        assert_eq!(index.snapshot(1)[0].entity, 2);

        // The next boundary retires the (empty) live lists.
        index.begin_frame();
        assert!(index.snapshot(0).is_empty());
    }

    #[test]
    fn take_due_respects_row_buckets() {
        let mut index = DepthSortIndex::default();
        index.configure(1);
        index.insert(0, DepthEntry { entity: 1, depth_key: 10, row: 2 });
        index.insert(0, DepthEntry { entity: 2, depth_key: 20, row: 4 });

        assert_eq!(index.take_due(0, 1), None);
        assert_eq!(index.take_due(0, 2).map(|e| e.entity), Some(1));
        assert_eq!(index.take_due(0, 2), None);
        assert_eq!(index.take_due(0, 5).map(|e| e.entity), Some(2));
        assert_eq!(index.take_due(0, 5), None);
    }

    #[test]
    fn take_remaining_flushes_the_tail() {
        let mut index = DepthSortIndex::default();
        index.configure(1);
        for i in 0..4 {
            index.insert(0, DepthEntry { entity: i, depth_key: i as i32, row: 100 });
        }
        let mut drained = 0;
        while index.take_remaining(0).is_some() {
            drained += 1;
        }
        assert_eq!(drained, 4);
    }

    #[test]
    fn growth_keeps_entries_sorted() {
        let mut index = DepthSortIndex::default();
        index.configure(1);
        // Enough inserts to cross the half-reservation growth threshold.
        for i in 0..200u32 {
            let key = ((i * 7919) % 997) as i32;
            assert!(index.insert(0, entry(i, key)));
        }
        let ks = keys(&index, 0);
        assert!(ks.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(ks.len(), 200);
    }
}
