use glam::{Mat4, Vec4};

use crate::rendering::batch::MeshId;

/// Per mesh metadata. Table indices point into the batch's dedup tables.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSlot {
    pub transform: Mat4,
    pub base_colour: Vec4,
    pub vertex_array: usize,
    pub index_array: usize,
    /// diffuse, normal, metallic-roughness
    pub images: [Option<usize>; 3],
}

/// Dense slot storage with a free list: removing never moves other slots, recycled ids are handed out before the
/// storage grows.
#[derive(Debug, Default)]
pub(crate) struct SlotArena {
    slots: Vec<Option<MeshSlot>>,
    free: Vec<u32>,
}

impl SlotArena {
    pub fn insert(&mut self, slot: MeshSlot) -> MeshId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id as usize] = Some(slot);
                MeshId(id)
            }
            None => {
                self.slots.push(Some(slot));
                MeshId(self.slots.len() as u32 - 1)
            }
        }
    }

    pub fn remove(&mut self, id: MeshId) -> Option<MeshSlot> {
        let slot = self.slots.get_mut(id.0 as usize)?.take()?;
        self.free.push(id.0);
        Some(slot)
    }

    pub fn get(&self, id: MeshId) -> Option<&MeshSlot> {
        self.slots.get(id.0 as usize)?.as_ref()
    }

    /// Active slots in id order.
    pub fn active(&self) -> impl Iterator<Item = (MeshId, &MeshSlot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|slot| (MeshId(id as u32), slot)))
    }

    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}
