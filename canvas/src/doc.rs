//! Scene model: the element collection, selection, background and layer
//! bookkeeping.
//!
//! Elements are kept in insertion order; paint order comes from each
//! element's `layer`, which is unique within the scene. The store owns every
//! element outright. Selection is held as an id, and the `selected` flag on
//! the element it names is kept in sync with it.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use crate::background::Background;
use crate::element::{Element, ElementId, ElementPatch};
use crate::error::EditorError;

/// In-memory scene store.
#[derive(Debug, Default)]
pub struct Scene {
    elements: Vec<Element>,
    selection: Option<ElementId>,
    pub background: Background,
    /// Layer handed to the next inserted element.
    next_layer: i64,
    /// Bumped whenever the scene is replaced wholesale.
    generation: u64,
}

impl Scene {
    /// Create an empty scene with the default background.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =============================================================
    // Collection
    // =============================================================

    /// Append an element on a fresh top-most layer and return its id.
    pub fn insert(&mut self, mut element: Element) -> ElementId {
        if self.next_layer.checked_add(1).is_none() {
            self.renumber_layers();
        }
        element.layer = self.next_layer;
        element.selected = false;
        self.next_layer += 1;
        let id = element.id;
        self.elements.push(element);
        id
    }

    /// Remove an element, clearing the selection if it pointed at it.
    pub fn remove(&mut self, id: &ElementId) -> Option<Element> {
        let index = self.index_of(id)?;
        if self.selection.as_ref() == Some(id) {
            self.selection = None;
        }
        let mut element = self.elements.remove(index);
        element.selected = false;
        Some(element)
    }

    #[must_use]
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| &e.id == id)
    }

    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| &e.id == id)
    }

    #[must_use]
    pub fn index_of(&self, id: &ElementId) -> Option<usize> {
        self.elements.iter().position(|e| &e.id == id)
    }

    /// Elements in insertion order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut [Element] {
        &mut self.elements
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Indices into [`Scene::elements`] in paint order (ascending layer).
    #[must_use]
    pub fn paint_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.elements.len()).collect();
        order.sort_by_key(|&i| self.elements[i].layer);
        order
    }

    /// Elements in paint order, bottom first.
    #[must_use]
    pub fn sorted_by_layer(&self) -> Vec<&Element> {
        self.paint_order().into_iter().map(|i| &self.elements[i]).collect()
    }

    /// Layer values in collection order.
    #[must_use]
    pub fn layers(&self) -> Vec<i64> {
        self.elements.iter().map(|e| e.layer).collect()
    }

    /// Counter stamped on async work so results for a replaced scene can be
    /// told apart.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // =============================================================
    // Selection
    // =============================================================

    #[must_use]
    pub fn selection(&self) -> Option<ElementId> {
        self.selection
    }

    #[must_use]
    pub fn selected(&self) -> Option<&Element> {
        self.selection.as_ref().and_then(|id| self.get(id))
    }

    pub fn selected_mut(&mut self) -> Option<&mut Element> {
        let id = self.selection?;
        self.get_mut(&id)
    }

    /// Select `id`, deselecting everything else. Returns false for an unknown id.
    pub fn select(&mut self, id: &ElementId) -> bool {
        if self.index_of(id).is_none() {
            return false;
        }
        for element in &mut self.elements {
            element.selected = &element.id == id;
        }
        self.selection = Some(*id);
        true
    }

    /// Deselect everything. Image crop mode ends with the selection.
    pub fn clear_selection(&mut self) {
        for element in &mut self.elements {
            element.selected = false;
            if let Some(image) = element.as_image_mut() {
                image.crop_mode = false;
            }
        }
        self.selection = None;
    }

    /// Id after the current selection in collection order, wrapping. The
    /// first element when nothing is selected.
    #[must_use]
    pub fn next_in_cycle(&self) -> Option<ElementId> {
        let next = match self.selection.and_then(|id| self.index_of(&id)) {
            Some(i) => (i + 1) % self.elements.len(),
            None => 0,
        };
        self.elements.get(next).map(|e| e.id)
    }

    // =============================================================
    // Updates
    // =============================================================

    /// Apply a partial update to one element.
    ///
    /// # Errors
    ///
    /// [`EditorError::NotFound`] for an unknown id. [`EditorError::Validation`]
    /// when a field is out of range or the patch would give the element a
    /// layer another element already holds; nothing is applied in either case.
    pub fn apply_patch(&mut self, id: &ElementId, patch: &ElementPatch) -> Result<(), EditorError> {
        if let Some(layer) = patch.layer {
            if self.elements.iter().any(|e| &e.id != id && e.layer == layer) {
                return Err(EditorError::Validation(format!("layer {layer} is already in use")));
            }
        }
        let element = self.get_mut(id).ok_or(EditorError::NotFound)?;
        element.apply_patch(patch)?;
        let layer = element.layer;
        match layer.checked_add(1) {
            Some(next) => self.next_layer = self.next_layer.max(next),
            None => self.renumber_layers(),
        }
        Ok(())
    }

    // =============================================================
    // Z-order
    // =============================================================

    /// Put `id` above every other element. Returns false for an unknown id.
    pub fn bring_to_front(&mut self, id: &ElementId) -> bool {
        if self.index_of(id).is_none() {
            return false;
        }
        if self.layer_extent().is_some_and(|(_, top)| top.checked_add(2).is_none()) {
            self.renumber_layers();
        }
        let Some((_, top)) = self.layer_extent() else {
            return false;
        };
        let Some(element) = self.get_mut(id) else {
            return false;
        };
        element.layer = top + 1;
        self.next_layer = self.next_layer.max(top + 2);
        true
    }

    /// Put `id` below every other element. Returns false for an unknown id.
    pub fn send_to_back(&mut self, id: &ElementId) -> bool {
        if self.index_of(id).is_none() {
            return false;
        }
        if self.layer_extent().is_some_and(|(bottom, _)| bottom.checked_sub(1).is_none()) {
            self.renumber_layers();
        }
        let Some((bottom, _)) = self.layer_extent() else {
            return false;
        };
        let Some(element) = self.get_mut(id) else {
            return false;
        };
        element.layer = bottom - 1;
        true
    }

    /// Swap layers with the element directly above. Returns false when `id`
    /// is unknown or already on top.
    pub fn bring_forward(&mut self, id: &ElementId) -> bool {
        self.swap_with_neighbor(id, 1)
    }

    /// Swap layers with the element directly below. Returns false when `id`
    /// is unknown or already at the bottom.
    pub fn send_backward(&mut self, id: &ElementId) -> bool {
        self.swap_with_neighbor(id, -1)
    }

    fn swap_with_neighbor(&mut self, id: &ElementId, step: isize) -> bool {
        let order = self.paint_order();
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let Some(pos) = order.iter().position(|&i| i == index) else {
            return false;
        };
        let Some(&other) = pos.checked_add_signed(step).and_then(|p| order.get(p)) else {
            return false;
        };
        let (a, b) = (self.elements[index].layer, self.elements[other].layer);
        self.elements[index].layer = b;
        self.elements[other].layer = a;
        true
    }

    // =============================================================
    // Whole-scene replacement
    // =============================================================

    /// Replace every element and the background, e.g. after loading a project.
    ///
    /// Repeated ids are replaced with fresh ones. Layers are kept when they
    /// are unique. Colliding layers are bumped upward in paint order so the
    /// relative order survives; when that runs out of room above, every layer
    /// is renumbered from 0.
    pub fn load(&mut self, elements: Vec<Element>, background: Background) {
        self.elements = elements;
        self.selection = None;
        self.background = background;

        let mut seen = HashSet::with_capacity(self.elements.len());
        let mut reissued = 0usize;
        for element in &mut self.elements {
            element.selected = false;
            if !seen.insert(element.id) {
                element.id = Uuid::new_v4();
                seen.insert(element.id);
                reissued += 1;
            }
        }
        if reissued > 0 {
            debug!(reissued, "replaced repeated element ids");
        }

        if !self.repair_layers() {
            self.renumber_layers();
        }
        self.generation += 1;
    }

    /// Bump colliding layers upward and reset the layer counter. Returns
    /// false when a layer would pass `i64::MAX`.
    fn repair_layers(&mut self) -> bool {
        let mut previous: Option<i64> = None;
        let mut bumped = 0usize;
        for index in self.paint_order() {
            let element = &mut self.elements[index];
            if let Some(prev) = previous {
                if element.layer <= prev {
                    let Some(next) = prev.checked_add(1) else {
                        return false;
                    };
                    element.layer = next;
                    bumped += 1;
                }
            }
            previous = Some(element.layer);
        }
        let next_layer = match previous {
            Some(top) => top.checked_add(1),
            None => Some(0),
        };
        let Some(next_layer) = next_layer else {
            return false;
        };
        if bumped > 0 {
            debug!(bumped, "renumbered colliding layers");
        }
        self.next_layer = next_layer;
        true
    }

    /// Reassign layers `0..n` in paint order.
    fn renumber_layers(&mut self) {
        let mut next = 0i64;
        for index in self.paint_order() {
            self.elements[index].layer = next;
            next += 1;
        }
        self.next_layer = next;
        debug!(count = next, "layer range exhausted, renumbered from 0");
    }

    /// Lowest and highest layer in use.
    fn layer_extent(&self) -> Option<(i64, i64)> {
        let bottom = self.elements.iter().map(|e| e.layer).min()?;
        let top = self.elements.iter().map(|e| e.layer).max()?;
        Some((bottom, top))
    }

    /// Remove every element, keeping the background.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.selection = None;
        self.next_layer = 0;
        self.generation += 1;
    }
}
