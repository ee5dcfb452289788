//! Tree Index
//!
//! Arena of a single list's items keyed by id. Parent and children are
//! reachable in O(1) from each record; traversals use explicit stacks so
//! tree shape never affects call-stack depth.

use std::collections::HashMap;

use crate::domain::{
    validate, EngineError, EngineResult, InvariantViolation, Item, ItemId, Level, ListId,
};

#[derive(Debug, Clone)]
pub struct TreeIndex {
    list_id: ListId,
    items: HashMap<ItemId, Item>,
    roots: Vec<ItemId>,
}

impl TreeIndex {
    pub fn new(list_id: ListId) -> Self {
        Self {
            list_id,
            items: HashMap::new(),
            roots: Vec::new(),
        }
    }

    /// Build the index from flat records in storage order
    ///
    /// Children lists are rebuilt from `parent_id`, keeping the record order
    /// as sibling order. Only used when a list is first loaded.
    pub fn load(
        list_id: ListId,
        records: impl IntoIterator<Item = Item>,
    ) -> Result<Self, InvariantViolation> {
        let mut items = HashMap::new();
        let mut order = Vec::new();
        for mut record in records {
            record.children.clear();
            let id = record.id;
            if items.insert(id, record).is_some() {
                return Err(InvariantViolation::DuplicateId { item: id });
            }
            order.push(id);
        }

        let mut roots = Vec::new();
        for id in order {
            let parent_id = items.get(&id).and_then(|item| item.parent_id);
            match parent_id {
                None => roots.push(id),
                Some(parent_id) => {
                    let parent = items
                        .get_mut(&parent_id)
                        .ok_or(InvariantViolation::DanglingParent {
                            item: id,
                            parent: parent_id,
                        })?;
                    parent.children.push(id);
                }
            }
        }

        let index = Self {
            list_id,
            items,
            roots,
        };
        index.validate()?;
        Ok(index)
    }

    pub fn list_id(&self) -> ListId {
        self.list_id
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn get(&self, id: ItemId) -> EngineResult<&Item> {
        self.items.get(&id).ok_or(EngineError::item_not_found(id))
    }

    /// Root ids in list order
    pub fn roots(&self) -> &[ItemId] {
        &self.roots
    }

    /// All records, unordered
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn parent_of(&self, id: ItemId) -> EngineResult<Option<&Item>> {
        match self.get(id)?.parent_id {
            Some(parent_id) => self.items.get(&parent_id).map(Some).ok_or_else(|| {
                EngineError::from(InvariantViolation::DanglingParent {
                    item: id,
                    parent: parent_id,
                })
            }),
            None => Ok(None),
        }
    }

    /// Direct children in order (one generation only)
    pub fn direct_children(&self, id: ItemId) -> EngineResult<Vec<&Item>> {
        let item = self.get(id)?;
        item.children
            .iter()
            .map(|child_id| {
                self.items.get(child_id).ok_or_else(|| {
                    EngineError::from(InvariantViolation::DanglingChild {
                        parent: id,
                        child: *child_id,
                    })
                })
            })
            .collect()
    }

    /// The item and all of its descendants, depth-first pre-order
    ///
    /// Each call returns a fresh iterator; the returned value can also be cloned
    /// to restart from its current position.
    pub fn subtree(&self, id: ItemId) -> EngineResult<Subtree<'_>> {
        self.get(id)?;
        Ok(Subtree {
            items: &self.items,
            stack: vec![id],
        })
    }

    /// Every item of the list, depth-first pre-order, roots in list order
    pub fn preorder(&self) -> Subtree<'_> {
        Subtree {
            items: &self.items,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// The item followed by its parent, grandparent, ... up to the root
    pub fn ancestors(&self, id: ItemId) -> EngineResult<Ancestors<'_>> {
        self.get(id)?;
        Ok(Ancestors {
            items: &self.items,
            next: Some(id),
            remaining: self.items.len(),
        })
    }

    /// Derived nesting level of an item
    pub fn level(&self, id: ItemId) -> EngineResult<Level> {
        let depth = self.ancestors(id)?.count() - 1;
        Level::from_depth(depth)
            .ok_or_else(|| EngineError::from(InvariantViolation::DepthOverflow { item: id }))
    }

    pub fn validate(&self) -> Result<(), InvariantViolation> {
        validate(self.list_id, &self.roots, &self.items)
    }

    pub(crate) fn get_mut(&mut self, id: ItemId) -> EngineResult<&mut Item> {
        self.items
            .get_mut(&id)
            .ok_or(EngineError::item_not_found(id))
    }

    /// Append a new record at the end of its parent's children (or the roots)
    pub(crate) fn insert(&mut self, item: Item) -> EngineResult<()> {
        match item.parent_id {
            Some(parent_id) => self.get_mut(parent_id)?.children.push(item.id),
            None => self.roots.push(item.id),
        }
        self.items.insert(item.id, item);
        Ok(())
    }

    /// Unlink an item from its parent and drop it with its whole subtree
    ///
    /// Returns the removed records in pre-order; their children lists are intact.
    pub(crate) fn remove_subtree(&mut self, id: ItemId) -> EngineResult<Vec<Item>> {
        let ids: Vec<ItemId> = self.subtree(id)?.map(|item| item.id).collect();

        let parent_id = self.get(id)?.parent_id;
        match parent_id {
            Some(parent_id) => self.get_mut(parent_id)?.children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }

        Ok(ids
            .into_iter()
            .filter_map(|removed| self.items.remove(&removed))
            .collect())
    }

    /// Attach a detached subtree (pre-order, root first) as the last root
    pub(crate) fn graft_root(&mut self, records: Vec<Item>) {
        if let Some(root) = records.first() {
            self.roots.push(root.id);
        }
        for record in records {
            self.items.insert(record.id, record);
        }
    }
}

/// Lazy depth-first pre-order walk
#[derive(Debug, Clone)]
pub struct Subtree<'a> {
    items: &'a HashMap<ItemId, Item>,
    stack: Vec<ItemId>,
}

impl<'a> Iterator for Subtree<'a> {
    type Item = &'a Item;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if let Some(item) = self.items.get(&id) {
                self.stack.extend(item.children.iter().rev().copied());
                return Some(item);
            }
        }
        None
    }
}

/// Walk from an item up to its root
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    items: &'a HashMap<ItemId, Item>,
    next: Option<ItemId>,
    // bounds the walk even if parent links were ever to form a cycle
    remaining: usize,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.items.get(&self.next?)?;
        self.remaining -= 1;
        self.next = item.parent_id;
        Some(item)
    }
}
