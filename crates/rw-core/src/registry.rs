//! The object registry: an arena of world objects keyed by unique name.
//!
//! Ownership is a tree. Beings and location states hang off the world root;
//! items are owned by exactly one container whose `items` list holds their
//! handle. The child → parent index is derived from those lists: it is
//! rebuilt on deserialization and never persisted.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::id::ObjectId;
use crate::object::{Being, ObjectKind, WorldObject};

/// Where a registered object hangs in the ownership tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    /// The world root (beings, location states).
    Root,
    /// Another object (items only).
    Object(ObjectId),
}

/// Arena of every world object in one game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "RegistryData", into = "RegistryData")]
pub struct Registry {
    objects: BTreeMap<ObjectId, WorldObject>,
    roots: Vec<ObjectId>,
    next_serial: u64,
    retired: BTreeSet<ObjectId>,

    // Index
    parents: HashMap<ObjectId, ObjectId>,
}

/// Persisted form: the tree itself plus the id allocator state.
#[derive(Serialize, Deserialize)]
struct RegistryData {
    #[serde(default)]
    next_serial: u64,
    #[serde(default)]
    retired: BTreeSet<ObjectId>,
    roots: Vec<ObjectId>,
    objects: Vec<WorldObject>,
}

impl From<Registry> for RegistryData {
    fn from(registry: Registry) -> Self {
        Self {
            next_serial: registry.next_serial,
            retired: registry.retired,
            roots: registry.roots,
            objects: registry.objects.into_values().collect(),
        }
    }
}

impl TryFrom<RegistryData> for Registry {
    type Error = CoreError;

    fn try_from(data: RegistryData) -> CoreResult<Self> {
        let mut objects = BTreeMap::new();
        for obj in data.objects {
            if obj.unique_name.is_empty() {
                return Err(CoreError::Corrupt(format!(
                    "object \"{}\" has no unique name",
                    obj.name
                )));
            }
            let id = obj.unique_name.clone();
            if objects.insert(id.clone(), obj).is_some() {
                return Err(CoreError::Corrupt(format!("duplicate unique name {id}")));
            }
        }
        let mut registry = Self {
            objects,
            roots: data.roots,
            next_serial: data.next_serial,
            retired: data.retired,
            parents: HashMap::new(),
        };
        registry.rebuild_index()?;
        Ok(registry)
    }
}

// The parent index is derived, so it takes no part in equality.
impl PartialEq for Registry {
    fn eq(&self, other: &Self) -> bool {
        self.objects == other.objects
            && self.roots == other.roots
            && self.next_serial == other.next_serial
            && self.retired == other.retired
    }
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a new object under `owner` and return its unique name.
    ///
    /// The object's requested unique name (or its display name if none) is
    /// used when free; otherwise a monotonically increasing integer suffix
    /// is appended. Names of removed objects are never handed out again.
    pub fn register(&mut self, mut obj: WorldObject, owner: Owner) -> CoreResult<ObjectId> {
        let kind = obj.kind();
        match (&owner, kind) {
            (Owner::Root, ObjectKind::Item) => return Err(CoreError::OrphanItem(obj.name)),
            (Owner::Object(parent), ObjectKind::Item) => {
                if !self.objects.contains_key(parent) {
                    return Err(CoreError::ObjectNotFound(parent.clone()));
                }
            }
            (Owner::Object(parent), _) => {
                return Err(CoreError::InvalidOwner {
                    name: obj.name,
                    kind,
                    owner: parent.clone(),
                });
            }
            (Owner::Root, _) => {}
        }
        if !obj.items.is_empty() {
            return Err(CoreError::Corrupt(format!(
                "\"{}\" was registered while already owning items",
                obj.name
            )));
        }

        let base = if obj.unique_name.is_empty() {
            obj.name.clone()
        } else {
            obj.unique_name.0.clone()
        };
        let id = self.allocate(&base);
        obj.unique_name = id.clone();
        self.objects.insert(id.clone(), obj);

        match owner {
            Owner::Root => self.roots.push(id.clone()),
            Owner::Object(parent) => {
                self.attach(&id, &parent)?;
            }
        }
        Ok(id)
    }

    /// Remove an object and, recursively, everything it owns.
    ///
    /// Returns the removed object. All removed names are retired until
    /// [`Registry::release_retired`] lets them go.
    pub fn unregister(&mut self, id: &ObjectId) -> CoreResult<WorldObject> {
        if !self.objects.contains_key(id) {
            return Err(CoreError::ObjectNotFound(id.clone()));
        }
        self.detach(id)?;

        let mut removed = None;
        let mut pending = vec![id.clone()];
        while let Some(current) = pending.pop() {
            let obj = self
                .objects
                .remove(&current)
                .ok_or_else(|| CoreError::Corrupt(format!("dangling child {current}")))?;
            self.parents.remove(&current);
            pending.extend(obj.items.iter().cloned());
            self.retired.insert(current.clone());
            if &current == id {
                removed = Some(obj);
            }
        }
        removed.ok_or_else(|| CoreError::ObjectNotFound(id.clone()))
    }

    /// Forget retired names nothing refers to any more, so they may be handed
    /// out again and do not pile up in saved games.
    pub fn release_retired(&mut self, still_referenced: impl Fn(&ObjectId) -> bool) {
        self.retired.retain(|id| still_referenced(id));
    }

    /// True if `name` belonged to a removed object and is still held back.
    pub fn is_retired(&self, name: &str) -> bool {
        self.retired.contains(name)
    }

    /// Move an item (or `qty` units of a stack) to a new owner.
    ///
    /// Returns the unique name the moved units have at the destination:
    /// - moving a whole item keeps its unique name;
    /// - moving part of a stack leaves the remainder under the old name and
    ///   registers the moved portion under a new one;
    /// - if the destination already holds a same-named, non-unique stack,
    ///   the quantities merge into that stack.
    pub fn reparent(
        &mut self,
        item: &ObjectId,
        new_owner: &ObjectId,
        qty: Option<u32>,
    ) -> CoreResult<ObjectId> {
        let obj = self.get(item)?;
        let state = obj.item().ok_or_else(|| CoreError::WrongKind {
            id: item.clone(),
            expected: ObjectKind::Item,
            actual: obj.kind(),
        })?;
        if !self.objects.contains_key(new_owner) {
            return Err(CoreError::ObjectNotFound(new_owner.clone()));
        }
        if new_owner == item || self.is_descendant(new_owner, item) {
            return Err(CoreError::WouldCycle {
                item: item.clone(),
                owner: new_owner.clone(),
            });
        }

        let available = state.count();
        let moving = qty.unwrap_or(available);
        if moving == 0 || moving > available {
            return Err(CoreError::InsufficientQuantity {
                item: item.clone(),
                requested: moving,
                available,
            });
        }

        let old_owner = self
            .parents
            .get(item)
            .cloned()
            .ok_or_else(|| CoreError::Corrupt(format!("item {item} has no owner")))?;
        if &old_owner == new_owner {
            return Ok(item.clone());
        }

        if let Some(target) = self.mergeable_stack(item, new_owner) {
            if let Some(stack) = self.get_mut(&target)?.item_mut() {
                stack.qty = Some(stack.count() + moving);
            }
            if moving == available {
                self.unregister(item)?;
            } else {
                self.set_qty(item, available - moving)?;
            }
            return Ok(target);
        }

        if moving < available {
            let mut portion = self.get(item)?.clone();
            portion.unique_name = ObjectId::default();
            portion.items.clear();
            if let Some(state) = portion.item_mut() {
                state.qty = Some(moving);
            }
            self.set_qty(item, available - moving)?;
            return self.register(portion, Owner::Object(new_owner.clone()));
        }

        self.detach(item)?;
        self.attach(item, new_owner)?;
        Ok(item.clone())
    }

    /// Use up `n` units of an item. The entry disappears when nothing is left.
    /// Returns the remaining quantity.
    pub fn consume(&mut self, item: &ObjectId, n: u32) -> CoreResult<u32> {
        let obj = self.get(item)?;
        let state = obj.item().ok_or_else(|| CoreError::WrongKind {
            id: item.clone(),
            expected: ObjectKind::Item,
            actual: obj.kind(),
        })?;
        let available = state.count();
        if n > available {
            return Err(CoreError::InsufficientQuantity {
                item: item.clone(),
                requested: n,
                available,
            });
        }
        let remaining = available - n;
        if remaining == 0 {
            self.unregister(item)?;
        } else {
            self.set_qty(item, remaining)?;
        }
        Ok(remaining)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Look up an object; absence is not an error.
    pub fn resolve(&self, name: &str) -> Option<&WorldObject> {
        self.objects.get(name)
    }

    /// Mutable lookup; absence is not an error.
    pub fn resolve_mut(&mut self, name: &str) -> Option<&mut WorldObject> {
        self.objects.get_mut(name)
    }

    /// Look up an object that must exist.
    pub fn get(&self, id: &ObjectId) -> CoreResult<&WorldObject> {
        self.objects
            .get(id)
            .ok_or_else(|| CoreError::ObjectNotFound(id.clone()))
    }

    /// Mutable lookup of an object that must exist.
    pub fn get_mut(&mut self, id: &ObjectId) -> CoreResult<&mut WorldObject> {
        self.objects
            .get_mut(id)
            .ok_or_else(|| CoreError::ObjectNotFound(id.clone()))
    }

    /// The being payload of an object that must be a character, monster or NPC.
    pub fn being(&self, id: &ObjectId) -> CoreResult<&Being> {
        let obj = self.get(id)?;
        obj.being().ok_or_else(|| CoreError::WrongKind {
            id: id.clone(),
            expected: ObjectKind::Character,
            actual: obj.kind(),
        })
    }

    /// Mutable being payload.
    pub fn being_mut(&mut self, id: &ObjectId) -> CoreResult<&mut Being> {
        let obj = self.get_mut(id)?;
        let kind = obj.kind();
        obj.being_mut().ok_or_else(|| CoreError::WrongKind {
            id: id.clone(),
            expected: ObjectKind::Character,
            actual: kind,
        })
    }

    /// True if the unique name is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    /// The owner of an item; `None` for objects at the root.
    pub fn parent_of(&self, id: &str) -> Option<&ObjectId> {
        self.parents.get(id)
    }

    /// Handles of the items an object owns.
    pub fn children(&self, id: &str) -> &[ObjectId] {
        self.objects
            .get(id)
            .map(|o| o.items.as_slice())
            .unwrap_or_default()
    }

    /// Handles of everything owned by the world root, in registration order.
    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    /// Iterate over every registered object.
    pub fn iter(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.values()
    }

    /// Root objects of a kind, in registration order.
    pub fn roots_of_kind(&self, kind: ObjectKind) -> Vec<&WorldObject> {
        self.roots
            .iter()
            .filter_map(|id| self.objects.get(id))
            .filter(|o| o.kind() == kind)
            .collect()
    }

    /// Number of registered objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Find an item held by `owner` by unique name, then by display name.
    pub fn find_child(&self, owner: &str, name: &str) -> Option<ObjectId> {
        let children = self.children(owner);
        children
            .iter()
            .find(|c| c.as_str() == name)
            .or_else(|| {
                children.iter().find(|c| {
                    self.objects
                        .get(*c)
                        .is_some_and(|o| o.name.eq_ignore_ascii_case(name))
                })
            })
            .cloned()
    }

    /// True if `candidate` sits somewhere below `ancestor` in the tree.
    pub fn is_descendant(&self, candidate: &ObjectId, ancestor: &ObjectId) -> bool {
        let mut current = self.parents.get(candidate);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parents.get(parent);
        }
        false
    }

    /// Verify that the tree, the parent index and the arena agree.
    pub fn check_consistency(&self) -> CoreResult<()> {
        let mut rebuilt = self.clone();
        rebuilt.rebuild_index()?;
        if rebuilt.parents != self.parents {
            return Err(CoreError::Corrupt(
                "parent index out of sync with ownership lists".to_string(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn allocate(&mut self, base: &str) -> ObjectId {
        if !self.is_taken(base) {
            return ObjectId::from(base);
        }
        loop {
            self.next_serial += 1;
            let candidate = format!("{base} {}", self.next_serial);
            if !self.is_taken(&candidate) {
                return ObjectId::from(candidate);
            }
        }
    }

    fn is_taken(&self, name: &str) -> bool {
        self.objects.contains_key(name) || self.retired.contains(name)
    }

    fn attach(&mut self, id: &ObjectId, parent: &ObjectId) -> CoreResult<()> {
        let owner = self.get_mut(parent)?;
        owner.items.push(id.clone());
        self.parents.insert(id.clone(), parent.clone());
        Ok(())
    }

    fn detach(&mut self, id: &ObjectId) -> CoreResult<()> {
        match self.parents.remove(id) {
            Some(parent) => {
                let owner = self.get_mut(&parent)?;
                owner.items.retain(|c| c != id);
                if let Some(being) = owner.being_mut() {
                    being.equipped.unequip(id);
                }
            }
            None => self.roots.retain(|r| r != id),
        }
        Ok(())
    }

    fn set_qty(&mut self, item: &ObjectId, qty: u32) -> CoreResult<()> {
        if let Some(state) = self.get_mut(item)?.item_mut() {
            state.qty = Some(qty);
        }
        Ok(())
    }

    fn mergeable_stack(&self, item: &ObjectId, owner: &ObjectId) -> Option<ObjectId> {
        let moving = self.objects.get(item)?;
        let state = moving.item()?;
        if !state.is_stackable() {
            return None;
        }
        self.children(owner.as_str())
            .iter()
            .find(|c| {
                self.objects.get(*c).is_some_and(|o| {
                    o.name == moving.name
                        && o.item_def_key() == moving.item_def_key()
                        && o.item().is_some_and(|s| s.is_stackable())
                })
            })
            .cloned()
    }

    fn rebuild_index(&mut self) -> CoreResult<()> {
        self.parents.clear();
        let mut seen = HashSet::new();
        for root in &self.roots {
            let obj = self
                .objects
                .get(root)
                .ok_or_else(|| CoreError::Corrupt(format!("root {root} is not registered")))?;
            if obj.kind() == ObjectKind::Item {
                return Err(CoreError::Corrupt(format!("item {root} has no owner")));
            }
            if !seen.insert(root.clone()) {
                return Err(CoreError::Corrupt(format!("{root} listed twice")));
            }
            let mut pending = vec![root.clone()];
            while let Some(id) = pending.pop() {
                let obj = self
                    .objects
                    .get(&id)
                    .ok_or_else(|| CoreError::Corrupt(format!("dangling handle {id}")))?;
                if obj.unique_name != id {
                    return Err(CoreError::Corrupt(format!(
                        "{id} is stored under the wrong key"
                    )));
                }
                for child in &obj.items {
                    let child_obj = self.objects.get(child).ok_or_else(|| {
                        CoreError::Corrupt(format!("{id} owns unregistered {child}"))
                    })?;
                    if child_obj.kind() != ObjectKind::Item {
                        return Err(CoreError::Corrupt(format!(
                            "{id} owns {child}, which is not an item"
                        )));
                    }
                    if !seen.insert(child.clone()) {
                        return Err(CoreError::Corrupt(format!("{child} has two owners")));
                    }
                    self.parents.insert(child.clone(), id.clone());
                    pending.push(child.clone());
                }
            }
        }
        if seen.len() != self.objects.len() {
            return Err(CoreError::Corrupt(format!(
                "{} objects are unreachable from the root",
                self.objects.len() - seen.len()
            )));
        }
        Ok(())
    }
}
