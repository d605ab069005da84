use crate::domain::coordinate::Coordinate;
use crate::domain::resource::{parse_grid_label, Category, PlacedResource, Resource};
use crate::utils::error::{DeckhandError, Result};
use std::collections::{HashMap, HashSet};

/// Handle into the arena. Ids are never reused; a detached subtree's ids
/// simply become unknown to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

#[derive(Debug)]
struct Node {
    /// Payload. Invariant: `resource.children` is empty while the node is in
    /// the arena; child structure lives in the `children` id list.
    resource: Resource,
    /// Offset relative to the parent node.
    location: Coordinate,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed spatial tree with a maintained name index.
///
/// The tree is the sole owner of attached resources: `attach` consumes a
/// `Resource` value and flattens it into nodes, `detach_by_name` folds the
/// subtree back into a value and returns ownership to the caller. Names are
/// unique across the whole tree at all times; the index keeps lookups
/// sub-linear.
#[derive(Debug)]
pub struct ResourceTree {
    nodes: HashMap<NodeId, Node>,
    index: HashMap<String, NodeId>,
    root: NodeId,
    next_id: u64,
}

impl ResourceTree {
    pub fn new(root: Resource) -> Self {
        let mut tree = ResourceTree {
            nodes: HashMap::new(),
            index: HashMap::new(),
            root: NodeId(0),
            next_id: 0,
        };
        let root_id = tree.insert_subtree(None, Coordinate::ZERO, root);
        tree.root = root_id;
        tree
    }

    fn alloc(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Name lookup through the index. Absence is not an error.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    /// Attaches a standalone resource (and everything nested in it) under
    /// `parent` at the given relative offset. Fails without mutating the tree
    /// if any incoming name collides with an attached one or repeats within
    /// the incoming subtree.
    pub fn attach(&mut self, parent: NodeId, location: Coordinate, resource: Resource) -> Result<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return Err(DeckhandError::NotFoundError(
                "attach parent is not in the tree".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for name in resource.names() {
            if !seen.insert(name) || self.index.contains_key(name) {
                return Err(DeckhandError::DuplicateNameError(name.to_string()));
            }
        }
        Ok(self.insert_subtree(Some(parent), location, resource))
    }

    fn insert_subtree(
        &mut self,
        parent: Option<NodeId>,
        location: Coordinate,
        mut resource: Resource,
    ) -> NodeId {
        let nested = std::mem::take(&mut resource.children);
        let id = self.alloc();
        self.index.insert(resource.name.clone(), id);
        self.nodes.insert(
            id,
            Node {
                resource,
                location,
                parent,
                children: Vec::new(),
            },
        );
        if let Some(parent_id) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                parent_node.children.push(id);
            }
        }
        for placed in nested {
            self.insert_subtree(Some(id), placed.location, placed.resource);
        }
        id
    }

    /// Detaches the named subtree and returns its relative offset together
    /// with the re-folded resource value. The parent back-reference does not
    /// survive: the returned value is standalone again.
    pub fn detach_by_name(&mut self, name: &str) -> Result<(Coordinate, Resource)> {
        let id = self
            .find(name)
            .ok_or_else(|| DeckhandError::NotFoundError(name.to_string()))?;
        if id == self.root {
            return Err(DeckhandError::InvalidOperationError {
                message: "cannot detach the deck root".to_string(),
            });
        }
        if let Some(parent_id) = self.nodes[&id].parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                parent_node.children.retain(|child| *child != id);
            }
        }
        Ok(self.fold(id))
    }

    fn fold(&mut self, id: NodeId) -> (Coordinate, Resource) {
        // Entered only with ids owned by the tree.
        let node = match self.nodes.remove(&id) {
            Some(node) => node,
            None => unreachable!("fold of unknown node id"),
        };
        self.index.remove(&node.resource.name);
        let mut resource = node.resource;
        for child_id in node.children {
            let (location, child) = self.fold(child_id);
            resource.children.push(PlacedResource {
                location,
                resource: child,
            });
        }
        (node.location, resource)
    }

    /// Clone of the subtree folded back into value form, without detaching
    /// it. Serialization snapshots are built from these.
    pub fn to_value(&self, id: NodeId) -> PlacedResource {
        let node = &self.nodes[&id];
        let mut resource = node.resource.clone();
        for child_id in &node.children {
            resource.children.push(self.to_value(*child_id));
        }
        PlacedResource {
            location: node.location,
            resource,
        }
    }

    /// Sum of offsets along the path from the root, O(depth).
    pub fn absolute_location(&self, id: NodeId) -> Coordinate {
        let mut location = Coordinate::ZERO;
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[&node_id];
            location += node.location;
            current = node.parent;
        }
        location
    }

    pub fn resource(&self, id: NodeId) -> &Resource {
        &self.nodes[&id].resource
    }

    pub fn location(&self, id: NodeId) -> Coordinate {
        self.nodes[&id].location
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[&id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[&id].children
    }

    pub fn view(&self, id: NodeId) -> ResourceNode<'_> {
        ResourceNode { tree: self, id }
    }
}

/// Read-only view of an attached resource.
#[derive(Clone, Copy)]
pub struct ResourceNode<'a> {
    tree: &'a ResourceTree,
    id: NodeId,
}

impl<'a> ResourceNode<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        &self.tree.resource(self.id).name
    }

    pub fn model(&self) -> Option<&'a str> {
        self.tree.resource(self.id).model.as_deref()
    }

    pub fn category(&self) -> Category {
        self.tree.resource(self.id).category
    }

    pub fn resource(&self) -> &'a Resource {
        self.tree.resource(self.id)
    }

    /// Offset relative to the parent.
    pub fn location(&self) -> Coordinate {
        self.tree.location(self.id)
    }

    /// Absolute deck coordinate.
    pub fn absolute_location(&self) -> Coordinate {
        self.tree.absolute_location(self.id)
    }

    pub fn parent(&self) -> Option<ResourceNode<'a>> {
        self.tree.parent(self.id).map(|id| self.tree.view(id))
    }

    pub fn children(&self) -> Vec<ResourceNode<'a>> {
        self.tree
            .children(self.id)
            .iter()
            .map(|id| self.tree.view(*id))
            .collect()
    }

    /// Occupant of carrier site `index`, if the site exists and holds one.
    pub fn site(&self, index: usize) -> Option<ResourceNode<'a>> {
        let site_id = self.tree.children(self.id).get(index)?;
        if self.tree.resource(*site_id).category != Category::CarrierSite {
            return None;
        }
        let occupant = self.tree.children(*site_id).first()?;
        Some(self.tree.view(*occupant))
    }

    /// Grid item by `"A1"` style label, for itemized resources.
    pub fn item(&self, label: &str) -> Option<ResourceNode<'a>> {
        let grid = self.tree.resource(self.id).grid.as_ref()?;
        let (i, j) = parse_grid_label(label).ok()?;
        if i >= grid.num_x || j >= grid.num_y {
            return None;
        }
        let child = self.tree.children(self.id).get(i * grid.num_y + j)?;
        Some(self.tree.view(*child))
    }
}
