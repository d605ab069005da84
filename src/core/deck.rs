use crate::config::{PlatformConfig, RailDeckConfig, SlotDeckConfig};
use crate::core::slots::{self, SlotScheme};
use crate::core::tree::{NodeId, ResourceNode, ResourceTree};
use crate::domain::coordinate::Coordinate;
use crate::domain::resource::{Category, Resource};
use crate::utils::error::{DeckhandError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How close a raw x coordinate must be to a rail's nominal x to count as
/// sitting on that rail. Vendor layout tools emit coordinates rounded to a
/// thousandth of a millimeter.
const RAIL_SNAP_MM: f64 = 1e-3;

/// Where a resource goes on the deck: a rail (linear-rail platforms), a
/// numbered slot (grid platforms), or a raw coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Rail(i32),
    Slot(u32),
    Location(Coordinate),
}

/// The robot's work surface: the root of the resource tree plus the
/// platform's addressing scheme. All placement validation happens here;
/// backend notification is the orchestrator's job.
#[derive(Debug)]
pub struct Deck {
    tree: ResourceTree,
    scheme: Scheme,
}

#[derive(Debug)]
enum Scheme {
    Rails(RailScheme),
    Slots(SlotScheme),
}

/// Rail-addressed scheme: carriers occupy a contiguous span of rails, each
/// rail a fixed x step from the last. Occupancy is kept per starting rail,
/// ordered, which also drives the summary rendering.
#[derive(Debug)]
struct RailScheme {
    config: RailDeckConfig,
    occupants: BTreeMap<u32, RailOccupant>,
}

#[derive(Debug)]
struct RailOccupant {
    name: String,
    span: u32,
}

#[derive(Debug, Clone, Copy)]
struct RailPlan {
    start: u32,
    span: u32,
    location: Coordinate,
}

impl RailScheme {
    fn new(config: RailDeckConfig) -> Self {
        Self {
            config,
            occupants: BTreeMap::new(),
        }
    }

    fn rail_x(&self, rail: u32) -> f64 {
        self.config.first_rail_x + (rail - 1) as f64 * self.config.rail_pitch
    }

    fn span_of(&self, size_x: f64) -> u32 {
        ((size_x / self.config.rail_pitch).ceil() as u32).max(1)
    }

    /// Inverse of `rail_x`: the rail whose nominal x is within `tolerance`
    /// of the given coordinate, if any.
    fn rail_for_x(&self, x: f64, tolerance: f64) -> Option<u32> {
        let steps = (x - self.config.first_rail_x) / self.config.rail_pitch;
        let rail = steps.round() as i64 + 1;
        if rail < 1 || rail > self.config.num_rails as i64 {
            return None;
        }
        let rail = rail as u32;
        if (x - self.rail_x(rail)).abs() <= tolerance {
            Some(rail)
        } else {
            None
        }
    }

    fn plan(&self, resource: &Resource, rail: i32) -> Result<RailPlan> {
        if rail < 1 || rail as u32 > self.config.num_rails {
            return Err(DeckhandError::InvalidRailError {
                rail,
                reason: format!("rail must be between 1 and {}", self.config.num_rails),
            });
        }
        let start = rail as u32;
        let span = self.span_of(resource.size_x);
        // span saturates for absurd widths; keep `end` from wrapping past the
        // range check below.
        let end = start.saturating_add(span) - 1;
        if end > self.config.num_rails {
            return Err(DeckhandError::InvalidRailError {
                rail,
                reason: format!(
                    "'{}' is {} mm wide and would span rails {} to {}, past rail {}",
                    resource.name, resource.size_x, start, end, self.config.num_rails
                ),
            });
        }
        for (other_start, occupant) in &self.occupants {
            let other_end = other_start + occupant.span - 1;
            if start <= other_end && *other_start <= end {
                return Err(DeckhandError::OccupiedSlotError {
                    slot: format!("rail span {}-{}", start, end),
                    by: occupant.name.clone(),
                });
            }
        }
        Ok(RailPlan {
            start,
            span,
            location: Coordinate::new(
                self.rail_x(start),
                self.config.carrier_y,
                self.config.carrier_z,
            ),
        })
    }

    fn commit(&mut self, start: u32, span: u32, name: String) {
        self.occupants.insert(start, RailOccupant { name, span });
    }

    fn release(&mut self, name: &str) {
        self.occupants.retain(|_, occupant| occupant.name != name);
    }

    fn rail_of(&self, name: &str) -> Option<u32> {
        self.occupants
            .iter()
            .find(|(_, occupant)| occupant.name == name)
            .map(|(start, _)| *start)
    }
}

impl Deck {
    /// A rail-addressed deck with no carriers assigned.
    pub fn rails(config: RailDeckConfig) -> Result<Self> {
        config.validate()?;
        let root = Resource::new(
            &config.name,
            Category::Deck,
            config.size_x,
            config.size_y,
            config.size_z,
        );
        Ok(Deck {
            tree: ResourceTree::new(root),
            scheme: Scheme::Rails(RailScheme::new(config)),
        })
    }

    /// A slot-addressed deck. The factory trash container is seated in its
    /// configured slot unless the config opts out.
    pub fn slots(config: SlotDeckConfig) -> Result<Self> {
        Self::slots_inner(config, true)
    }

    fn slots_inner(config: SlotDeckConfig, with_trash: bool) -> Result<Self> {
        config.validate()?;
        let root = Resource::new(
            &config.name,
            Category::Deck,
            config.size_x,
            config.size_y,
            config.size_z,
        );
        let trash_slot = config.trash_slot;
        let seat_trash = with_trash && !config.no_trash;
        let mut deck = Deck {
            tree: ResourceTree::new(root),
            scheme: Scheme::Slots(SlotScheme::new(config)),
        };
        if seat_trash {
            deck.assign(slots::trash_container(), Placement::Slot(trash_slot))?;
        }
        Ok(deck)
    }

    pub fn name(&self) -> &str {
        &self.tree.resource(self.tree.root()).name
    }

    /// Number of top-level resources on the deck.
    pub fn num_assigned(&self) -> usize {
        self.tree.children(self.tree.root()).len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tree.contains(name)
    }

    /// Tree-wide lookup by name. Absence is a `None`, not an error.
    pub fn get(&self, name: &str) -> Option<ResourceNode<'_>> {
        self.tree.find(name).map(|id| self.tree.view(id))
    }

    pub fn root_view(&self) -> ResourceNode<'_> {
        self.tree.view(self.tree.root())
    }

    /// Starting rail of an assigned carrier (rail decks only).
    pub fn rail_of(&self, name: &str) -> Option<u32> {
        match &self.scheme {
            Scheme::Rails(scheme) => scheme.rail_of(name),
            Scheme::Slots(_) => None,
        }
    }

    /// Slot of an assigned resource (slot decks only).
    pub fn slot_of(&self, name: &str) -> Option<u32> {
        match &self.scheme {
            Scheme::Rails(_) => None,
            Scheme::Slots(scheme) => scheme.slot_of(name),
        }
    }

    pub fn is_rail_addressed(&self) -> bool {
        matches!(self.scheme, Scheme::Rails(_))
    }

    /// The rail whose nominal x matches the given coordinate, used by the
    /// layout importer to recover rail numbers from absolute geometry.
    pub fn rail_for_x(&self, x: f64, tolerance: f64) -> Option<u32> {
        match &self.scheme {
            Scheme::Rails(scheme) => scheme.rail_for_x(x, tolerance),
            Scheme::Slots(_) => None,
        }
    }

    /// Rails covered by a resource of the given width (rail decks only).
    pub fn rail_span(&self, size_x: f64) -> Option<u32> {
        match &self.scheme {
            Scheme::Rails(scheme) => Some(scheme.span_of(size_x)),
            Scheme::Slots(_) => None,
        }
    }

    /// Validates a rail placement against the live deck without mutating
    /// anything and reports where the resource would land.
    pub(crate) fn preview_rail(&self, resource: &Resource, rail: i32) -> Result<Coordinate> {
        match &self.scheme {
            Scheme::Rails(scheme) => Ok(scheme.plan(resource, rail)?.location),
            Scheme::Slots(_) => Err(DeckhandError::InvalidOperationError {
                message: "this deck is slot-addressed; assign by slot".to_string(),
            }),
        }
    }

    fn preview_slot(&self, resource: &Resource, number: u32) -> Result<Coordinate> {
        match &self.scheme {
            Scheme::Slots(scheme) => {
                let plan = scheme.plan(&self.tree, resource, number)?;
                Ok(self.tree.absolute_location(plan.parent) + plan.location)
            }
            Scheme::Rails(_) => Err(DeckhandError::InvalidOperationError {
                message: "this deck is rail-addressed; assign by rail".to_string(),
            }),
        }
    }

    /// Non-mutating version of `assign`: runs the same placement validation
    /// and reports the absolute location the resource would land at. The
    /// orchestrator uses this to resolve a gripper move's destination before
    /// the physical motion happens.
    pub(crate) fn preview(&self, resource: &Resource, placement: Placement) -> Result<Coordinate> {
        match placement {
            Placement::Rail(rail) => self.preview_rail(resource, rail),
            Placement::Slot(number) => self.preview_slot(resource, number),
            Placement::Location(location) => match &self.scheme {
                Scheme::Slots(scheme) => {
                    let number = scheme.slot_at(location).ok_or_else(|| {
                        DeckhandError::InvalidSlotError {
                            slot: format!("{}", location),
                            reason: "no slot at this coordinate".to_string(),
                        }
                    })?;
                    self.preview_slot(resource, number)
                }
                Scheme::Rails(scheme) => {
                    if let Some(rail) = scheme.rail_for_x(location.x, RAIL_SNAP_MM) {
                        scheme.plan(resource, rail as i32)?;
                    }
                    Ok(location)
                }
            },
        }
    }

    /// Attaches a standalone resource at the requested placement. Placement
    /// constraints and name uniqueness are validated before any mutation.
    /// Returns the absolute location of the attached resource.
    pub fn assign(&mut self, resource: Resource, placement: Placement) -> Result<Coordinate> {
        match placement {
            Placement::Rail(rail) => self.assign_at_rail(resource, rail),
            Placement::Slot(number) => self.assign_at_slot(resource, number),
            Placement::Location(location) => self.assign_at_location(resource, location),
        }
    }

    fn assign_at_rail(&mut self, resource: Resource, rail: i32) -> Result<Coordinate> {
        let plan = match &self.scheme {
            Scheme::Rails(scheme) => scheme.plan(&resource, rail)?,
            Scheme::Slots(_) => {
                return Err(DeckhandError::InvalidOperationError {
                    message: "this deck is slot-addressed; assign by slot".to_string(),
                })
            }
        };
        let name = resource.name.clone();
        let id = self.tree.attach(self.tree.root(), plan.location, resource)?;
        if let Scheme::Rails(scheme) = &mut self.scheme {
            scheme.commit(plan.start, plan.span, name);
        }
        Ok(self.tree.absolute_location(id))
    }

    fn assign_at_slot(&mut self, resource: Resource, number: u32) -> Result<Coordinate> {
        let plan = match &self.scheme {
            Scheme::Slots(scheme) => scheme.plan(&self.tree, &resource, number)?,
            Scheme::Rails(_) => {
                return Err(DeckhandError::InvalidOperationError {
                    message: "this deck is rail-addressed; assign by rail".to_string(),
                })
            }
        };
        let name = resource.name.clone();
        let stacked = if resource.category == Category::Adapter {
            resource
                .children
                .first()
                .map(|child| child.resource.name.clone())
        } else {
            None
        };
        let id = self.tree.attach(plan.parent, plan.location, resource)?;
        if let Scheme::Slots(scheme) = &mut self.scheme {
            scheme.commit(&plan, name, stacked);
        }
        Ok(self.tree.absolute_location(id))
    }

    fn assign_at_location(&mut self, resource: Resource, location: Coordinate) -> Result<Coordinate> {
        if let Scheme::Slots(scheme) = &self.scheme {
            let number =
                scheme
                    .slot_at(location)
                    .ok_or_else(|| DeckhandError::InvalidSlotError {
                        slot: format!("{}", location),
                        reason: "no slot at this coordinate".to_string(),
                    })?;
            return self.assign_at_slot(resource, number);
        }
        // On a rail deck a coordinate that lands on the rail lattice gets
        // full rail bookkeeping; anything else is attached unmanaged.
        let managed = match &self.scheme {
            Scheme::Rails(scheme) => match scheme.rail_for_x(location.x, RAIL_SNAP_MM) {
                Some(rail) => {
                    let plan = scheme.plan(&resource, rail as i32)?;
                    Some((plan.start, plan.span))
                }
                None => None,
            },
            Scheme::Slots(_) => None,
        };
        let name = resource.name.clone();
        let id = self.tree.attach(self.tree.root(), location, resource)?;
        if let (Some((start, span)), Scheme::Rails(scheme)) = (managed, &mut self.scheme) {
            scheme.commit(start, span, name);
        }
        Ok(self.tree.absolute_location(id))
    }

    /// Detaches the named resource and returns it as a standalone value.
    /// Fails with `NotFoundError` when the name is not attached; a second
    /// call on the same name fails the same way.
    pub fn unassign(&mut self, name: &str) -> Result<Resource> {
        let id = self
            .tree
            .find(name)
            .ok_or_else(|| DeckhandError::NotFoundError(name.to_string()))?;
        if id == self.tree.root() {
            return Err(DeckhandError::InvalidOperationError {
                message: "cannot unassign the deck itself".to_string(),
            });
        }
        if self.tree.resource(id).category == Category::CarrierSite {
            return Err(DeckhandError::InvalidOperationError {
                message: format!("'{}' is a fixed carrier site", name),
            });
        }
        match &mut self.scheme {
            Scheme::Rails(scheme) => scheme.release(name),
            Scheme::Slots(scheme) => scheme.release(name)?,
        }
        let (_, resource) = self.tree.detach_by_name(name)?;
        Ok(resource)
    }

    /// Deterministic human-readable rendering: the rail tree for rail decks,
    /// the slot grid for slot decks.
    pub fn summary(&self) -> String {
        match &self.scheme {
            Scheme::Rails(scheme) => self.rail_summary(scheme),
            Scheme::Slots(scheme) => scheme.summary(),
        }
    }

    fn rail_summary(&self, scheme: &RailScheme) -> String {
        let mut out = String::new();
        out.push_str("Rail     Resource                   Type                Coordinates (mm)\n");
        out.push_str(&"=".repeat(95));
        out.push('\n');
        let mut blocks: Vec<String> = Vec::new();
        for (start, occupant) in &scheme.occupants {
            let id = match self.tree.find(&occupant.name) {
                Some(id) => id,
                None => unreachable!("rail occupancy entry without a tree node"),
            };
            blocks.push(self.rail_block(*start, id));
        }
        out.push_str(&blocks.join("     │\n"));
        out
    }

    fn rail_block(&self, rail: u32, id: NodeId) -> String {
        let resource = self.tree.resource(id);
        let mut block = format!(
            "{:<5}├── {:<27}{:<20}{}\n",
            format!("({})", rail),
            resource.name,
            type_label(resource),
            self.tree.absolute_location(id),
        );
        if resource.category == Category::Carrier {
            for site_id in self.tree.children(id) {
                match self.tree.children(*site_id).first() {
                    Some(occupant_id) => {
                        let occupant = self.tree.resource(*occupant_id);
                        block.push_str(&format!(
                            "     │   ├── {:<23}{:<20}{}\n",
                            occupant.name,
                            type_label(occupant),
                            self.tree.absolute_location(*occupant_id),
                        ));
                    }
                    None => block.push_str("     │   ├── <empty>\n"),
                }
            }
        }
        block
    }

    /// Serializes the platform config and every top-level placement. The
    /// snapshot rebuilds into an identical deck through `from_json`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: DeckSnapshot = serde_json::from_str(json)?;
        let mut deck = match snapshot.config {
            PlatformConfig::Rails(config) => Deck::rails(config)?,
            // The snapshot carries its own trash record; don't seat a second.
            PlatformConfig::Slots(config) => Deck::slots_inner(config, false)?,
        };
        for record in snapshot.placements {
            deck.assign(record.resource, record.placement)?;
        }
        Ok(deck)
    }

    fn snapshot(&self) -> DeckSnapshot {
        let config = match &self.scheme {
            Scheme::Rails(scheme) => PlatformConfig::Rails(scheme.config.clone()),
            Scheme::Slots(scheme) => PlatformConfig::Slots(scheme.config().clone()),
        };
        let mut placements = Vec::new();
        for child_id in self.tree.children(self.tree.root()) {
            let placed = self.tree.to_value(*child_id);
            let placement = match &self.scheme {
                Scheme::Rails(scheme) => scheme
                    .rail_of(&placed.resource.name)
                    .map(|rail| Placement::Rail(rail as i32))
                    .unwrap_or(Placement::Location(placed.location)),
                Scheme::Slots(scheme) => scheme
                    .slot_of(&placed.resource.name)
                    .map(Placement::Slot)
                    .unwrap_or(Placement::Location(placed.location)),
            };
            placements.push(PlacementRecord {
                placement,
                resource: placed.resource,
            });
        }
        DeckSnapshot { config, placements }
    }
}

fn type_label(resource: &Resource) -> String {
    resource
        .model
        .clone()
        .unwrap_or_else(|| format!("{:?}", resource.category))
}

#[derive(Debug, Serialize, Deserialize)]
struct DeckSnapshot {
    config: PlatformConfig,
    placements: Vec<PlacementRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PlacementRecord {
    placement: Placement,
    resource: Resource,
}
