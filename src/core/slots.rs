use crate::config::SlotDeckConfig;
use crate::core::tree::{NodeId, ResourceTree};
use crate::domain::coordinate::Coordinate;
use crate::domain::resource::{Category, PlacedResource, Resource};
use crate::utils::error::{DeckhandError, Result};

/// Slot-addressed deck scheme: a fixed table of numbered positions with
/// constant coordinates. A slot holds at most one piece of labware, plus
/// optionally one adapter underneath it; the adapter and the labware are two
/// tree levels but one physical slot, so they are tracked in parallel arrays.
#[derive(Debug)]
pub(crate) struct SlotScheme {
    config: SlotDeckConfig,
    /// Primary labware per slot, parallel to `config.slots`.
    occupants: Vec<Option<String>>,
    /// Adapters seated under the primary labware.
    adapters: Vec<Option<String>>,
}

/// Resolved landing spot for a slot assignment. The parent is the deck root
/// for direct placements and the adapter node when stacking.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SlotPlan {
    pub parent: NodeId,
    pub location: Coordinate,
    index: usize,
    role: SlotRole,
}

#[derive(Debug, Clone, Copy)]
enum SlotRole {
    Adapter,
    Labware,
}

impl SlotScheme {
    pub fn new(config: SlotDeckConfig) -> Self {
        let count = config.num_slots();
        Self {
            config,
            occupants: vec![None; count],
            adapters: vec![None; count],
        }
    }

    pub fn config(&self) -> &SlotDeckConfig {
        &self.config
    }

    fn index_of(&self, number: u32) -> Option<usize> {
        self.config.slots.iter().position(|slot| slot.number == number)
    }

    /// Slot number a top-level resource is seated in, labware or adapter.
    pub fn slot_of(&self, name: &str) -> Option<u32> {
        let position = self
            .occupants
            .iter()
            .position(|entry| entry.as_deref() == Some(name))
            .or_else(|| {
                self.adapters
                    .iter()
                    .position(|entry| entry.as_deref() == Some(name))
            })?;
        Some(self.config.slots[position].number)
    }

    /// Slot number whose coordinate matches `location`, for deserialized
    /// placements recorded by position rather than number.
    pub fn slot_at(&self, location: Coordinate) -> Option<u32> {
        self.config
            .slots
            .iter()
            .find(|slot| Coordinate::new(slot.x, slot.y, slot.z).close_to(location, 1e-6))
            .map(|slot| slot.number)
    }

    pub fn plan(
        &self,
        tree: &ResourceTree,
        resource: &Resource,
        number: u32,
    ) -> Result<SlotPlan> {
        let def = self
            .config
            .slot(number)
            .ok_or_else(|| DeckhandError::InvalidSlotError {
                slot: number.to_string(),
                reason: format!("deck has slots 1 to {}", self.config.num_slots()),
            })?;
        let index = match self.index_of(number) {
            Some(index) => index,
            None => unreachable!("slot def without a table position"),
        };
        if let Some(occupant) = &self.occupants[index] {
            return Err(DeckhandError::OccupiedSlotError {
                slot: format!("slot {}", number),
                by: occupant.clone(),
            });
        }
        if resource.category == Category::Adapter {
            if let Some(adapter) = &self.adapters[index] {
                return Err(DeckhandError::OccupiedSlotError {
                    slot: format!("slot {}", number),
                    by: adapter.clone(),
                });
            }
            return Ok(SlotPlan {
                parent: tree.root(),
                location: Coordinate::new(def.x, def.y, def.z),
                index,
                role: SlotRole::Adapter,
            });
        }
        if let Some(adapter) = &self.adapters[index] {
            // Stack on the adapter already seated here.
            let adapter_id = match tree.find(adapter) {
                Some(id) => id,
                None => unreachable!("tracked adapter is not attached"),
            };
            let height = tree.resource(adapter_id).size_z;
            return Ok(SlotPlan {
                parent: adapter_id,
                location: Coordinate::new(0.0, 0.0, height),
                index,
                role: SlotRole::Labware,
            });
        }
        Ok(SlotPlan {
            parent: tree.root(),
            location: Coordinate::new(def.x, def.y, def.z),
            index,
            role: SlotRole::Labware,
        })
    }

    /// Records a successful attach. `stacked` carries the name of labware
    /// nested inside an assigned adapter, so deserialized stacks keep both
    /// entries.
    pub fn commit(&mut self, plan: &SlotPlan, name: String, stacked: Option<String>) {
        match plan.role {
            SlotRole::Adapter => {
                self.adapters[plan.index] = Some(name);
                if stacked.is_some() {
                    self.occupants[plan.index] = stacked;
                }
            }
            SlotRole::Labware => {
                self.occupants[plan.index] = Some(name);
            }
        }
    }

    /// Clears the bookkeeping for a detached resource. Rejects removing an
    /// adapter that still carries labware. Names not tracked here (nested
    /// resources) pass through untouched.
    pub fn release(&mut self, name: &str) -> Result<()> {
        for index in 0..self.adapters.len() {
            if self.adapters[index].as_deref() == Some(name) {
                if let Some(occupant) = &self.occupants[index] {
                    return Err(DeckhandError::InvalidOperationError {
                        message: format!(
                            "adapter '{}' still carries '{}'; unassign that first",
                            name, occupant
                        ),
                    });
                }
                self.adapters[index] = None;
                return Ok(());
            }
        }
        for entry in self.occupants.iter_mut() {
            if entry.as_deref() == Some(name) {
                *entry = None;
                return Ok(());
            }
        }
        Ok(())
    }

    /// ASCII grid in the vendor tool's layout: rows top to bottom, main
    /// columns left of the staging column, numeric slot ids.
    pub fn summary(&self) -> String {
        let border = format!("+{}\n", "-----------------+".repeat(4));
        let pad = format!("|{}\n", "                 |".repeat(4));
        let mut out = String::new();
        out.push('\n');
        out.push_str(&format!(
            "Deck: {}mm x {}mm\n\n",
            self.config.size_x, self.config.size_y
        ));
        out.push_str(&border);
        for row in (0..4u32).rev() {
            let numbers = [3 * row + 1, 3 * row + 2, 3 * row + 3, 16 - row];
            out.push_str(&pad);
            out.push('|');
            for number in numbers {
                out.push_str(&format!(" {:>2}: {:<11} |", number, self.cell_name(number)));
            }
            out.push('\n');
            out.push_str(&pad);
            out.push_str(&border);
        }
        out
    }

    fn cell_name(&self, number: u32) -> String {
        let name = self
            .index_of(number)
            .and_then(|index| {
                self.occupants[index]
                    .as_deref()
                    .or(self.adapters[index].as_deref())
            })
            .unwrap_or("Empty");
        if name.chars().count() > 10 {
            let head: String = name.chars().take(8).collect();
            format!("{}...", head)
        } else {
            name.to_string()
        }
    }
}

/// The factory trash: a plain container holding the actual trash area at its
/// origin, so backends always see a parented resource when discarding tips.
pub(crate) fn trash_container() -> Resource {
    let mut container = Resource::new("trash_container", Category::Generic, 172.86, 165.86, 82.0);
    container.children.push(PlacedResource {
        location: Coordinate::ZERO,
        resource: Resource::new("trash", Category::Trash, 172.86, 165.86, 82.0),
    });
    container
}

/// Number of a main-grid slot (columns 1 to 3): `3 * row + column` with rows
/// A=0 through D=3, so A1 is 1 and D3 is 12.
pub fn main_slot_number(row: u32, column: u32) -> Option<u32> {
    if row > 3 || column < 1 || column > 3 {
        return None;
    }
    Some(3 * row + column)
}

/// Number of a staging slot (column 4). Staging slots count downward from
/// the top of the deck: `16 - row`, so D4 is 13 and A4 is 16. This is not
/// the main-grid arithmetic; the two column families use different rules.
pub fn staging_slot_number(row: u32) -> Option<u32> {
    if row > 3 {
        return None;
    }
    Some(16 - row)
}

/// `"C2"` style label to slot number on the standard 16-slot table.
pub fn label_to_number(label: &str) -> Result<u32> {
    let invalid = || DeckhandError::InvalidSlotError {
        slot: label.to_string(),
        reason: "expected a row letter A-D and a column 1-4".to_string(),
    };
    let mut chars = label.chars();
    let row = match chars.next() {
        Some(c @ 'A'..='D') => (c as u8 - b'A') as u32,
        _ => return Err(invalid()),
    };
    let column: u32 = chars.as_str().parse().map_err(|_| invalid())?;
    if column == 4 {
        return staging_slot_number(row).ok_or_else(invalid);
    }
    main_slot_number(row, column).ok_or_else(invalid)
}

/// Slot number back to its `"C2"` style label.
pub fn number_to_label(number: u32) -> Result<String> {
    let (row, column) = match number {
        1..=12 => ((number - 1) / 3, (number - 1) % 3 + 1),
        13..=16 => (16 - number, 4),
        _ => {
            return Err(DeckhandError::InvalidSlotError {
                slot: number.to_string(),
                reason: "deck has slots 1 to 16".to_string(),
            })
        }
    };
    Ok(format!("{}{}", (b'A' + row as u8) as char, column))
}
