use crate::domain::coordinate::Coordinate;
use crate::utils::error::{DeckhandError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Deck,
    Carrier,
    CarrierSite,
    TipRack,
    TipSpot,
    Plate,
    Well,
    TubeRack,
    Tube,
    Trash,
    Adapter,
    Generic,
}

/// Uniform 2D item layout of an itemized resource (plate wells, tip spots,
/// tube positions). Items are generated column-major: item `(i, j)` sits at
/// `(dx + i * item_size_x, dy + (num_y - 1 - j) * item_size_y, dz)`, so row A
/// (`j = 0`) is the far row and linear index `i * num_y + j` walks each column
/// top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub num_x: usize,
    pub num_y: usize,
    pub dx: f64,
    pub dy: f64,
    pub item_size_x: f64,
    pub item_size_y: f64,
    pub item_category: Category,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedResource {
    /// Offset relative to the parent resource.
    pub location: Coordinate,
    pub resource: Resource,
}

/// A standalone resource description: one node of labware with its nested
/// children. Values carry no absolute location; they only gain one when
/// attached to a deck tree. Carriers own a fixed set of `CarrierSite`
/// children; itemized resources own their grid items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub model: Option<String>,
    pub size_x: f64,
    pub size_y: f64,
    pub size_z: f64,
    /// Vertical datum of the functional plane: the z of grid items within the
    /// resource, and the seating adjustment applied when the resource is
    /// placed on a carrier site. Negative for tips that hang below the shelf.
    #[serde(default)]
    pub dz: f64,
    #[serde(default)]
    pub grid: Option<GridSpec>,
    #[serde(default)]
    pub children: Vec<PlacedResource>,
}

impl Resource {
    pub fn new(name: &str, category: Category, size_x: f64, size_y: f64, size_z: f64) -> Self {
        Self {
            name: name.to_string(),
            category,
            model: None,
            size_x,
            size_y,
            size_z,
            dz: 0.0,
            grid: None,
            children: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    pub fn with_dz(mut self, dz: f64) -> Self {
        self.dz = dz;
        self
    }

    /// Builds an itemized resource with its grid children pre-populated.
    /// Items are named `"{name}_{label}"` (`"tips_01_A1"`), which keeps them
    /// unique tree-wide as long as parent names are.
    pub fn itemized(
        name: &str,
        category: Category,
        size_x: f64,
        size_y: f64,
        size_z: f64,
        dz: f64,
        grid: GridSpec,
    ) -> Self {
        let mut resource = Resource::new(name, category, size_x, size_y, size_z).with_dz(dz);
        for i in 0..grid.num_x {
            for j in 0..grid.num_y {
                let label = grid_label(i, j);
                let item = Resource::new(
                    &format!("{}_{}", name, label),
                    grid.item_category,
                    grid.item_size_x,
                    grid.item_size_y,
                    0.0,
                );
                let location = Coordinate::new(
                    grid.dx + i as f64 * grid.item_size_x,
                    grid.dy + (grid.num_y - 1 - j) as f64 * grid.item_size_y,
                    dz,
                );
                resource.children.push(PlacedResource {
                    location,
                    resource: item,
                });
            }
        }
        resource.grid = Some(grid);
        resource
    }

    /// All names in this subtree, preorder.
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(&self.name);
        for child in &self.children {
            child.resource.collect_names(out);
        }
    }

    pub fn add_child(&mut self, location: Coordinate, child: Resource) -> Result<()> {
        let existing = self.names();
        for name in child.names() {
            if existing.contains(&name) {
                return Err(DeckhandError::DuplicateNameError(name.to_string()));
            }
        }
        self.children.push(PlacedResource {
            location,
            resource: child,
        });
        Ok(())
    }

    pub fn num_sites(&self) -> usize {
        self.children
            .iter()
            .filter(|c| c.resource.category == Category::CarrierSite)
            .count()
    }

    /// Seats labware on a carrier site. The occupant lands at the site offset
    /// raised by its own `dz` datum, which is how the vendor carrier tables
    /// compose with labware of different functional heights.
    pub fn set_site(&mut self, index: usize, labware: Resource) -> Result<()> {
        if self.category != Category::Carrier {
            return Err(DeckhandError::InvalidOperationError {
                message: format!("'{}' is not a carrier", self.name),
            });
        }
        let num_sites = self.num_sites();
        if index >= num_sites {
            return Err(DeckhandError::InvalidSlotError {
                slot: format!("site {}", index),
                reason: format!("carrier '{}' has {} sites", self.name, num_sites),
            });
        }
        let existing = self.names();
        for name in labware.names() {
            if existing.contains(&name) {
                return Err(DeckhandError::DuplicateNameError(name.to_string()));
            }
        }
        let site = &mut self.children[index];
        if let Some(occupant) = site.resource.children.first() {
            return Err(DeckhandError::OccupiedSlotError {
                slot: format!("site {}", index),
                by: occupant.resource.name.clone(),
            });
        }
        let seat = Coordinate::new(0.0, 0.0, labware.dz);
        site.resource.children.push(PlacedResource {
            location: seat,
            resource: labware,
        });
        Ok(())
    }

    pub fn site_occupant(&self, index: usize) -> Option<&Resource> {
        self.children
            .get(index)
            .filter(|c| c.resource.category == Category::CarrierSite)
            .and_then(|site| site.resource.children.first())
            .map(|placed| &placed.resource)
    }
}

/// `(i, j)` grid position to its `"A1"` style label: row letter from `j`,
/// 1-based column from `i`.
pub fn grid_label(i: usize, j: usize) -> String {
    format!("{}{}", (b'A' + j as u8) as char, i + 1)
}

/// Parses an `"A1"` style label back into `(i, j)`. Context-free: range
/// checks against an actual grid happen at lookup time.
pub fn parse_grid_label(label: &str) -> Result<(usize, usize)> {
    let mut chars = label.chars();
    let row = match chars.next() {
        Some(c @ 'A'..='Z') => (c as u8 - b'A') as usize,
        _ => {
            return Err(DeckhandError::InvalidOperationError {
                message: format!("invalid item label '{}'", label),
            })
        }
    };
    let digits = chars.as_str();
    let column: usize = digits
        .parse()
        .map_err(|_| DeckhandError::InvalidOperationError {
            message: format!("invalid item label '{}'", label),
        })?;
    if column == 0 {
        return Err(DeckhandError::InvalidOperationError {
            message: format!("invalid item label '{}'", label),
        });
    }
    Ok((column - 1, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tip_rack(name: &str) -> Resource {
        Resource::itemized(
            name,
            Category::TipRack,
            122.4,
            82.6,
            20.0,
            -50.5,
            GridSpec {
                num_x: 12,
                num_y: 8,
                dx: 7.2,
                dy: 5.3,
                item_size_x: 9.0,
                item_size_y: 9.0,
                item_category: Category::TipSpot,
            },
        )
    }

    fn carrier(name: &str) -> Resource {
        let mut carrier = Resource::new(name, Category::Carrier, 135.0, 497.0, 130.0);
        for i in 0..5 {
            let site = Resource::new(
                &format!("{}_site_{}", name, i),
                Category::CarrierSite,
                122.4,
                82.6,
                0.0,
            );
            carrier.children.push(PlacedResource {
                location: Coordinate::new(17.9, 82.8 + i as f64 * 96.0, 114.95),
                resource: site,
            });
        }
        carrier
    }

    #[test]
    fn test_grid_labels_round_trip() {
        assert_eq!(grid_label(0, 0), "A1");
        assert_eq!(grid_label(11, 7), "H12");
        assert_eq!(parse_grid_label("A1").unwrap(), (0, 0));
        assert_eq!(parse_grid_label("H12").unwrap(), (11, 7));
        assert!(parse_grid_label("11").is_err());
        assert!(parse_grid_label("A0").is_err());
        assert!(parse_grid_label("A").is_err());
    }

    #[test]
    fn test_itemized_children_are_column_major() {
        let rack = tip_rack("tips");
        assert_eq!(rack.children.len(), 96);
        assert_eq!(rack.children[0].resource.name, "tips_A1");
        assert_eq!(rack.children[7].resource.name, "tips_H1");
        assert_eq!(rack.children[8].resource.name, "tips_A2");
        assert_eq!(rack.children[95].resource.name, "tips_H12");
    }

    #[test]
    fn test_itemized_item_locations() {
        let rack = tip_rack("tips");
        // A1 is the far row of the first column.
        let a1 = &rack.children[0];
        assert_eq!(a1.location, Coordinate::new(7.2, 5.3 + 63.0, -50.5));
        let h1 = &rack.children[7];
        assert_eq!(h1.location, Coordinate::new(7.2, 5.3, -50.5));
        let a12 = &rack.children[88];
        assert_eq!(a12.location, Coordinate::new(7.2 + 99.0, 68.3, -50.5));
    }

    #[test]
    fn test_set_site_seats_with_dz() {
        let mut car = carrier("tip carrier");
        car.set_site(0, tip_rack("tips_01")).unwrap();
        let site = &car.children[0];
        let seated = &site.resource.children[0];
        assert_eq!(seated.resource.name, "tips_01");
        assert_eq!(seated.location, Coordinate::new(0.0, 0.0, -50.5));
    }

    #[test]
    fn test_set_site_rejects_occupied() {
        let mut car = carrier("tip carrier");
        car.set_site(1, tip_rack("tips_01")).unwrap();
        let err = car.set_site(1, tip_rack("tips_02")).unwrap_err();
        assert!(matches!(err, DeckhandError::OccupiedSlotError { .. }));
    }

    #[test]
    fn test_set_site_rejects_out_of_range() {
        let mut car = carrier("tip carrier");
        let err = car.set_site(5, tip_rack("tips_01")).unwrap_err();
        assert!(matches!(err, DeckhandError::InvalidSlotError { .. }));
    }

    #[test]
    fn test_set_site_rejects_duplicate_names() {
        let mut car = carrier("tip carrier");
        car.set_site(0, tip_rack("tips_01")).unwrap();
        let err = car.set_site(1, tip_rack("tips_01")).unwrap_err();
        assert!(matches!(err, DeckhandError::DuplicateNameError(_)));
    }

    #[test]
    fn test_site_occupant() {
        let mut car = carrier("tip carrier");
        car.set_site(2, tip_rack("tips_03")).unwrap();
        assert!(car.site_occupant(0).is_none());
        assert_eq!(car.site_occupant(2).unwrap().name, "tips_03");
        assert!(car.site_occupant(9).is_none());
    }

    #[test]
    fn test_names_cover_subtree() {
        let mut car = carrier("car");
        car.set_site(0, tip_rack("tips")).unwrap();
        let names = car.names();
        assert!(names.contains(&"car"));
        assert!(names.contains(&"car_site_0"));
        assert!(names.contains(&"tips"));
        assert!(names.contains(&"tips_H12"));
    }
}
