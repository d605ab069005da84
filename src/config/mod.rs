use crate::utils::error::{DeckhandError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Platform geometry for a rail-addressed deck (STAR class machines).
/// Carrier placement arithmetic never hard-codes these numbers; everything
/// comes through this struct so an unusual machine can override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RailDeckConfig {
    pub name: String,
    pub size_x: f64,
    pub size_y: f64,
    pub size_z: f64,
    pub num_rails: u32,
    pub rail_pitch: f64,
    pub first_rail_x: f64,
    pub carrier_y: f64,
    pub carrier_z: f64,
}

impl RailDeckConfig {
    /// Thirty-rail deck with the standard 22.5 mm pitch.
    pub fn star() -> Self {
        Self {
            name: "deck".to_string(),
            size_x: 1360.0,
            size_y: 653.5,
            size_z: 900.0,
            num_rails: 30,
            rail_pitch: 22.5,
            first_rail_x: 100.0,
            carrier_y: 63.0,
            carrier_z: 100.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(DeckhandError::ConfigError {
                message: "deck.name must not be empty".to_string(),
            });
        }
        if self.num_rails == 0 {
            return Err(DeckhandError::ConfigError {
                message: "deck.num_rails must be at least 1".to_string(),
            });
        }
        if self.rail_pitch <= 0.0 {
            return Err(DeckhandError::ConfigError {
                message: format!("deck.rail_pitch must be positive, got {}", self.rail_pitch),
            });
        }
        if self.size_x <= 0.0 || self.size_y <= 0.0 || self.size_z <= 0.0 {
            return Err(DeckhandError::ConfigError {
                message: "deck dimensions must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for RailDeckConfig {
    fn default() -> Self {
        Self::star()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDef {
    pub number: u32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Platform geometry for a slot-addressed deck (Flex class machines):
/// a fixed table of numbered slots plus the built-in trash position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDeckConfig {
    pub name: String,
    pub size_x: f64,
    pub size_y: f64,
    pub size_z: f64,
    pub slots: Vec<SlotDef>,
    /// Skip the factory trash container (useful for staging decks and tests).
    #[serde(default)]
    pub no_trash: bool,
    pub trash_slot: u32,
}

impl SlotDeckConfig {
    /// Sixteen-slot deck: twelve main slots in a 4x3 grid plus the raised
    /// staging column.
    pub fn flex() -> Self {
        let column_x = [0.0, 132.5, 265.0];
        let row_y = [0.0, 90.5, 181.0, 271.5]; // A near edge, D far edge
        let mut slots = Vec::with_capacity(16);
        for (row, y) in row_y.iter().enumerate() {
            for (col, x) in column_x.iter().enumerate() {
                slots.push(SlotDef {
                    number: (3 * row + col + 1) as u32,
                    x: *x,
                    y: *y,
                    z: 0.0,
                });
            }
        }
        // Staging column: numbered top to bottom (D4 is 13, A4 is 16).
        for (row, y) in row_y.iter().enumerate() {
            slots.push(SlotDef {
                number: (16 - row) as u32,
                x: 397.5,
                y: *y,
                z: 14.51,
            });
        }
        slots.sort_by_key(|slot| slot.number);
        Self {
            name: "deck".to_string(),
            size_x: 624.3,
            size_y: 565.2,
            size_z: 900.0,
            slots,
            no_trash: false,
            trash_slot: 10,
        }
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, number: u32) -> Option<&SlotDef> {
        self.slots.iter().find(|slot| slot.number == number)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(DeckhandError::ConfigError {
                message: "deck.name must not be empty".to_string(),
            });
        }
        if self.slots.is_empty() {
            return Err(DeckhandError::ConfigError {
                message: "deck.slots must not be empty".to_string(),
            });
        }
        for slot in &self.slots {
            let count = self
                .slots
                .iter()
                .filter(|other| other.number == slot.number)
                .count();
            if count > 1 {
                return Err(DeckhandError::ConfigError {
                    message: format!("deck.slots: slot number {} appears {} times", slot.number, count),
                });
            }
        }
        if !self.no_trash && self.slot(self.trash_slot).is_none() {
            return Err(DeckhandError::ConfigError {
                message: format!("deck.trash_slot {} is not in the slot table", self.trash_slot),
            });
        }
        Ok(())
    }
}

impl Default for SlotDeckConfig {
    fn default() -> Self {
        Self::flex()
    }
}

/// Top-level platform file: exactly one deck flavor, selected by the
/// `platform` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum PlatformConfig {
    Rails(RailDeckConfig),
    Slots(SlotDeckConfig),
}

impl PlatformConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DeckhandError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DeckhandError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            PlatformConfig::Rails(config) => config.validate(),
            PlatformConfig::Slots(config) => config.validate(),
        }
    }
}
