pub mod adapters;
pub mod catalog;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::ChatterBackend;
pub use config::{PlatformConfig, RailDeckConfig, SlotDeckConfig};
pub use core::{Deck, LiquidHandler, Placement};
pub use domain::coordinate::Coordinate;
pub use domain::ops::{TipRequest, TransferRequest};
pub use domain::ports::LiquidHandlerBackend;
pub use domain::resource::{Category, Resource};
pub use utils::error::{DeckhandError, Result};
