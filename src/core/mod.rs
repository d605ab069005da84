pub mod deck;
pub mod handler;
pub mod layout;
pub mod slots;
pub mod tree;

pub use crate::domain::ports::LiquidHandlerBackend;
pub use crate::utils::error::Result;
pub use deck::{Deck, Placement};
pub use handler::LiquidHandler;
pub use tree::{NodeId, ResourceNode, ResourceTree};
