// Domain layer: spatial model and ports (interfaces). No deps beyond std/serde.

pub mod coordinate;
pub mod ops;
pub mod ports;
pub mod resource;

pub use coordinate::Coordinate;
pub use ports::LiquidHandlerBackend;
pub use resource::{Category, GridSpec, PlacedResource, Resource};
