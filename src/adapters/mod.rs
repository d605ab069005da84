// Adapters layer: concrete backend implementations behind the
// LiquidHandlerBackend port. Hardware drivers plug in alongside the
// simulator.

pub mod chatter;

pub use chatter::ChatterBackend;
