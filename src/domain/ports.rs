use crate::domain::coordinate::Coordinate;
use crate::domain::ops::{
    AspirateOp, DispenseOp, DropOp, MoveOp, PickupOp, Plate96Op, Rack96Op,
};
use crate::domain::resource::Resource;
use crate::utils::error::{DeckhandError, Result};
use async_trait::async_trait;

/// Capability surface a hardware backend offers to the orchestrator.
///
/// Channel operations receive one descriptor per channel plus the physical
/// channel indices to use, in the same order. The 96-head and gripper methods
/// have default implementations that report the capability as unsupported, so
/// a backend only overrides what its hardware can do.
#[async_trait]
pub trait LiquidHandlerBackend: Send + Sync {
    async fn setup(&mut self) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;

    fn num_channels(&self) -> usize;

    /// Called after a resource has been attached to the deck tree.
    async fn assigned_resource_callback(
        &mut self,
        _resource: &Resource,
        _location: Coordinate,
    ) -> Result<()> {
        Ok(())
    }

    /// Called after a resource has been detached from the deck tree.
    async fn unassigned_resource_callback(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn pick_up_tips(&mut self, ops: &[PickupOp], use_channels: &[usize]) -> Result<()>;

    async fn drop_tips(&mut self, ops: &[DropOp], use_channels: &[usize]) -> Result<()>;

    async fn aspirate(&mut self, ops: &[AspirateOp], use_channels: &[usize]) -> Result<()>;

    async fn dispense(&mut self, ops: &[DispenseOp], use_channels: &[usize]) -> Result<()>;

    async fn pick_up_tips96(&mut self, _op: &Rack96Op) -> Result<()> {
        Err(DeckhandError::UnsupportedOperationError(
            "pick_up_tips96".to_string(),
        ))
    }

    async fn drop_tips96(&mut self, _op: &Rack96Op) -> Result<()> {
        Err(DeckhandError::UnsupportedOperationError(
            "drop_tips96".to_string(),
        ))
    }

    async fn aspirate96(&mut self, _op: &Plate96Op) -> Result<()> {
        Err(DeckhandError::UnsupportedOperationError(
            "aspirate96".to_string(),
        ))
    }

    async fn dispense96(&mut self, _op: &Plate96Op) -> Result<()> {
        Err(DeckhandError::UnsupportedOperationError(
            "dispense96".to_string(),
        ))
    }

    async fn move_resource(&mut self, _op: &MoveOp) -> Result<()> {
        Err(DeckhandError::UnsupportedOperationError(
            "move_resource".to_string(),
        ))
    }
}
