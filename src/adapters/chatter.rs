use crate::domain::coordinate::Coordinate;
use crate::domain::ops::{
    AspirateOp, DispenseOp, DropOp, MoveOp, PickupOp, Plate96Op, Rack96Op,
};
use crate::domain::ports::LiquidHandlerBackend;
use crate::domain::resource::Resource;
use crate::utils::error::Result;

/// Backend that narrates every command instead of driving hardware. Useful
/// for dry-running protocols and as the reference implementation of the full
/// port surface, 96 head and gripper included. Messages are logged and kept
/// in an in-memory transcript for inspection.
pub struct ChatterBackend {
    channels: usize,
    history: Vec<String>,
}

impl ChatterBackend {
    pub fn new() -> Self {
        Self::with_channels(8)
    }

    pub fn with_channels(channels: usize) -> Self {
        Self {
            channels,
            history: Vec::new(),
        }
    }

    /// Everything the backend has said so far, in order.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    fn say(&mut self, message: String) {
        tracing::info!("{}", message);
        self.history.push(message);
    }
}

impl Default for ChatterBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LiquidHandlerBackend for ChatterBackend {
    async fn setup(&mut self) -> Result<()> {
        self.say("Setting up the robot.".to_string());
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.say("Stopping the robot.".to_string());
        Ok(())
    }

    fn num_channels(&self) -> usize {
        self.channels
    }

    async fn assigned_resource_callback(
        &mut self,
        resource: &Resource,
        location: Coordinate,
    ) -> Result<()> {
        self.say(format!(
            "Resource {} was assigned to the robot at {}.",
            resource.name, location
        ));
        Ok(())
    }

    async fn unassigned_resource_callback(&mut self, name: &str) -> Result<()> {
        self.say(format!("Resource {} was unassigned from the robot.", name));
        Ok(())
    }

    async fn pick_up_tips(&mut self, ops: &[PickupOp], use_channels: &[usize]) -> Result<()> {
        let spots: Vec<&str> = ops.iter().map(|op| op.target.name.as_str()).collect();
        self.say(format!(
            "Picking up tips {:?} with channels {:?}.",
            spots, use_channels
        ));
        Ok(())
    }

    async fn drop_tips(&mut self, ops: &[DropOp], use_channels: &[usize]) -> Result<()> {
        let spots: Vec<&str> = ops.iter().map(|op| op.target.name.as_str()).collect();
        self.say(format!(
            "Dropping tips {:?} with channels {:?}.",
            spots, use_channels
        ));
        Ok(())
    }

    async fn aspirate(&mut self, ops: &[AspirateOp], use_channels: &[usize]) -> Result<()> {
        let wells: Vec<String> = ops
            .iter()
            .map(|op| format!("{}ul from {}", op.volume, op.target.name))
            .collect();
        self.say(format!(
            "Aspirating {:?} with channels {:?}.",
            wells, use_channels
        ));
        Ok(())
    }

    async fn dispense(&mut self, ops: &[DispenseOp], use_channels: &[usize]) -> Result<()> {
        let wells: Vec<String> = ops
            .iter()
            .map(|op| format!("{}ul to {}", op.volume, op.target.name))
            .collect();
        self.say(format!(
            "Dispensing {:?} with channels {:?}.",
            wells, use_channels
        ));
        Ok(())
    }

    async fn pick_up_tips96(&mut self, op: &Rack96Op) -> Result<()> {
        self.say(format!("Picking up tips from {}.", op.rack.name));
        Ok(())
    }

    async fn drop_tips96(&mut self, op: &Rack96Op) -> Result<()> {
        self.say(format!("Dropping tips to {}.", op.rack.name));
        Ok(())
    }

    async fn aspirate96(&mut self, op: &Plate96Op) -> Result<()> {
        self.say(format!(
            "Aspirating {}ul from every well of {}.",
            op.volume, op.plate.name
        ));
        Ok(())
    }

    async fn dispense96(&mut self, op: &Plate96Op) -> Result<()> {
        self.say(format!(
            "Dispensing {}ul to every well of {}.",
            op.volume, op.plate.name
        ));
        Ok(())
    }

    async fn move_resource(&mut self, op: &MoveOp) -> Result<()> {
        self.say(format!(
            "Moving {} from {} to {}.",
            op.resource.name, op.resource.location, op.destination
        ));
        Ok(())
    }
}
