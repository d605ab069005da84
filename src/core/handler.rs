use crate::core::deck::{Deck, Placement};
use crate::core::layout;
use crate::core::tree::ResourceNode;
use crate::domain::coordinate::Coordinate;
use crate::domain::ops::{
    AspirateOp, DispenseOp, DropOp, MoveOp, PickupOp, Plate96Op, Rack96Op, ResourceRef,
    TipRequest, TransferRequest,
};
use crate::domain::ports::LiquidHandlerBackend;
use crate::domain::resource::{Category, Resource};
use crate::utils::error::{DeckhandError, Result};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandlerState {
    Unconfigured,
    Ready,
}

/// Orchestration facade bound to one deck and one backend.
///
/// All tree mutations go through here so the backend always hears about them:
/// placement is validated first, the tree mutates, and only then is the
/// backend notified. Physical operations resolve resource names to absolute
/// coordinates and forward descriptor batches; which channel hardware
/// ultimately satisfies an operation is the backend's decision alone.
///
/// Every mutating method takes `&mut self`, which gives each handler instance
/// the single-caller discipline the tree needs without any locking.
pub struct LiquidHandler<B: LiquidHandlerBackend> {
    deck: Deck,
    backend: B,
    state: HandlerState,
}

impl<B: LiquidHandlerBackend> LiquidHandler<B> {
    pub fn new(deck: Deck, backend: B) -> Self {
        Self {
            deck,
            backend,
            state: HandlerState::Unconfigured,
        }
    }

    /// Brings the backend up and enters the ready state. Setting up a handler
    /// that is already ready is a usage error, not a no-op.
    pub async fn setup(&mut self) -> Result<()> {
        if self.state == HandlerState::Ready {
            return Err(DeckhandError::StateError {
                message: "handler is already set up".to_string(),
            });
        }
        self.backend.setup().await?;
        self.state = HandlerState::Ready;
        tracing::info!(
            deck = %self.deck.name(),
            channels = self.backend.num_channels(),
            "liquid handler ready"
        );
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if self.state == HandlerState::Unconfigured {
            return Err(DeckhandError::StateError {
                message: "handler is not set up".to_string(),
            });
        }
        self.backend.stop().await?;
        self.state = HandlerState::Unconfigured;
        tracing::info!("liquid handler stopped");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.state == HandlerState::Ready
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn num_channels(&self) -> usize {
        self.backend.num_channels()
    }

    fn require_ready(&self) -> Result<()> {
        if self.state != HandlerState::Ready {
            return Err(DeckhandError::StateError {
                message: "physical operations require setup() first".to_string(),
            });
        }
        Ok(())
    }

    /// Attaches a resource to the deck and notifies the backend. With
    /// `replace` set, an already-attached resource of the same name is fully
    /// unassigned first (its callback fires) before the new placement is
    /// validated; without it, a name collision fails the assignment.
    ///
    /// The tree mutation and the backend callback are deliberately not
    /// atomic: a callback failure surfaces as the operation's failure, but
    /// the resource stays attached, since the local tree had already
    /// committed by the time the backend was told.
    pub async fn assign_resource(
        &mut self,
        resource: Resource,
        placement: Placement,
        replace: bool,
    ) -> Result<Coordinate> {
        if replace && self.deck.contains(&resource.name) {
            self.unassign_resource(&resource.name).await?;
        }
        let snapshot = resource.clone();
        let location = self.deck.assign(resource, placement)?;
        tracing::info!(
            resource = %snapshot.name,
            placement = ?placement,
            location = %location,
            "assigned resource"
        );
        self.backend
            .assigned_resource_callback(&snapshot, location)
            .await?;
        Ok(location)
    }

    /// Detaches the named resource, notifies the backend, and returns
    /// ownership of the standalone value to the caller. Unlike
    /// `get_resource`, absence here is a hard `NotFoundError` — calling this
    /// twice for the same name fails the second time.
    pub async fn unassign_resource(&mut self, name: &str) -> Result<Resource> {
        let resource = self.deck.unassign(name)?;
        tracing::info!(resource = %name, "unassigned resource");
        self.backend.unassigned_resource_callback(name).await?;
        Ok(resource)
    }

    /// Tree-wide lookup. Absence is an ordinary `None`; only `unassign`
    /// treats a missing name as an error.
    pub fn get_resource(&self, name: &str) -> Option<ResourceNode<'_>> {
        self.deck.get(name)
    }

    /// Human-readable deck rendering. Usage error when nothing is assigned.
    pub fn summary(&self) -> Result<String> {
        if self.deck.num_assigned() == 0 {
            return Err(DeckhandError::InvalidOperationError {
                message: "deck is empty; assign a resource first".to_string(),
            });
        }
        Ok(self.deck.summary())
    }

    /// Imports a vendor layout file from disk. See [`load_layout`].
    ///
    /// [`load_layout`]: LiquidHandler::load_layout
    pub async fn load_layout_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let content = std::fs::read_to_string(path.as_ref())?;
        self.load_layout(&content).await
    }

    /// Imports a vendor layout description: reconstructs every carrier with
    /// its seated labware and assigns them through the normal path, so the
    /// backend sees one assignment callback per carrier. The whole file is
    /// parsed and validated against the live deck before anything is
    /// attached; a malformed record or conflict leaves the deck untouched.
    pub async fn load_layout(&mut self, content: &str) -> Result<()> {
        let staged = layout::stage(content, &self.deck)?;
        tracing::info!(carriers = staged.len(), "importing deck layout");
        for entry in staged {
            self.assign_resource(entry.resource, Placement::Rail(entry.rail), false)
                .await?;
        }
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<ResourceRef> {
        let node = self
            .deck
            .get(name)
            .ok_or_else(|| DeckhandError::NotFoundError(name.to_string()))?;
        Ok(ResourceRef {
            name: node.name().to_string(),
            parent: node.parent().map(|parent| parent.name().to_string()),
            location: node.absolute_location(),
        })
    }

    /// Resolves a whole-rack/plate reference for the 96-channel head: the
    /// resource must carry a full 96-item grid of the expected category.
    fn resolve_grid96(&self, name: &str, category: Category) -> Result<ResourceRef> {
        let node = self
            .deck
            .get(name)
            .ok_or_else(|| DeckhandError::NotFoundError(name.to_string()))?;
        if node.category() != category {
            return Err(DeckhandError::InvalidOperationError {
                message: format!(
                    "'{}' is a {:?}, expected a {:?}",
                    name,
                    node.category(),
                    category
                ),
            });
        }
        let items = node
            .resource()
            .grid
            .as_ref()
            .map(|grid| grid.num_x * grid.num_y)
            .unwrap_or(0);
        if items != 96 {
            return Err(DeckhandError::InvalidOperationError {
                message: format!("'{}' has {} items, the 96 head needs 96", name, items),
            });
        }
        Ok(ResourceRef {
            name: node.name().to_string(),
            parent: node.parent().map(|parent| parent.name().to_string()),
            location: node.absolute_location(),
        })
    }

    /// Validates the channel set for a batch of `count` operations. Callers
    /// that pass `None` get the first `count` channels in order.
    fn channels_for(&self, count: usize, use_channels: Option<&[usize]>) -> Result<Vec<usize>> {
        let channels: Vec<usize> = match use_channels {
            Some(channels) => channels.to_vec(),
            None => (0..count).collect(),
        };
        if channels.len() != count {
            return Err(DeckhandError::InvalidOperationError {
                message: format!(
                    "{} channels given for {} operations",
                    channels.len(),
                    count
                ),
            });
        }
        let available = self.backend.num_channels();
        let mut seen = HashSet::new();
        for &channel in &channels {
            if channel >= available {
                return Err(DeckhandError::InvalidOperationError {
                    message: format!(
                        "channel {} out of range, backend has {}",
                        channel, available
                    ),
                });
            }
            if !seen.insert(channel) {
                return Err(DeckhandError::InvalidOperationError {
                    message: format!("channel {} used twice", channel),
                });
            }
        }
        Ok(channels)
    }

    /// Picks up one tip per request, one request per channel. Requests are
    /// resolved to absolute tip-spot coordinates before dispatch; tip state
    /// and channel capability are the backend's concern.
    pub async fn pick_up_tips(
        &mut self,
        requests: &[TipRequest],
        use_channels: Option<&[usize]>,
    ) -> Result<()> {
        self.require_ready()?;
        if requests.is_empty() {
            return Err(DeckhandError::InvalidOperationError {
                message: "no tip spots requested".to_string(),
            });
        }
        let channels = self.channels_for(requests.len(), use_channels)?;
        let mut ops = Vec::with_capacity(requests.len());
        for request in requests {
            ops.push(PickupOp {
                target: self.resolve(&request.spot)?,
                offset: request.offset,
            });
        }
        tracing::debug!(count = ops.len(), channels = ?channels, "dispatching tip pickup");
        self.backend.pick_up_tips(&ops, &channels).await
    }

    pub async fn drop_tips(
        &mut self,
        requests: &[TipRequest],
        use_channels: Option<&[usize]>,
    ) -> Result<()> {
        self.require_ready()?;
        if requests.is_empty() {
            return Err(DeckhandError::InvalidOperationError {
                message: "no tip spots requested".to_string(),
            });
        }
        let channels = self.channels_for(requests.len(), use_channels)?;
        let mut ops = Vec::with_capacity(requests.len());
        for request in requests {
            ops.push(DropOp {
                target: self.resolve(&request.spot)?,
                offset: request.offset,
            });
        }
        tracing::debug!(count = ops.len(), channels = ?channels, "dispatching tip drop");
        self.backend.drop_tips(&ops, &channels).await
    }

    pub async fn aspirate(
        &mut self,
        requests: &[TransferRequest],
        use_channels: Option<&[usize]>,
    ) -> Result<()> {
        self.require_ready()?;
        if requests.is_empty() {
            return Err(DeckhandError::InvalidOperationError {
                message: "no wells requested".to_string(),
            });
        }
        let channels = self.channels_for(requests.len(), use_channels)?;
        let mut ops = Vec::with_capacity(requests.len());
        for request in requests {
            ops.push(AspirateOp {
                target: self.resolve(&request.well)?,
                volume: request.volume,
                offset: request.offset,
                flow_rate: request.flow_rate,
            });
        }
        tracing::debug!(count = ops.len(), channels = ?channels, "dispatching aspirate");
        self.backend.aspirate(&ops, &channels).await
    }

    pub async fn dispense(
        &mut self,
        requests: &[TransferRequest],
        use_channels: Option<&[usize]>,
    ) -> Result<()> {
        self.require_ready()?;
        if requests.is_empty() {
            return Err(DeckhandError::InvalidOperationError {
                message: "no wells requested".to_string(),
            });
        }
        let channels = self.channels_for(requests.len(), use_channels)?;
        let mut ops = Vec::with_capacity(requests.len());
        for request in requests {
            ops.push(DispenseOp {
                target: self.resolve(&request.well)?,
                volume: request.volume,
                offset: request.offset,
                flow_rate: request.flow_rate,
            });
        }
        tracing::debug!(count = ops.len(), channels = ?channels, "dispatching dispense");
        self.backend.dispense(&ops, &channels).await
    }

    /// Whole-rack pickup with the 96 head. Backends without one fail with
    /// `UnsupportedOperationError` through the port's default method.
    pub async fn pick_up_tips96(&mut self, rack: &str) -> Result<()> {
        self.require_ready()?;
        let op = Rack96Op {
            rack: self.resolve_grid96(rack, Category::TipRack)?,
            offset: None,
        };
        tracing::debug!(rack = %rack, "dispatching 96 head tip pickup");
        self.backend.pick_up_tips96(&op).await
    }

    pub async fn drop_tips96(&mut self, rack: &str) -> Result<()> {
        self.require_ready()?;
        let op = Rack96Op {
            rack: self.resolve_grid96(rack, Category::TipRack)?,
            offset: None,
        };
        tracing::debug!(rack = %rack, "dispatching 96 head tip drop");
        self.backend.drop_tips96(&op).await
    }

    /// Aspirates `volume` microliters from every well of a 96-well plate.
    pub async fn aspirate96(&mut self, plate: &str, volume: f64) -> Result<()> {
        self.require_ready()?;
        let op = Plate96Op {
            plate: self.resolve_grid96(plate, Category::Plate)?,
            volume,
            offset: None,
            flow_rate: None,
        };
        tracing::debug!(plate = %plate, volume, "dispatching 96 head aspirate");
        self.backend.aspirate96(&op).await
    }

    pub async fn dispense96(&mut self, plate: &str, volume: f64) -> Result<()> {
        self.require_ready()?;
        let op = Plate96Op {
            plate: self.resolve_grid96(plate, Category::Plate)?,
            volume,
            offset: None,
            flow_rate: None,
        };
        tracing::debug!(plate = %plate, volume, "dispatching 96 head dispense");
        self.backend.dispense96(&op).await
    }

    /// Gripper-moves a deck-level resource to a new placement. The backend
    /// performs the physical motion first; only on success is the tree
    /// re-homed through a detach and re-attach, with both mutation callbacks
    /// firing so backend labware registries stay current. On a failed motion
    /// the resource keeps its old placement.
    ///
    /// Resources seated on a carrier or an adapter cannot be moved this way;
    /// unassign them and assign the new arrangement instead.
    pub async fn move_resource(&mut self, name: &str, placement: Placement) -> Result<Coordinate> {
        self.require_ready()?;
        let (source, old_placement) = {
            let node = self
                .deck
                .get(name)
                .ok_or_else(|| DeckhandError::NotFoundError(name.to_string()))?;
            let deck_level = node
                .parent()
                .map(|parent| parent.parent().is_none())
                .unwrap_or(false);
            if !deck_level {
                return Err(DeckhandError::InvalidOperationError {
                    message: format!("'{}' is nested; only deck-level resources move", name),
                });
            }
            let source = ResourceRef {
                name: node.name().to_string(),
                parent: node.parent().map(|parent| parent.name().to_string()),
                location: node.absolute_location(),
            };
            let old_placement = self
                .deck
                .rail_of(name)
                .map(|rail| Placement::Rail(rail as i32))
                .or_else(|| self.deck.slot_of(name).map(Placement::Slot))
                .unwrap_or(Placement::Location(node.location()));
            (source, old_placement)
        };

        // Free the old placement first so a move within the same rail span
        // does not collide with itself, then validate the destination.
        let resource = self.deck.unassign(name)?;
        let destination = match self.deck.preview(&resource, placement) {
            Ok(destination) => destination,
            Err(err) => {
                self.deck.assign(resource, old_placement)?;
                return Err(err);
            }
        };
        let op = MoveOp {
            resource: source,
            destination,
            pickup_offset: None,
            drop_offset: None,
        };
        if let Err(err) = self.backend.move_resource(&op).await {
            self.deck.assign(resource, old_placement)?;
            return Err(err);
        }
        // Physical motion succeeded: commit the tree, then tell the backend.
        let snapshot = resource.clone();
        let location = self.deck.assign(resource, placement)?;
        tracing::info!(resource = %name, to = %location, "moved resource");
        self.backend.unassigned_resource_callback(name).await?;
        self.backend
            .assigned_resource_callback(&snapshot, location)
            .await?;
        Ok(location)
    }
}
