use crate::domain::coordinate::Coordinate;
use serde::{Deserialize, Serialize};

/// A resolved reference to an attached resource, as handed to backends:
/// the tree name, the owning labware (for wells and tip spots), and the
/// absolute deck coordinate at dispatch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub name: String,
    pub parent: Option<String>,
    pub location: Coordinate,
}

/// Caller-side tip target, by name. One per channel.
#[derive(Debug, Clone)]
pub struct TipRequest {
    pub spot: String,
    pub offset: Option<Coordinate>,
}

impl TipRequest {
    pub fn new(spot: &str) -> Self {
        Self {
            spot: spot.to_string(),
            offset: None,
        }
    }
}

impl From<&str> for TipRequest {
    fn from(spot: &str) -> Self {
        TipRequest::new(spot)
    }
}

/// Caller-side liquid target, by name. One per channel.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub well: String,
    pub volume: f64,
    pub offset: Option<Coordinate>,
    pub flow_rate: Option<f64>,
}

impl TransferRequest {
    pub fn new(well: &str, volume: f64) -> Self {
        Self {
            well: well.to_string(),
            volume,
            offset: None,
            flow_rate: None,
        }
    }

    pub fn with_flow_rate(mut self, flow_rate: f64) -> Self {
        self.flow_rate = Some(flow_rate);
        self
    }

    pub fn with_offset(mut self, offset: Coordinate) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupOp {
    pub target: ResourceRef,
    pub offset: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropOp {
    pub target: ResourceRef,
    pub offset: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspirateOp {
    pub target: ResourceRef,
    pub volume: f64,
    pub offset: Option<Coordinate>,
    pub flow_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispenseOp {
    pub target: ResourceRef,
    pub volume: f64,
    pub offset: Option<Coordinate>,
    pub flow_rate: Option<f64>,
}

/// Whole-rack tip operation for 96-channel heads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rack96Op {
    pub rack: ResourceRef,
    pub offset: Option<Coordinate>,
}

/// Whole-plate liquid operation for 96-channel heads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plate96Op {
    pub plate: ResourceRef,
    pub volume: f64,
    pub offset: Option<Coordinate>,
    pub flow_rate: Option<f64>,
}

/// Gripper move of an attached resource to a new absolute location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveOp {
    pub resource: ResourceRef,
    pub destination: Coordinate,
    pub pickup_offset: Option<Coordinate>,
    pub drop_offset: Option<Coordinate>,
}
