// Compact labware catalog: the geometry tables the layout importer and the
// integration fixtures rely on. Definitions are data; nothing here contains
// placement logic.

pub mod carriers;
pub mod plates;
pub mod tip_racks;

use crate::domain::resource::Resource;
use crate::utils::error::{DeckhandError, Result};

/// Builds a labware instance if the model is known. The importer uses this
/// form so unknown vendor furniture can be skipped instead of failing.
pub fn try_build(model: &str, name: &str) -> Option<Resource> {
    carriers::try_build(model, name)
        .or_else(|| tip_racks::try_build(model, name))
        .or_else(|| plates::try_build(model, name))
}

pub fn build(model: &str, name: &str) -> Result<Resource> {
    try_build(model, name).ok_or_else(|| DeckhandError::UnknownModelError(model.to_string()))
}

pub fn is_known(model: &str) -> bool {
    try_build(model, "probe").is_some()
}
