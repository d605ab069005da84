use crate::domain::resource::{Category, GridSpec, Resource};

fn plate_96(name: &str, model: &str, size_z: f64, dz: f64) -> Resource {
    Resource::itemized(
        name,
        Category::Plate,
        127.0,
        86.0,
        size_z,
        dz,
        GridSpec {
            num_x: 12,
            num_y: 8,
            dx: 9.5,
            dy: 7.0,
            item_size_x: 9.0,
            item_size_y: 9.0,
            item_category: Category::Well,
        },
    )
    .with_model(model)
}

/// Corning Costar 96 deep well plate, 1ml.
pub fn cos_96_dw_1ml(name: &str) -> Resource {
    plate_96(name, "Cos_96_DW_1mL", 42.0, 1.0)
}

/// Corning Costar 96 deep well plate, 500ul.
pub fn cos_96_dw_500ul(name: &str) -> Resource {
    plate_96(name, "Cos_96_DW_500ul", 27.5, 2.0)
}

/// Corning Costar 96 deep well plate, 2ml.
pub fn cos_96_dw_2ml(name: &str) -> Resource {
    plate_96(name, "Cos_96_DW_2mL", 43.5, 1.0)
}

/// Corning Costar 96 PCR plate.
pub fn cos_96_pcr(name: &str) -> Resource {
    plate_96(name, "Cos_96_PCR", 23.5, 0.5)
}

/// 24-position tube rack.
pub fn tube_rack_24(name: &str) -> Resource {
    Resource::itemized(
        name,
        Category::TubeRack,
        127.0,
        86.0,
        80.0,
        5.0,
        GridSpec {
            num_x: 6,
            num_y: 4,
            dx: 10.0,
            dy: 8.0,
            item_size_x: 18.0,
            item_size_y: 18.0,
            item_category: Category::Tube,
        },
    )
    .with_model("TUBE_RACK_24")
}

/// Passive adapter that raises a plate in a deck slot.
pub fn plate_adapter(name: &str) -> Resource {
    Resource::new(name, Category::Adapter, 127.0, 86.0, 14.0).with_model("PLATE_ADAPTER_A00")
}

pub(crate) fn try_build(model: &str, name: &str) -> Option<Resource> {
    match model {
        "Cos_96_DW_1mL" => Some(cos_96_dw_1ml(name)),
        "Cos_96_DW_500ul" => Some(cos_96_dw_500ul(name)),
        "Cos_96_DW_2mL" => Some(cos_96_dw_2ml(name)),
        "Cos_96_PCR" => Some(cos_96_pcr(name)),
        "TUBE_RACK_24" => Some(tube_rack_24(name)),
        "PLATE_ADAPTER_A00" => Some(plate_adapter(name)),
        _ => None,
    }
}
