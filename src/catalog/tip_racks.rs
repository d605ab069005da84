use crate::domain::resource::{Category, GridSpec, Resource};

fn rack_96(name: &str, model: &str, dz: f64) -> Resource {
    Resource::itemized(
        name,
        Category::TipRack,
        122.4,
        82.6,
        20.0,
        dz,
        GridSpec {
            num_x: 12,
            num_y: 8,
            dx: 7.2,
            dy: 5.3,
            item_size_x: 9.0,
            item_size_y: 9.0,
            item_category: Category::TipSpot,
        },
    )
    .with_model(model)
}

fn rack_24(name: &str, model: &str, dz: f64) -> Resource {
    Resource::itemized(
        name,
        Category::TipRack,
        122.4,
        82.6,
        7.0,
        dz,
        GridSpec {
            num_x: 6,
            num_y: 4,
            dx: 7.3,
            dy: 5.2,
            item_size_x: 18.0,
            item_size_y: 18.0,
            item_category: Category::TipSpot,
        },
    )
    .with_model(model)
}

/// Rack of 96 300ul standard volume tips with filter.
pub fn stf_l(name: &str) -> Resource {
    rack_96(name, "STF_L", -50.5)
}

/// Rack of 96 300ul standard volume tips.
pub fn st_l(name: &str) -> Resource {
    rack_96(name, "ST_L", -50.5)
}

/// Rack of 96 1000ul high volume tips with filter.
pub fn htf_l(name: &str) -> Resource {
    rack_96(name, "HTF_L", -83.5)
}

/// Rack of 96 1000ul high volume tips.
pub fn ht_l(name: &str) -> Resource {
    rack_96(name, "HT_L", -83.5)
}

/// Rack of 96 10ul low volume tips with filter.
pub fn ltf_l(name: &str) -> Resource {
    rack_96(name, "LTF_L", -22.5)
}

/// Rack of 96 10ul low volume tips.
pub fn lt_l(name: &str) -> Resource {
    rack_96(name, "LT_L", -22.5)
}

/// Rack of 24 4ml tips with filter.
pub fn four_ml_tf_l(name: &str) -> Resource {
    rack_24(name, "FourmlTF_L", -93.2)
}

/// Rack of 24 5ml tips.
pub fn five_ml_t_l(name: &str) -> Resource {
    rack_24(name, "FivemlT_L", -93.2)
}

pub(crate) fn try_build(model: &str, name: &str) -> Option<Resource> {
    match model {
        "STF_L" => Some(stf_l(name)),
        "ST_L" => Some(st_l(name)),
        "HTF_L" => Some(htf_l(name)),
        "HT_L" => Some(ht_l(name)),
        "LTF_L" => Some(ltf_l(name)),
        "LT_L" => Some(lt_l(name)),
        "FourmlTF_L" => Some(four_ml_tf_l(name)),
        "FivemlT_L" => Some(five_ml_t_l(name)),
        _ => None,
    }
}
