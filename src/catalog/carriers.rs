use crate::domain::coordinate::Coordinate;
use crate::domain::resource::{Category, PlacedResource, Resource};

fn carrier(
    name: &str,
    model: &str,
    site_offsets: &[Coordinate],
    site_size_x: f64,
    site_size_y: f64,
) -> Resource {
    let mut carrier = Resource::new(name, Category::Carrier, 135.0, 497.0, 130.0).with_model(model);
    for (i, offset) in site_offsets.iter().enumerate() {
        let site = Resource::new(
            &format!("{}_site_{}", name, i),
            Category::CarrierSite,
            site_size_x,
            site_size_y,
            0.0,
        );
        carrier.children.push(PlacedResource {
            location: *offset,
            resource: site,
        });
    }
    carrier
}

fn column_sites(dx: f64, dy: f64, dz: f64, pitch: f64, count: usize) -> Vec<Coordinate> {
    (0..count)
        .map(|i| Coordinate::new(dx, dy + i as f64 * pitch, dz))
        .collect()
}

/// Carrier for five 96-tip racks.
pub fn tip_car_480_a00(name: &str) -> Resource {
    carrier(
        name,
        "TIP_CAR_480_A00",
        &column_sites(17.9, 82.8, 114.95, 96.0, 5),
        122.4,
        82.6,
    )
}

/// Carrier for five deep well plates, landscape.
pub fn plt_car_l5ac_a00(name: &str) -> Resource {
    carrier(
        name,
        "PLT_CAR_L5AC_A00",
        &column_sites(18.0, 83.0, 86.15, 96.0, 5),
        127.0,
        86.0,
    )
}

pub(crate) fn try_build(model: &str, name: &str) -> Option<Resource> {
    match model {
        "TIP_CAR_480_A00" => Some(tip_car_480_a00(name)),
        "PLT_CAR_L5AC_A00" => Some(plt_car_l5ac_a00(name)),
        _ => None,
    }
}
