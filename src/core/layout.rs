use crate::catalog;
use crate::core::deck::Deck;
use crate::domain::coordinate::Coordinate;
use crate::domain::resource::{Category, Resource};
use crate::utils::error::{DeckhandError, Result};
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Tolerance when matching file coordinates against reconstructed geometry.
/// Vendor tools write positions rounded to a thousandth of a millimeter.
const COORD_TOLERANCE_MM: f64 = 1e-3;

/// One `Labware.<n>.*` record from the file: the stored name, the model
/// derived from the geometry file stem, and the absolute position the vendor
/// tool computed.
#[derive(Debug, Clone)]
struct LayRecord {
    name: String,
    model: String,
    location: Coordinate,
    line: usize,
}

/// A carrier that passed staging: its labware is seated, its rail is derived
/// and validated against the live deck. Assigning these through the normal
/// orchestrator path cannot violate a placement constraint.
#[derive(Debug)]
pub(crate) struct StagedCarrier {
    pub rail: i32,
    pub location: Coordinate,
    pub resource: Resource,
}

/// Line 0 marks file-level problems (a missing count, an incomplete record).
fn parse_error(line: usize, message: impl Into<String>) -> DeckhandError {
    DeckhandError::ParseError {
        line,
        message: message.into(),
    }
}

#[derive(Debug, Default)]
struct RecordFields {
    id: Option<String>,
    file: Option<String>,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    line: usize,
}

fn set_text(slot: &mut Option<String>, value: &str, line: usize, key: &str) -> Result<()> {
    if slot.is_some() {
        return Err(parse_error(line, format!("duplicate key '{}'", key)));
    }
    *slot = Some(value.to_string());
    Ok(())
}

fn set_number(slot: &mut Option<f64>, value: &str, line: usize, key: &str) -> Result<()> {
    if slot.is_some() {
        return Err(parse_error(line, format!("duplicate key '{}'", key)));
    }
    let parsed = value
        .parse()
        .map_err(|_| parse_error(line, format!("bad number '{}' for '{}'", value, key)))?;
    *slot = Some(parsed);
    Ok(())
}

/// The model name is the stem of the geometry file the record points at:
/// `ML_STAR\TIP_CAR_480_A00.tml` names model `TIP_CAR_480_A00`.
fn model_from_file(file: &str) -> Option<String> {
    let name = file.rsplit(['\\', '/']).next()?;
    let stem = name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Parses the flat `Labware.*` key table. Blank lines and `;` comments are
/// skipped; `key=value` lines outside the `Labware.` namespace are vendor
/// noise and ignored. Within the namespace every key must parse.
fn parse_records(content: &str) -> Result<Vec<LayRecord>> {
    let field_re = Regex::new(r"^(\d+)\.(Id|File|X|Y|Z)$").unwrap();

    let mut count: Option<usize> = None;
    let mut fields: HashMap<usize, RecordFields> = HashMap::new();

    for (line_index, raw) in content.lines().enumerate() {
        let line_number = line_index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        let (key, value) = line.split_once('=').ok_or_else(|| {
            parse_error(line_number, format!("expected key=value, got '{}'", line))
        })?;
        let key = key.trim();
        let value = value.trim();
        let Some(rest) = key.strip_prefix("Labware.") else {
            continue;
        };
        if rest == "Cnt" {
            if count.is_some() {
                return Err(parse_error(line_number, "duplicate Labware.Cnt"));
            }
            let parsed = value
                .parse()
                .map_err(|_| parse_error(line_number, format!("bad Labware.Cnt '{}'", value)))?;
            count = Some(parsed);
            continue;
        }
        let captures = field_re
            .captures(rest)
            .ok_or_else(|| parse_error(line_number, format!("unknown labware key '{}'", key)))?;
        let index: usize = captures[1]
            .parse()
            .map_err(|_| parse_error(line_number, format!("bad record index in '{}'", key)))?;
        let entry = fields.entry(index).or_insert_with(|| RecordFields {
            line: line_number,
            ..Default::default()
        });
        match &captures[2] {
            "Id" => set_text(&mut entry.id, value, line_number, key)?,
            "File" => set_text(&mut entry.file, value, line_number, key)?,
            "X" => set_number(&mut entry.x, value, line_number, key)?,
            "Y" => set_number(&mut entry.y, value, line_number, key)?,
            "Z" => set_number(&mut entry.z, value, line_number, key)?,
            _ => unreachable!("field regex admits five keys"),
        }
    }

    let count = count.ok_or_else(|| parse_error(0, "Labware.Cnt is missing"))?;
    let mut records = Vec::with_capacity(count);
    for index in 1..=count {
        let entry = fields
            .remove(&index)
            .ok_or_else(|| parse_error(0, format!("record {} of {} is missing", index, count)))?;
        let line = entry.line;
        let missing = |field: &str| parse_error(line, format!("record {} has no {}", index, field));
        let id = entry.id.ok_or_else(|| missing("Id"))?;
        let file = entry.file.ok_or_else(|| missing("File"))?;
        let x = entry.x.ok_or_else(|| missing("X"))?;
        let y = entry.y.ok_or_else(|| missing("Y"))?;
        let z = entry.z.ok_or_else(|| missing("Z"))?;
        let model = model_from_file(&file)
            .ok_or_else(|| parse_error(line, format!("cannot derive a model from '{}'", file)))?;
        records.push(LayRecord {
            name: id,
            model,
            location: Coordinate::new(x, y, z),
            line,
        });
    }
    if let Some(stray) = fields.keys().next() {
        return Err(parse_error(
            0,
            format!("record {} is outside Labware.Cnt={}", stray, count),
        ));
    }
    Ok(records)
}

/// Site whose seated occupant would land exactly where the file says the
/// labware is. The seat applies the occupant's own vertical datum.
fn find_site(
    carrier: &Resource,
    carrier_location: Coordinate,
    item: &Resource,
    recorded: Coordinate,
) -> Option<usize> {
    carrier.children.iter().enumerate().find_map(|(index, site)| {
        if site.resource.category != Category::CarrierSite {
            return None;
        }
        let seated = carrier_location + site.location + Coordinate::new(0.0, 0.0, item.dz);
        if seated.close_to(recorded, COORD_TOLERANCE_MM) {
            Some(index)
        } else {
            None
        }
    })
}

/// Parses a layout file and reconstructs its carriers fully populated,
/// without touching the deck. Every record is rebuilt from the catalog,
/// seated where its recorded coordinates dictate, and checked against the
/// live deck for name and rail-span conflicts. The caller commits the result
/// through the normal assignment path; nothing mutates on failure.
pub(crate) fn stage(content: &str, deck: &Deck) -> Result<Vec<StagedCarrier>> {
    if !deck.is_rail_addressed() {
        return Err(DeckhandError::InvalidOperationError {
            message: "layout files describe rail-addressed decks".to_string(),
        });
    }
    let records = parse_records(content)?;

    let mut staged: Vec<StagedCarrier> = Vec::new();
    let mut labware: Vec<(LayRecord, Resource)> = Vec::new();
    let mut spans: Vec<(u32, u32, String)> = Vec::new();

    for record in records {
        let Some(resource) = catalog::try_build(&record.model, &record.name) else {
            tracing::warn!(
                model = %record.model,
                name = %record.name,
                "skipping unknown labware model"
            );
            continue;
        };
        if resource.category != Category::Carrier {
            labware.push((record, resource));
            continue;
        }

        let rail = deck
            .rail_for_x(record.location.x, COORD_TOLERANCE_MM)
            .ok_or_else(|| {
                parse_error(
                    record.line,
                    format!("'{}' x={} does not land on a rail", record.name, record.location.x),
                )
            })?;
        let planned = deck.preview_rail(&resource, rail as i32)?;
        if !planned.close_to(record.location, COORD_TOLERANCE_MM) {
            return Err(parse_error(
                record.line,
                format!(
                    "'{}' would sit at {} but the file records {}",
                    record.name, planned, record.location
                ),
            ));
        }
        let span = match deck.rail_span(resource.size_x) {
            Some(span) => span,
            None => unreachable!("rail deck without a span"),
        };
        let end = rail + span - 1;
        for (other_start, other_end, other_name) in &spans {
            if rail <= *other_end && *other_start <= end {
                return Err(DeckhandError::OccupiedSlotError {
                    slot: format!("rail span {}-{}", rail, end),
                    by: other_name.clone(),
                });
            }
        }
        spans.push((rail, end, record.name.clone()));
        staged.push(StagedCarrier {
            rail: rail as i32,
            location: planned,
            resource,
        });
    }

    for (record, item) in labware {
        let target = staged.iter().enumerate().find_map(|(carrier_index, entry)| {
            find_site(&entry.resource, entry.location, &item, record.location)
                .map(|site_index| (carrier_index, site_index))
        });
        let Some((carrier_index, site_index)) = target else {
            return Err(parse_error(
                record.line,
                format!(
                    "'{}' at {} matches no carrier site",
                    record.name, record.location
                ),
            ));
        };
        staged[carrier_index]
            .resource
            .set_site(site_index, item)?;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for entry in &staged {
        for name in entry.resource.names() {
            if !seen.insert(name) || deck.contains(name) {
                return Err(DeckhandError::DuplicateNameError(name.to_string()));
            }
        }
    }

    Ok(staged)
}
