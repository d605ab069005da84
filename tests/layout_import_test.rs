use deckhand::catalog;
use deckhand::{
    ChatterBackend, Coordinate, Deck, DeckhandError, LiquidHandler, Placement, RailDeckConfig,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn handler() -> LiquidHandler<ChatterBackend> {
    let deck = Deck::rails(RailDeckConfig::star()).unwrap();
    LiquidHandler::new(deck, ChatterBackend::new())
}

/// Three carriers as the vendor layout editor writes them: a tip carrier on
/// rail 2 and two plate carriers on rails 10 and 18, labware coordinates
/// recorded absolutely. The waste block is a model the catalog does not know.
const TEST_DECK_LAY: &str = "\
Labware.Cnt=12
Labware.1.Id=TIP_CAR_480_A00_0001
Labware.1.File=ML_STAR\\TIP_CAR_480_A00.tml
Labware.1.X=122.500
Labware.1.Y=63.000
Labware.1.Z=100.000
Labware.2.Id=tips_01
Labware.2.File=ML_STAR\\STF_L.rck
Labware.2.X=140.400
Labware.2.Y=145.800
Labware.2.Z=164.450
Labware.3.Id=STF_L_0001
Labware.3.File=ML_STAR\\STF_L.rck
Labware.3.X=140.400
Labware.3.Y=241.800
Labware.3.Z=164.450
Labware.4.Id=tips_04
Labware.4.File=ML_STAR\\HTF_L.rck
Labware.4.X=140.400
Labware.4.Y=433.800
Labware.4.Z=131.450
Labware.5.Id=PLT_CAR_L5AC_A00_0001
Labware.5.File=ML_STAR\\PLT_CAR_L5AC_A00.tml
Labware.5.X=302.500
Labware.5.Y=63.000
Labware.5.Z=100.000
Labware.6.Id=Cos_96_DW_1mL_0001
Labware.6.File=ML_STAR\\Cos_96_DW_1mL.rck
Labware.6.X=320.500
Labware.6.Y=146.000
Labware.6.Z=187.150
Labware.7.Id=Cos_96_DW_500ul_0001
Labware.7.File=ML_STAR\\Cos_96_DW_500ul.rck
Labware.7.X=320.500
Labware.7.Y=338.000
Labware.7.Z=188.150
Labware.8.Id=Cos_96_DW_1mL_0002
Labware.8.File=ML_STAR\\Cos_96_DW_1mL.rck
Labware.8.X=320.500
Labware.8.Y=434.000
Labware.8.Z=187.150
Labware.9.Id=Cos_96_DW_2mL_0001
Labware.9.File=ML_STAR\\Cos_96_DW_2mL.rck
Labware.9.X=320.500
Labware.9.Y=530.000
Labware.9.Z=187.150
Labware.10.Id=PLT_CAR_L5AC_A00_0002
Labware.10.File=ML_STAR\\PLT_CAR_L5AC_A00.tml
Labware.10.X=482.500
Labware.10.Y=63.000
Labware.10.Z=100.000
Labware.11.Id=Cos_96_PCR_0001
Labware.11.File=ML_STAR\\Cos_96_PCR.rck
Labware.11.X=500.500
Labware.11.Y=434.000
Labware.11.Z=186.650
Labware.12.Id=waste_block
Labware.12.File=ML_STAR\\WASTE_BLOCK_A00.tml
Labware.12.X=1000.000
Labware.12.Y=63.000
Labware.12.Z=100.000
";

fn location_of(lh: &LiquidHandler<ChatterBackend>, name: &str) -> Coordinate {
    lh.get_resource(name).unwrap().absolute_location()
}

#[tokio::test]
async fn test_parse_lay_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(TEST_DECK_LAY.as_bytes()).unwrap();

    let mut lh = handler();
    lh.load_layout_file(file.path()).await.unwrap();

    // Carriers land on the rails their recorded x implies.
    assert!(location_of(&lh, "TIP_CAR_480_A00_0001")
        .close_to(Coordinate::new(122.5, 63.0, 100.0), 1e-9));
    assert_eq!(lh.deck().rail_of("TIP_CAR_480_A00_0001"), Some(2));
    assert!(location_of(&lh, "PLT_CAR_L5AC_A00_0001")
        .close_to(Coordinate::new(302.5, 63.0, 100.0), 1e-9));
    assert_eq!(lh.deck().rail_of("PLT_CAR_L5AC_A00_0001"), Some(10));
    assert!(location_of(&lh, "PLT_CAR_L5AC_A00_0002")
        .close_to(Coordinate::new(482.5, 63.0, 100.0), 1e-9));
    assert_eq!(lh.deck().rail_of("PLT_CAR_L5AC_A00_0002"), Some(18));

    // Labware coordinates round-trip through site matching.
    assert!(location_of(&lh, "tips_01").close_to(Coordinate::new(140.4, 145.8, 164.45), 1e-9));
    assert!(location_of(&lh, "STF_L_0001").close_to(Coordinate::new(140.4, 241.8, 164.45), 1e-9));
    assert!(location_of(&lh, "tips_04").close_to(Coordinate::new(140.4, 433.8, 131.45), 1e-9));
    assert!(
        location_of(&lh, "Cos_96_DW_1mL_0001").close_to(Coordinate::new(320.5, 146.0, 187.15), 1e-9)
    );
    assert!(location_of(&lh, "Cos_96_DW_500ul_0001")
        .close_to(Coordinate::new(320.5, 338.0, 188.15), 1e-9));
    assert!(
        location_of(&lh, "Cos_96_DW_1mL_0002").close_to(Coordinate::new(320.5, 434.0, 187.15), 1e-9)
    );
    assert!(
        location_of(&lh, "Cos_96_DW_2mL_0001").close_to(Coordinate::new(320.5, 530.0, 187.15), 1e-9)
    );
    assert!(
        location_of(&lh, "Cos_96_PCR_0001").close_to(Coordinate::new(500.5, 434.0, 186.65), 1e-9)
    );

    // Site occupancy: each rack sits in the site its coordinates dictate.
    let tip_car = lh.get_resource("TIP_CAR_480_A00_0001").unwrap();
    assert_eq!(tip_car.site(0).unwrap().name(), "tips_01");
    assert_eq!(tip_car.site(1).unwrap().name(), "STF_L_0001");
    assert!(tip_car.site(2).is_none());
    assert_eq!(tip_car.site(3).unwrap().name(), "tips_04");
    assert!(tip_car.site(4).is_none());

    let plt_car = lh.get_resource("PLT_CAR_L5AC_A00_0001").unwrap();
    assert_eq!(plt_car.site(0).unwrap().name(), "Cos_96_DW_1mL_0001");
    assert!(plt_car.site(1).is_none());
    assert_eq!(plt_car.site(2).unwrap().name(), "Cos_96_DW_500ul_0001");
    assert_eq!(plt_car.site(3).unwrap().name(), "Cos_96_DW_1mL_0002");
    assert_eq!(plt_car.site(4).unwrap().name(), "Cos_96_DW_2mL_0001");

    let plt_car_2 = lh.get_resource("PLT_CAR_L5AC_A00_0002").unwrap();
    assert!(plt_car_2.site(0).is_none());
    assert_eq!(plt_car_2.site(3).unwrap().name(), "Cos_96_PCR_0001");

    // The waste block model is vendor furniture the catalog skips.
    assert!(lh.get_resource("waste_block").is_none());

    // One assignment callback per carrier, none for nested labware.
    let assigned = lh
        .backend()
        .history()
        .iter()
        .filter(|line| line.contains("was assigned"))
        .count();
    assert_eq!(assigned, 3);
}

#[tokio::test]
async fn test_import_is_atomic_on_span_conflict() {
    let mut lh = handler();
    // Rails 1-6 taken: the fixture's tip carrier wants rails 2-7.
    lh.assign_resource(
        catalog::build("PLT_CAR_L5AC_A00", "resident").unwrap(),
        Placement::Rail(1),
        false,
    )
    .await
    .unwrap();

    let err = lh.load_layout(TEST_DECK_LAY).await.unwrap_err();
    assert!(matches!(err, DeckhandError::OccupiedSlotError { .. }));

    // Nothing from the file landed.
    assert_eq!(lh.deck().num_assigned(), 1);
    assert!(lh.get_resource("tips_01").is_none());
    assert!(lh.get_resource("PLT_CAR_L5AC_A00_0001").is_none());
}

#[tokio::test]
async fn test_import_is_atomic_on_duplicate_name() {
    let mut lh = handler();
    lh.assign_resource(
        catalog::build("STF_L", "tips_01").unwrap(),
        Placement::Location(Coordinate::new(1001.0, 400.0, 100.0)),
        false,
    )
    .await
    .unwrap();

    let err = lh.load_layout(TEST_DECK_LAY).await.unwrap_err();
    assert!(matches!(err, DeckhandError::DuplicateNameError(_)));
    assert_eq!(lh.deck().num_assigned(), 1);
    assert!(lh.get_resource("TIP_CAR_480_A00_0001").is_none());
}

#[tokio::test]
async fn test_import_is_atomic_on_malformed_record() {
    let mut lh = handler();
    let content = TEST_DECK_LAY.replace("Labware.5.Z=100.000\n", "");
    let err = lh.load_layout(&content).await.unwrap_err();
    assert!(matches!(err, DeckhandError::ParseError { .. }));
    assert_eq!(lh.deck().num_assigned(), 0);
}

#[tokio::test]
async fn test_import_rejects_missing_count() {
    let mut lh = handler();
    let content = TEST_DECK_LAY.replace("Labware.Cnt=12\n", "");
    let err = lh.load_layout(&content).await.unwrap_err();
    assert!(matches!(err, DeckhandError::ParseError { line: 0, .. }));
}

#[tokio::test]
async fn test_import_tolerates_vendor_noise() {
    let mut lh = handler();
    let content = format!(
        "; exported layout\nVersion=4.7\nGlobalOptions.Mode=1\n\n{}",
        TEST_DECK_LAY
    );
    lh.load_layout(&content).await.unwrap();
    assert_eq!(lh.deck().num_assigned(), 3);
}

#[tokio::test]
async fn test_import_onto_slot_deck_is_invalid() {
    use deckhand::SlotDeckConfig;

    let deck = Deck::slots(SlotDeckConfig::flex()).unwrap();
    let mut lh = LiquidHandler::new(deck, ChatterBackend::new());
    let err = lh.load_layout(TEST_DECK_LAY).await.unwrap_err();
    assert!(matches!(err, DeckhandError::InvalidOperationError { .. }));
}

#[tokio::test]
async fn test_missing_layout_file_is_an_io_error() {
    let mut lh = handler();
    let err = lh
        .load_layout_file("/definitely/not/here/deck.lay")
        .await
        .unwrap_err();
    assert!(matches!(err, DeckhandError::IoError(_)));
}
