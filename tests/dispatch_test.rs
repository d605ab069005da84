use async_trait::async_trait;
use deckhand::catalog;
use deckhand::domain::ops::{AspirateOp, DispenseOp, DropOp, MoveOp, PickupOp};
use deckhand::{
    ChatterBackend, Coordinate, Deck, DeckhandError, LiquidHandler, LiquidHandlerBackend,
    Placement, RailDeckConfig, Resource, Result, TipRequest, TransferRequest,
};

/// Records every call it receives; the gripper can be rigged to fail.
struct Recorder {
    channels: usize,
    events: Vec<String>,
    jam_gripper: bool,
}

impl Recorder {
    fn new() -> Self {
        Self {
            channels: 8,
            events: Vec::new(),
            jam_gripper: false,
        }
    }
}

#[async_trait]
impl LiquidHandlerBackend for Recorder {
    async fn setup(&mut self) -> Result<()> {
        self.events.push("setup".to_string());
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.events.push("stop".to_string());
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
        self.events
            .push(format!("assigned {} @ {}", resource.name, location));
        Ok(())
    }

    async fn unassigned_resource_callback(&mut self, name: &str) -> Result<()> {
        self.events.push(format!("unassigned {}", name));
        Ok(())
    }

    async fn pick_up_tips(&mut self, ops: &[PickupOp], use_channels: &[usize]) -> Result<()> {
        let spots: Vec<&str> = ops.iter().map(|op| op.target.name.as_str()).collect();
        self.events
            .push(format!("pick_up_tips {:?} on {:?}", spots, use_channels));
        Ok(())
    }

    async fn drop_tips(&mut self, ops: &[DropOp], use_channels: &[usize]) -> Result<()> {
        let spots: Vec<&str> = ops.iter().map(|op| op.target.name.as_str()).collect();
        self.events
            .push(format!("drop_tips {:?} on {:?}", spots, use_channels));
        Ok(())
    }

    async fn aspirate(&mut self, ops: &[AspirateOp], use_channels: &[usize]) -> Result<()> {
        let wells: Vec<String> = ops
            .iter()
            .map(|op| {
                format!(
                    "{}:{}@{}",
                    op.target.name,
                    op.volume,
                    op.flow_rate.unwrap_or(0.0)
                )
            })
            .collect();
        self.events
            .push(format!("aspirate {:?} on {:?}", wells, use_channels));
        Ok(())
    }

    async fn dispense(&mut self, ops: &[DispenseOp], use_channels: &[usize]) -> Result<()> {
        let wells: Vec<String> = ops
            .iter()
            .map(|op| format!("{}:{}", op.target.name, op.volume))
            .collect();
        self.events
            .push(format!("dispense {:?} on {:?}", wells, use_channels));
        Ok(())
    }

    async fn move_resource(&mut self, op: &MoveOp) -> Result<()> {
        if self.jam_gripper {
            return Err(anyhow::anyhow!("gripper jammed").into());
        }
        self.events
            .push(format!("move {} to {}", op.resource.name, op.destination));
        Ok(())
    }
}

async fn loaded_handler(backend: Recorder) -> LiquidHandler<Recorder> {
    let deck = Deck::rails(RailDeckConfig::star()).unwrap();
    let mut lh = LiquidHandler::new(deck, backend);

    let mut tip_car = catalog::build("TIP_CAR_480_A00", "tip carrier").unwrap();
    tip_car
        .set_site(0, catalog::build("STF_L", "tips_01").unwrap())
        .unwrap();
    let mut plt_car = catalog::build("PLT_CAR_L5AC_A00", "plate carrier").unwrap();
    plt_car
        .set_site(0, catalog::build("Cos_96_DW_1mL", "plate_01").unwrap())
        .unwrap();
    lh.assign_resource(tip_car, Placement::Rail(1), false)
        .await
        .unwrap();
    lh.assign_resource(plt_car, Placement::Rail(10), false)
        .await
        .unwrap();
    lh
}

#[tokio::test]
async fn test_full_protocol_reaches_the_backend_in_order() {
    let mut lh = loaded_handler(Recorder::new()).await;
    lh.setup().await.unwrap();

    lh.pick_up_tips(
        &[TipRequest::new("tips_01_A1"), TipRequest::new("tips_01_B1")],
        Some(&[0, 1]),
    )
    .await
    .unwrap();
    lh.aspirate(
        &[
            TransferRequest::new("plate_01_A1", 100.0).with_flow_rate(120.0),
            TransferRequest::new("plate_01_B1", 50.0),
        ],
        Some(&[0, 1]),
    )
    .await
    .unwrap();
    lh.dispense(
        &[
            TransferRequest::new("plate_01_A2", 100.0),
            TransferRequest::new("plate_01_B2", 50.0),
        ],
        Some(&[0, 1]),
    )
    .await
    .unwrap();
    lh.drop_tips(
        &[TipRequest::new("tips_01_A1"), TipRequest::new("tips_01_B1")],
        Some(&[0, 1]),
    )
    .await
    .unwrap();
    lh.stop().await.unwrap();

    let events = &lh.backend().events;
    assert_eq!(events[0], "assigned tip carrier @ (100.000, 063.000, 100.000)");
    assert_eq!(events[1], "assigned plate carrier @ (302.500, 063.000, 100.000)");
    assert_eq!(events[2], "setup");
    assert_eq!(
        events[3],
        "pick_up_tips [\"tips_01_A1\", \"tips_01_B1\"] on [0, 1]"
    );
    // Volumes and flow rates arrive untouched.
    assert_eq!(
        events[4],
        "aspirate [\"plate_01_A1:100@120\", \"plate_01_B1:50@0\"] on [0, 1]"
    );
    assert_eq!(
        events[5],
        "dispense [\"plate_01_A2:100\", \"plate_01_B2:50\"] on [0, 1]"
    );
    assert_eq!(
        events[6],
        "drop_tips [\"tips_01_A1\", \"tips_01_B1\"] on [0, 1]"
    );
    assert_eq!(events[7], "stop");
    assert_eq!(events.len(), 8);
}

#[tokio::test]
async fn test_default_channels_are_the_first_n() {
    let mut lh = loaded_handler(Recorder::new()).await;
    lh.setup().await.unwrap();
    lh.pick_up_tips(
        &[
            TipRequest::new("tips_01_A1"),
            TipRequest::new("tips_01_B1"),
            TipRequest::new("tips_01_C1"),
        ],
        None,
    )
    .await
    .unwrap();
    let last = lh.backend().events.last().unwrap();
    assert!(last.ends_with("on [0, 1, 2]"));
}

#[tokio::test]
async fn test_explicit_channel_routing() {
    let mut lh = loaded_handler(Recorder::new()).await;
    lh.setup().await.unwrap();
    lh.pick_up_tips(
        &[TipRequest::new("tips_01_A1"), TipRequest::new("tips_01_B1")],
        Some(&[6, 2]),
    )
    .await
    .unwrap();
    let last = lh.backend().events.last().unwrap();
    assert!(last.ends_with("on [6, 2]"));
}

#[tokio::test]
async fn test_96_head_dispatch_through_a_capable_backend() {
    let deck = Deck::rails(RailDeckConfig::star()).unwrap();
    let mut lh = LiquidHandler::new(deck, ChatterBackend::new());
    let mut tip_car = catalog::build("TIP_CAR_480_A00", "tip carrier").unwrap();
    tip_car
        .set_site(0, catalog::build("STF_L", "tips_01").unwrap())
        .unwrap();
    let mut plt_car = catalog::build("PLT_CAR_L5AC_A00", "plate carrier").unwrap();
    plt_car
        .set_site(0, catalog::build("Cos_96_DW_1mL", "plate_01").unwrap())
        .unwrap();
    lh.assign_resource(tip_car, Placement::Rail(1), false)
        .await
        .unwrap();
    lh.assign_resource(plt_car, Placement::Rail(10), false)
        .await
        .unwrap();
    lh.setup().await.unwrap();

    lh.pick_up_tips96("tips_01").await.unwrap();
    lh.aspirate96("plate_01", 75.0).await.unwrap();
    lh.dispense96("plate_01", 75.0).await.unwrap();
    lh.drop_tips96("tips_01").await.unwrap();

    let history = lh.backend().history();
    assert!(history.contains(&"Picking up tips from tips_01.".to_string()));
    assert!(history.contains(&"Aspirating 75ul from every well of plate_01.".to_string()));
    assert!(history.contains(&"Dispensing 75ul to every well of plate_01.".to_string()));
    assert!(history.contains(&"Dropping tips to tips_01.".to_string()));
}

#[tokio::test]
async fn test_96_head_unsupported_on_a_channel_only_backend() {
    let mut lh = loaded_handler(Recorder::new()).await;
    lh.setup().await.unwrap();
    let err = lh.pick_up_tips96("tips_01").await.unwrap_err();
    assert!(matches!(err, DeckhandError::UnsupportedOperationError(_)));
    let err = lh.dispense96("plate_01", 50.0).await.unwrap_err();
    assert!(matches!(err, DeckhandError::UnsupportedOperationError(_)));
}

#[tokio::test]
async fn test_move_resource_rehomes_the_tree() {
    let mut lh = loaded_handler(Recorder::new()).await;
    lh.setup().await.unwrap();

    let location = lh
        .move_resource("plate carrier", Placement::Rail(20))
        .await
        .unwrap();
    assert!(location.close_to(Coordinate::new(527.5, 63.0, 100.0), 1e-9));
    assert_eq!(lh.deck().rail_of("plate carrier"), Some(20));
    // Nested labware follows its carrier.
    assert!(lh
        .get_resource("plate_01")
        .unwrap()
        .absolute_location()
        .close_to(Coordinate::new(545.5, 146.0, 187.15), 1e-9));

    // Motion first, then the two registry callbacks.
    let events = &lh.backend().events;
    let n = events.len();
    assert_eq!(events[n - 3], "move plate carrier to (527.500, 063.000, 100.000)");
    assert_eq!(events[n - 2], "unassigned plate carrier");
    assert_eq!(
        events[n - 1],
        "assigned plate carrier @ (527.500, 063.000, 100.000)"
    );
}

#[tokio::test]
async fn test_move_within_its_own_span_is_legal() {
    let mut lh = loaded_handler(Recorder::new()).await;
    lh.setup().await.unwrap();
    // Rails 10-15 are its own; shifting one rail right must not collide
    // with itself.
    lh.move_resource("plate carrier", Placement::Rail(11))
        .await
        .unwrap();
    assert_eq!(lh.deck().rail_of("plate carrier"), Some(11));
}

#[tokio::test]
async fn test_move_to_an_occupied_span_restores_the_source() {
    let mut lh = loaded_handler(Recorder::new()).await;
    lh.setup().await.unwrap();
    let before = lh.backend().events.len();

    // Tip carrier holds rails 1-6.
    let err = lh
        .move_resource("plate carrier", Placement::Rail(4))
        .await
        .unwrap_err();
    assert!(matches!(err, DeckhandError::OccupiedSlotError { .. }));
    assert_eq!(lh.deck().rail_of("plate carrier"), Some(10));
    assert!(lh.get_resource("plate_01").is_some());
    // The backend never heard about the aborted move.
    assert_eq!(lh.backend().events.len(), before);
}

#[tokio::test]
async fn test_gripper_failure_restores_the_source() {
    let mut backend = Recorder::new();
    backend.jam_gripper = true;
    let mut lh = loaded_handler(backend).await;
    lh.setup().await.unwrap();

    let err = lh
        .move_resource("plate carrier", Placement::Rail(20))
        .await
        .unwrap_err();
    assert!(matches!(err, DeckhandError::BackendError(_)));
    // Physical state is unchanged, so the tree must be too.
    assert_eq!(lh.deck().rail_of("plate carrier"), Some(10));
    assert!(lh
        .get_resource("plate carrier")
        .unwrap()
        .absolute_location()
        .close_to(Coordinate::new(302.5, 63.0, 100.0), 1e-9));
}

#[tokio::test]
async fn test_nested_resources_cannot_be_gripper_moved() {
    let mut lh = loaded_handler(Recorder::new()).await;
    lh.setup().await.unwrap();
    let err = lh
        .move_resource("plate_01", Placement::Rail(20))
        .await
        .unwrap_err();
    assert!(matches!(err, DeckhandError::InvalidOperationError { .. }));
    let err = lh
        .move_resource("nowhere to be found", Placement::Rail(20))
        .await
        .unwrap_err();
    assert!(matches!(err, DeckhandError::NotFoundError(_)));
}

#[tokio::test]
async fn test_dispatch_errors_name_the_problem() {
    let mut lh = loaded_handler(Recorder::new()).await;

    // Before setup: state error, not a backend call.
    let err = lh
        .pick_up_tips(&[TipRequest::new("tips_01_A1")], None)
        .await
        .unwrap_err();
    assert!(matches!(err, DeckhandError::StateError { .. }));
    assert!(lh.backend().events.iter().all(|e| !e.starts_with("pick")));

    lh.setup().await.unwrap();

    // Unknown well resolves to nothing.
    let err = lh
        .aspirate(&[TransferRequest::new("ghost_A1", 10.0)], None)
        .await
        .unwrap_err();
    assert!(matches!(err, DeckhandError::NotFoundError(_)));

    // Channel set must match the batch.
    let err = lh
        .aspirate(
            &[TransferRequest::new("plate_01_A1", 10.0)],
            Some(&[0, 1]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DeckhandError::InvalidOperationError { .. }));
}
