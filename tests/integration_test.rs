//! 集成測試

use std::sync::Arc;
use std::thread;

use chrono::{TimeZone, Utc};
use rstest::rstest;
use wms::{CarrierGateway, CarrierTariff, FulfillmentEngine, TariffCarrier, WmsError};
use wms_core::{
    BinLocation, Dimensions, EngineConfig, GeoPoint, ItemCondition, Money, Order, OrderItem,
    OrderStatus, PackagingType, PackingStation, Priority, ServiceLevel, ShipmentSpec, Warehouse,
    WaveStatus,
};

/// 赤道上 1 度經度的大圓距離（公里）
const KM_PER_DEGREE: f64 = 111.194_926_644_558_74;

fn carriers() -> Vec<Arc<dyn CarrierGateway>> {
    vec![
        Arc::new(TariffCarrier::new(CarrierTariff::new(
            "ACME",
            Money::from_minor(800),
            Money::from_minor(150),
            5,
        ))),
        Arc::new(TariffCarrier::new(CarrierTariff::new(
            "SWIFT",
            Money::from_minor(500),
            Money::from_minor(200),
            4,
        ))),
    ]
}

fn engine() -> FulfillmentEngine {
    FulfillmentEngine::in_memory(EngineConfig::default(), carriers()).unwrap()
}

fn add_warehouse(engine: &FulfillmentEngine, warehouse: Warehouse) {
    engine.repositories().warehouses.save_warehouse(warehouse);
}

#[tokio::test]
async fn test_full_order_lifecycle() {
    let engine = engine();
    add_warehouse(
        &engine,
        Warehouse::new("WH-TPE", GeoPoint::new(25.03, 121.56), 10_000).with_name("台北倉"),
    );
    add_warehouse(
        &engine,
        Warehouse::new("WH-KHH", GeoPoint::new(22.63, 120.30), 10_000).with_name("高雄倉"),
    );
    engine
        .repositories()
        .packing
        .save_station(PackingStation::new("PS-1", "WH-TPE"));

    let ledger = engine.ledger();
    ledger.adjust("SKU-1", "WH-TPE", 100).unwrap();
    ledger.adjust("SKU-2", "WH-TPE", 50).unwrap();
    ledger.set_location("SKU-1", "WH-TPE", BinLocation::new("B", "04")).unwrap();
    ledger.set_location("SKU-2", "WH-TPE", BinLocation::new("A", "12")).unwrap();

    // 1. 派倉
    let order = Order::new(
        "SO-1001",
        GeoPoint::new(25.05, 121.52),
        vec![
            OrderItem::new("SKU-1", 2, Money::from_major(25)),
            OrderItem::new("SKU-2", 1, Money::from_minor(999)).with_unit_weight_grams(1_200),
        ],
    )
    .with_priority(Priority::High);

    let decision = engine.route(&order).unwrap();
    assert_eq!(decision.warehouse_id, "WH-TPE");
    assert!(!decision.partial_fulfillment);
    assert!(decision.estimated_shipping_cost > Money::from_major(5));
    assert_eq!(ledger.available("SKU-1", "WH-TPE"), 98);

    // 2. 波次揀貨
    let waves = engine.build_waves("WH-TPE").unwrap();
    assert_eq!(waves.len(), 1);
    let products: Vec<_> = waves[0].pick_list.iter().map(|l| l.product_id.as_str()).collect();
    assert_eq!(products, vec!["SKU-2", "SKU-1"]);

    engine
        .start_wave(waves[0].id, vec!["picker-7".to_string()])
        .unwrap();
    let wave = engine.complete_wave(waves[0].id).unwrap();
    assert_eq!(wave.status, WaveStatus::Completed);

    let sku1 = ledger.get("SKU-1", "WH-TPE").unwrap();
    assert_eq!(sku1.on_hand_qty, 98);
    assert_eq!(sku1.reserved_qty, 0);

    // 3. 包裝：2 × 500g + 1200g = 2.2kg
    let task = engine.assign_to_packing("SO-1001").unwrap();
    assert_eq!(task.packaging, PackagingType::MediumBox);
    assert_eq!(task.dimensions, Dimensions::new(30, 25, 15));
    assert_eq!(task.weight_grams, 2_200);
    engine.start_packing(task.id).unwrap();
    engine.complete_packing(task.id).unwrap();

    // 4. 比價與出貨
    let rates = engine.quote_order("SO-1001").await.unwrap();
    assert_eq!(rates.len(), 4);
    assert!(rates.windows(2).all(|w| w[0].cost <= w[1].cost));

    let label = engine.ship_order("SO-1001", &rates[0]).await.unwrap();
    assert_eq!(label.carrier, rates[0].carrier);
    let assignment = engine.repositories().orders.get_assignment("SO-1001").unwrap();
    assert_eq!(assignment.status, OrderStatus::Shipped);

    assert!(matches!(
        engine.ship_order("SO-1001", &rates[0]).await,
        Err(WmsError::InvalidStateTransition { .. })
    ));

    // 5. 退貨
    let request = engine
        .process_return("SO-1001", "SKU-1", 2, ItemCondition::New)
        .unwrap();
    assert_eq!(request.refund_amount, Money::from_minor(5_000));
    assert_eq!(ledger.available("SKU-1", "WH-TPE"), 100);

    let report = engine.sync_inventory();
    assert_eq!(report.synced, 2);
    assert_eq!(report.conflicts, 0);
}

#[test]
fn test_full_stock_beats_proximity() {
    let engine = engine();
    add_warehouse(&engine, Warehouse::new("WH-NEAR", GeoPoint::new(0.0, 0.9), 1_000));
    add_warehouse(&engine, Warehouse::new("WH-FAR", GeoPoint::new(0.0, 36.0), 1_000));
    engine.ledger().adjust("SKU-1", "WH-FAR", 10).unwrap();

    let order = Order::new(
        "SO-1",
        GeoPoint::new(0.0, 0.0),
        vec![OrderItem::new("SKU-1", 1, Money::from_major(10))],
    );
    let decision = engine.route(&order).unwrap();

    assert_eq!(decision.warehouse_id, "WH-FAR");
    let near = decision
        .candidates
        .iter()
        .find(|c| c.warehouse_id == "WH-NEAR")
        .unwrap();
    let far = decision.winner().unwrap();
    assert_eq!(far.breakdown.inventory, 1.0);
    assert_eq!(near.breakdown.inventory, 0.0);
    assert!((near.breakdown.proximity - (1.0 - 0.9 * KM_PER_DEGREE / 5000.0)).abs() < 1e-6);
    assert!((far.breakdown.proximity - (1.0 - 36.0 * KM_PER_DEGREE / 5000.0)).abs() < 1e-6);
}

#[test]
fn test_routing_is_deterministic() {
    let routed_at = Utc.with_ymd_and_hms(2025, 11, 3, 9, 0, 0).unwrap();
    let order = Order::new(
        "SO-7",
        GeoPoint::new(24.0, 121.0),
        vec![
            OrderItem::new("SKU-1", 3, Money::from_major(10)),
            OrderItem::new("SKU-2", 1, Money::from_major(10)),
        ],
    );

    let decide = || {
        let engine = engine();
        add_warehouse(&engine, Warehouse::new("WH-A", GeoPoint::new(25.0, 121.5), 500).with_utilized(250));
        add_warehouse(&engine, Warehouse::new("WH-B", GeoPoint::new(23.0, 120.2), 500));
        engine.ledger().adjust("SKU-1", "WH-A", 5).unwrap();
        engine.ledger().adjust("SKU-2", "WH-B", 5).unwrap();
        engine.route_at(&order, routed_at).unwrap()
    };

    let first = decide();
    let second = decide();
    assert_ne!(first.id, second.id);
    assert!(first.same_outcome(&second));
    assert_eq!(
        first.estimated_ship_date,
        chrono::NaiveDate::from_ymd_opt(2025, 11, 4).unwrap()
    );
}

#[test]
fn test_no_inventory_anywhere_is_partial() {
    let engine = engine();
    add_warehouse(&engine, Warehouse::new("WH-A", GeoPoint::new(0.0, 1.0), 100));
    add_warehouse(&engine, Warehouse::new("WH-B", GeoPoint::new(0.0, 2.0), 100));

    let order = Order::new(
        "SO-EMPTY",
        GeoPoint::new(0.0, 0.0),
        vec![OrderItem::new("SKU-404", 1, Money::from_major(10))],
    );
    let decision = engine.route(&order).unwrap();

    assert_eq!(decision.warehouse_id, "WH-A");
    assert!(decision.partial_fulfillment);
    let assignment = engine.repositories().orders.get_assignment("SO-EMPTY").unwrap();
    assert!(assignment.is_partial());
    assert!(assignment.reserved.is_empty());
}

#[test]
fn test_waves_bounded_and_idempotent() {
    let engine = engine();
    add_warehouse(&engine, Warehouse::new("WH-A", GeoPoint::new(0.0, 1.0), 10_000));
    engine.ledger().adjust("SKU-1", "WH-A", 1_000).unwrap();

    for i in 0..45 {
        let priority = if i % 3 == 0 { Priority::Urgent } else { Priority::Normal };
        let order = Order::new(
            format!("SO-{:03}", i),
            GeoPoint::new(0.0, 0.0),
            vec![OrderItem::new("SKU-1", 1, Money::from_major(10))],
        )
        .with_priority(priority);
        engine.route(&order).unwrap();
    }

    let waves = engine.build_waves("WH-A").unwrap();
    // 緊急 15 筆一個波次；一般 30 筆拆成 20 + 10
    assert_eq!(waves.len(), 3);
    assert!(waves.iter().all(|w| w.order_ids.len() <= 20));
    assert_eq!(waves.iter().map(|w| w.order_ids.len()).sum::<usize>(), 45);
    assert_eq!(waves[0].priority, Priority::Urgent);

    assert!(engine.build_waves("WH-A").unwrap().is_empty());
}

#[test]
fn test_over_available_transfer_leaves_both_rows() {
    let engine = engine();
    engine.ledger().adjust("SKU-1", "WH-A", 5).unwrap();
    engine.ledger().adjust("SKU-1", "WH-B", 1).unwrap();

    let err = engine
        .create_transfer("SKU-1", "WH-A", "WH-B", 6, "補貨")
        .unwrap_err();
    assert!(matches!(err, WmsError::InsufficientStock { .. }));
    assert_eq!(engine.ledger().get("SKU-1", "WH-A").unwrap().on_hand_qty, 5);
    assert_eq!(engine.ledger().get("SKU-1", "WH-B").unwrap().on_hand_qty, 1);

    let transfer = engine.create_transfer("SKU-1", "WH-A", "WH-B", 5, "補貨").unwrap();
    engine.process_transfer(transfer.id).unwrap();
    assert_eq!(engine.ledger().available("SKU-1", "WH-B"), 6);
}

#[tokio::test]
async fn test_packing_requires_completed_pick() {
    let engine = engine();
    add_warehouse(&engine, Warehouse::new("WH-A", GeoPoint::new(0.0, 1.0), 100));
    engine
        .repositories()
        .packing
        .save_station(PackingStation::new("PS-1", "WH-A"));
    engine.ledger().adjust("SKU-1", "WH-A", 5).unwrap();

    let order = Order::new(
        "SO-P",
        GeoPoint::new(0.0, 0.0),
        vec![OrderItem::new("SKU-1", 2, Money::from_major(10))],
    );
    engine.route(&order).unwrap();

    // 派倉後、入波次後、揀貨中都不能包裝
    assert!(matches!(
        engine.assign_to_packing("SO-P"),
        Err(WmsError::InvalidStateTransition { .. })
    ));
    let wave = engine.build_waves("WH-A").unwrap().remove(0);
    assert!(matches!(
        engine.assign_to_packing("SO-P"),
        Err(WmsError::InvalidStateTransition { .. })
    ));
    engine.start_wave(wave.id, vec!["picker-1".to_string()]).unwrap();
    assert!(matches!(
        engine.assign_to_packing("SO-P"),
        Err(WmsError::InvalidStateTransition { .. })
    ));
    engine.complete_wave(wave.id).unwrap();

    let task = engine.assign_to_packing("SO-P").unwrap();
    engine.start_packing(task.id).unwrap();
    engine.complete_packing(task.id).unwrap();
    let rates = engine.quote_order("SO-P").await.unwrap();
    engine.ship_order("SO-P", &rates[0]).await.unwrap();

    let record = engine.ledger().get("SKU-1", "WH-A").unwrap();
    assert_eq!(record.reserved_qty, 0);
    assert_eq!(record.on_hand_qty, 3);
    assert_eq!(record.available_qty, 3);
}

/// 走完波次揀貨、包裝與出貨
async fn fulfill_and_ship(engine: &FulfillmentEngine, order_id: &str, warehouse_id: &str) {
    engine
        .repositories()
        .packing
        .save_station(PackingStation::new(format!("PS-{}", order_id), warehouse_id));
    for wave in engine.build_waves(warehouse_id).unwrap() {
        engine.start_wave(wave.id, vec!["picker-1".to_string()]).unwrap();
        engine.complete_wave(wave.id).unwrap();
    }
    let task = engine.assign_to_packing(order_id).unwrap();
    engine.start_packing(task.id).unwrap();
    engine.complete_packing(task.id).unwrap();
    let rates = engine.quote_order(order_id).await.unwrap();
    engine.ship_order(order_id, &rates[0]).await.unwrap();
}

#[test]
fn test_return_before_shipment_is_rejected() {
    let engine = engine();
    add_warehouse(&engine, Warehouse::new("WH-A", GeoPoint::new(0.0, 1.0), 100));
    engine.ledger().adjust("SKU-1", "WH-A", 2).unwrap();

    let order = Order::new(
        "SO-N",
        GeoPoint::new(0.0, 0.0),
        vec![OrderItem::new("SKU-1", 2, Money::from_major(25))],
    );
    engine.route(&order).unwrap();

    assert!(matches!(
        engine.process_return("SO-N", "SKU-1", 2, ItemCondition::New),
        Err(WmsError::InvalidStateTransition { .. })
    ));
    let record = engine.ledger().get("SKU-1", "WH-A").unwrap();
    assert_eq!((record.on_hand_qty, record.reserved_qty), (2, 2));
}

#[tokio::test]
async fn test_shortage_lines_cannot_be_returned() {
    let engine = engine();
    add_warehouse(&engine, Warehouse::new("WH-A", GeoPoint::new(0.0, 1.0), 100));
    engine.ledger().adjust("SKU-1", "WH-A", 2).unwrap();

    // 訂購 3 件，只有 2 件可保留
    let order = Order::new(
        "SO-S",
        GeoPoint::new(0.0, 0.0),
        vec![OrderItem::new("SKU-1", 3, Money::from_major(25))],
    );
    engine.route(&order).unwrap();
    fulfill_and_ship(&engine, "SO-S", "WH-A").await;
    assert_eq!(engine.ledger().get("SKU-1", "WH-A").unwrap().on_hand_qty, 0);

    assert!(matches!(
        engine.process_return("SO-S", "SKU-1", 3, ItemCondition::New),
        Err(WmsError::InvalidInput(_))
    ));
    engine
        .process_return("SO-S", "SKU-1", 2, ItemCondition::New)
        .unwrap();
    assert_eq!(engine.ledger().get("SKU-1", "WH-A").unwrap().on_hand_qty, 2);
}

#[tokio::test]
async fn test_damaged_return_is_not_restocked() {
    let engine = engine();
    add_warehouse(&engine, Warehouse::new("WH-A", GeoPoint::new(0.0, 1.0), 100));
    engine.ledger().adjust("SKU-1", "WH-A", 3).unwrap();

    let order = Order::new(
        "SO-R",
        GeoPoint::new(0.0, 0.0),
        vec![OrderItem::new("SKU-1", 3, Money::from_major(25))],
    );
    engine.route(&order).unwrap();
    fulfill_and_ship(&engine, "SO-R", "WH-A").await;
    let before = engine.ledger().get("SKU-1", "WH-A").unwrap();

    let request = engine
        .process_return("SO-R", "SKU-1", 1, ItemCondition::Damaged)
        .unwrap();
    assert!(!request.restockable);
    assert!(request.restocked_warehouse_id.is_none());
    assert_eq!(engine.ledger().get("SKU-1", "WH-A").unwrap(), before);
}

#[rstest]
#[case(ItemCondition::New, true)]
#[case(ItemCondition::Opened, true)]
#[case(ItemCondition::Damaged, false)]
#[tokio::test]
async fn test_return_restock_by_condition(#[case] condition: ItemCondition, #[case] restocked: bool) {
    let engine = engine();
    add_warehouse(&engine, Warehouse::new("WH-A", GeoPoint::new(0.0, 1.0), 100));
    engine.ledger().adjust("SKU-1", "WH-A", 2).unwrap();

    let order = Order::new(
        "SO-C",
        GeoPoint::new(0.0, 0.0),
        vec![OrderItem::new("SKU-1", 2, Money::from_major(25))],
    );
    engine.route(&order).unwrap();
    fulfill_and_ship(&engine, "SO-C", "WH-A").await;
    assert_eq!(engine.ledger().get("SKU-1", "WH-A").unwrap().on_hand_qty, 0);

    let request = engine.process_return("SO-C", "SKU-1", 2, condition).unwrap();
    assert_eq!(request.refund_amount, Money::from_major(50));
    assert_eq!(request.restockable, restocked);

    let expected_on_hand = if restocked { 2 } else { 0 };
    let record = engine.ledger().get("SKU-1", "WH-A").unwrap();
    assert_eq!(record.on_hand_qty, expected_on_hand);
    assert_eq!(record.reserved_qty, 0);
}

#[tokio::test]
async fn test_rates_express_is_one_and_a_half_standard() {
    let engine = engine();
    let shipment = ShipmentSpec {
        origin: GeoPoint::new(25.03, 121.56),
        destination: GeoPoint::new(22.63, 120.30),
        weight_grams: 3_000,
        dimensions: Dimensions::new(45, 35, 30),
    };
    let rates = engine.get_rates(&shipment).await.unwrap();

    assert!(rates.windows(2).all(|w| w[0].cost <= w[1].cost));
    for carrier in ["ACME", "SWIFT"] {
        let standard = rates
            .iter()
            .find(|r| r.carrier == carrier && r.service == ServiceLevel::Standard)
            .unwrap();
        let express = rates
            .iter()
            .find(|r| r.carrier == carrier && r.service == ServiceLevel::Express)
            .unwrap();
        assert_eq!(express.cost, standard.cost.mul_ratio(3, 2));
        assert_eq!(express.estimated_days, standard.estimated_days.saturating_sub(2).max(1));
    }
}

#[test]
fn test_concurrent_routing_never_oversells() {
    let engine = Arc::new(engine());
    add_warehouse(&engine, Warehouse::new("WH-A", GeoPoint::new(0.0, 1.0), 100));
    engine.ledger().adjust("SKU-HOT", "WH-A", 5).unwrap();

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let order = Order::new(
                    format!("SO-{}", i),
                    GeoPoint::new(0.0, 0.0),
                    vec![OrderItem::new("SKU-HOT", 1, Money::from_major(10))],
                );
                engine.route(&order).map(|_| ())
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let record = engine.ledger().get("SKU-HOT", "WH-A").unwrap();
    assert_eq!(record.reserved_qty, 5);
    assert_eq!(record.available_qty, 0);
    assert!(record.is_consistent());

    let shortages = (0..20)
        .filter_map(|i| engine.repositories().orders.get_assignment(&format!("SO-{}", i)))
        .filter(|a| a.is_partial())
        .count();
    assert_eq!(shortages, 15);
}
