use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shop_allocator::io::synthetic::{generate_market, SyntheticMarket};
use shop_allocator::io::telemetry::read_telemetry;
use shop_allocator::{
    Geo, GameClient, ManagedShop, ShopConfig, ShopError, ShopManager, SimulatedGame,
    SupplyContract, TradeRecord,
};

const PRODUCT: u64 = 7;
const WAREHOUSE: u64 = 99;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn config() -> ShopConfig {
    ShopConfig {
        request_delay_ms: 0,
        ..ShopConfig::default()
    }
}

fn shop(id: u64) -> ManagedShop {
    ManagedShop {
        id,
        name: format!("Shop {}", id),
        geo: Geo::new(1, 2, id),
    }
}

fn contract(offer_id: u64, product_id: u64, quantity: u64) -> SupplyContract {
    SupplyContract {
        offer_id,
        product_id,
        supplier_id: WAREHOUSE,
        quantity_at_supplier_storage: quantity,
    }
}

#[allow(clippy::too_many_arguments)]
fn stock_shop(
    game: &mut SimulatedGame,
    shop_id: u64,
    quantity: u64,
    sold: u64,
    purchase: u64,
    stock: u64,
    price: f64,
    market_share: f64,
    clearance_price: f64,
) {
    game.add_contract(shop_id, contract(700 + shop_id, PRODUCT, quantity));
    game.add_shelf(
        shop_id,
        TradeRecord {
            product_id: PRODUCT,
            offer_ids: format!("{{{}}}", 7000 + shop_id),
            sold,
            purchase,
            stock,
            price,
            market_share,
        },
        clearance_price,
    );
}

/// Shop 1 sold out at the common price, shop 2 was left with stock.
fn two_shops() -> SimulatedGame {
    let mut game = SimulatedGame::new();
    stock_shop(&mut game, 1, 150, 100, 100, 100, 10.0, 0.01, 4.0);
    stock_shop(&mut game, 2, 150, 20, 40, 50, 10.0, 0.01, 4.0);
    game
}

#[test]
fn test_sold_out_shop_gets_more_and_charges_more() {
    let shops = [shop(1), shop(2)];
    let mut manager = ShopManager::new(two_shops(), config(), today());
    let report = manager.manage_shops(&shops, 1).unwrap();

    let plan = report.plan(PRODUCT).unwrap();
    // 150 in storage, 140 shipped last cycle: ship the midpoint
    assert_eq!(plan.quantity_to_distribute, 145);
    assert_eq!(plan.clearance_rate, 0.5);

    let a = report.row(1, PRODUCT).unwrap();
    let b = report.row(2, PRODUCT).unwrap();
    assert!(a.target_sale > 4 * b.target_sale);
    assert!(report.total_allocated(PRODUCT).abs_diff(145) <= 2);

    assert!(a.new_price > 10.0);
    assert!(b.new_price < 10.0);
    assert!(b.new_price >= 4.0);

    let game = manager.client();
    assert_eq!(game.last_order(1, 701).unwrap().quantity, a.target_sale);
    assert_eq!(game.last_order(2, 702).unwrap().quantity, b.target_sale);
    assert_eq!(game.shelf(1, PRODUCT).unwrap().record.price, a.new_price);
    assert_eq!(game.shelf(2, PRODUCT).unwrap().record.price, b.new_price);
}

#[test]
fn test_surplus_goes_back_to_the_warehouse() {
    let shops = [shop(1), shop(2)];
    let mut manager = ShopManager::new(two_shops(), config(), today());
    let report = manager.manage_shops(&shops, 1).unwrap();

    let b = report.row(2, PRODUCT).unwrap();
    // Shop 2 keeps target + sold, the rest of its 50 units leave
    let expected = 50 - (b.target_sale + 20);
    assert_eq!(b.repatriated, expected);
    assert_eq!(report.row(1, PRODUCT).unwrap().repatriated, 0);

    let game = manager.client();
    assert_eq!(game.moves.len(), 1);
    assert_eq!(game.moves[0].shop_id, 2);
    assert_eq!(game.moves[0].warehouse_id, WAREHOUSE);
    assert_eq!(game.shelf(2, PRODUCT).unwrap().record.stock, 50 - expected);
}

#[test]
fn test_cold_start_splits_by_market_size() {
    let mut game = SimulatedGame::new();
    stock_shop(&mut game, 1, 400, 0, 0, 0, 0.0, 0.0, 3.0);
    stock_shop(&mut game, 2, 400, 0, 0, 0, 0.0, 0.0, 3.0);
    game.set_retail_metrics(PRODUCT, shop(1).geo, 1000.0);
    game.set_retail_metrics(PRODUCT, shop(2).geo, 3000.0);

    let shops = [shop(1), shop(2)];
    let mut manager = ShopManager::new(game, config(), today());
    let report = manager.manage_shops(&shops, 1).unwrap();

    let a = report.row(1, PRODUCT).unwrap();
    let b = report.row(2, PRODUCT).unwrap();
    assert!(a.target_sale.abs_diff(100) <= 1, "{}", a.target_sale);
    assert!(b.target_sale.abs_diff(300) <= 1, "{}", b.target_sale);

    // No price yet: start at twice the clearance price
    assert_eq!(a.new_price, 6.0);
    assert_eq!(b.new_price, 6.0);
    assert_eq!(manager.client().metrics_reads, 2);
}

#[test]
fn test_unknown_market_is_left_out() {
    let mut game = two_shops();
    stock_shop(&mut game, 3, 150, 0, 0, 0, 0.0, 0.0, 4.0);

    let shops = [shop(1), shop(2), shop(3)];
    let mut manager = ShopManager::new(game, config(), today());
    let report = manager.manage_shops(&shops, 1).unwrap();

    assert_eq!(report.unknown_markets, vec![(3, PRODUCT)]);
    assert!(report.row(3, PRODUCT).is_none());
    assert_eq!(report.rows.len(), 2);
    assert!(manager.client().last_order(3, 703).is_none());
}

#[test]
fn test_unmanaged_products_keep_their_price() {
    let mut game = SimulatedGame::new();
    stock_shop(&mut game, 1, 50, 50, 60, 70, 10.0, 0.01, 4.0);
    // Contracted but no market data: left out of the cycle
    game.add_contract(1, contract(801, 8, 100));
    // On the shelf without any contract: outside the catalog
    for (product_id, price, clearance_price) in [(8, 25.0, 5.0), (9, 12.0, 2.0)] {
        game.add_shelf(
            1,
            TradeRecord {
                product_id,
                offer_ids: format!("{{{}}}", 7000 + product_id),
                sold: 0,
                purchase: 0,
                stock: 30,
                price,
                market_share: 0.0,
            },
            clearance_price,
        );
    }

    let mut manager = ShopManager::new(game, config(), today());
    let report = manager.manage_shops(&[shop(1)], 1).unwrap();

    assert_eq!(report.unknown_markets, vec![(1, 8)]);
    assert_eq!(report.rows.len(), 1);
    let game = manager.client();
    assert_eq!(game.shelf(1, 8).unwrap().record.price, 25.0);
    assert_eq!(game.shelf(1, 9).unwrap().record.price, 12.0);
    assert_eq!(game.shelf(1, PRODUCT).unwrap().record.price, 10.0);
    assert_eq!(game.trading_hall_reads, 2);
}

#[test]
fn test_on_target_shop_keeps_its_price() {
    let mut game = SimulatedGame::new();
    stock_shop(&mut game, 1, 50, 50, 60, 70, 10.0, 0.01, 4.0);

    let mut manager = ShopManager::new(game, config(), today());
    let report = manager.manage_shops(&[shop(1)], 1).unwrap();

    let row = report.row(1, PRODUCT).unwrap();
    assert_eq!(row.target_sale, 50);
    assert_eq!(row.new_price, 10.0);
    assert_eq!(row.repatriated, 0);
}

#[test]
fn test_trading_halls_are_read_once_per_day() {
    let shops = [shop(1), shop(2)];
    let mut manager = ShopManager::new(two_shops(), config(), today());

    manager.manage_shops(&shops, 1).unwrap();
    // One cached read and one clearance read-back per shop
    assert_eq!(manager.client().trading_hall_reads, 4);

    manager.manage_shops(&shops, 1).unwrap();
    assert_eq!(manager.client().trading_hall_reads, 6);

    manager.set_today(today().succ_opt().unwrap());
    manager.manage_shops(&shops, 1).unwrap();
    assert_eq!(manager.client().trading_hall_reads, 10);
}

#[test]
fn test_failed_read_aborts_the_cycle() {
    let mut game = two_shops();
    game.fail_trading_hall(2);

    let shops = [shop(1), shop(2)];
    let mut manager = ShopManager::new(game, config(), today());
    let result = manager.manage_shops(&shops, 1);

    assert!(matches!(result, Err(ShopError::Client(_))));
    assert!(manager.client().orders.is_empty());
}

#[test]
fn test_propagate_contracts() {
    let mut game = two_shops();
    game.add_contract(1, contract(800, 8, 60));

    let shops = [shop(1), shop(2)];
    let mut manager = ShopManager::new(game, config(), today());
    assert_eq!(manager.propagate_contracts(&shops, 1).unwrap(), 1);
    assert_eq!(manager.client().created_contracts, vec![(2, 800)]);
    assert_eq!(manager.propagate_contracts(&shops, 1).unwrap(), 0);

    let contracts = manager.client_mut().supply_contracts(2).unwrap();
    assert_eq!(contracts[&800].product_id, 8);
}

#[test]
fn test_set_default_prices() {
    let mut game = SimulatedGame::new();
    let shelves = [(1, 10.0, 4.0), (2, 3.0, 4.0), (3, 0.0, 2.5)];
    for (product_id, price, clearance_price) in shelves {
        game.add_shelf(
            1,
            TradeRecord {
                product_id,
                offer_ids: format!("{{{}}}", product_id),
                sold: 0,
                purchase: 0,
                stock: 10,
                price,
                market_share: 0.0,
            },
            clearance_price,
        );
    }

    let mut manager = ShopManager::new(game, config(), today());
    manager.set_default_prices(1).unwrap();

    let game = manager.client();
    assert_eq!(game.shelf(1, 1).unwrap().record.price, 10.0);
    assert_eq!(game.shelf(1, 2).unwrap().record.price, 4.0);
    assert_eq!(game.shelf(1, 3).unwrap().record.price, 5.0);
}

#[test]
fn test_prices_never_drop_below_clearance() {
    let mut rng = StdRng::seed_from_u64(42);
    let market = SyntheticMarket {
        shops: 12,
        products: 4,
        ..SyntheticMarket::default()
    };
    let telemetry = generate_market(&market, &mut rng).unwrap();
    let reference = telemetry.shops[0].id;

    let mut manager = ShopManager::new(telemetry.game, config(), today());
    let report = manager.manage_shops(&telemetry.shops, reference).unwrap();

    assert_eq!(report.rows.len(), market.shops * market.products);
    for row in &report.rows {
        assert!(row.new_price >= row.sale_price, "{:?}", row);
        assert_eq!(row.new_price, (row.new_price * 100.0).round() / 100.0);
    }
    for plan in &report.plans {
        let allocated = report.total_allocated(plan.product_id);
        assert!(allocated <= plan.quantity_to_distribute + market.shops as u64);
    }
}

#[test]
fn test_replays_csv_snapshot() {
    let snapshot = "\
shop_id,shop_name,country_id,region_id,city_id,product_id,offer_id,offer_ids,supplier_id,quantity_at_supplier_storage,sold,purchase,stock,price,market_share,clearance_price,local_market_size
1,North,10,20,30,7,701,{7001},99,150,100,100,100,10.0,0.01,4.0,
2,South,10,20,31,7,702,{7002},99,150,20,40,50,10.0,0.01,4.0,
";
    let telemetry = read_telemetry(snapshot.as_bytes()).unwrap();
    let mut manager = ShopManager::new(telemetry.game, config(), today());
    let report = manager.manage_shops(&telemetry.shops, 1).unwrap();

    assert_eq!(report.rows.len(), 2);
    assert!(report.row(1, PRODUCT).unwrap().new_price > 10.0);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cycle.csv");
    shop_allocator::io::reporting::write_cycle_report(&path, &report).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written.lines().count(), 3);
}
