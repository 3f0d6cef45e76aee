use rand::rngs::StdRng;
use rand::SeedableRng;
use shop_allocator::io::reporting;
use shop_allocator::io::synthetic::{generate_market, SyntheticMarket};
use shop_allocator::io::telemetry::{load_telemetry, Telemetry};
use shop_allocator::{Result, ShopConfig, ShopError, ShopManager};
use std::env;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: shop-allocator (--telemetry FILE | --synthetic SEED) \
[--config FILE] [--reference SHOP_ID] [--report FILE] [--default-prices]";

/// Where the shop telemetry comes from.
#[derive(Debug)]
enum Source {
    Telemetry(PathBuf),
    Synthetic(u64),
}

#[derive(Debug)]
struct Args {
    source: Source,
    config: Option<PathBuf>,
    reference: Option<u64>,
    report: PathBuf,
    default_prices: bool,
}

fn parse_args() -> Result<Args> {
    let mut source = None;
    let mut config = None;
    let mut reference = None;
    let mut report = PathBuf::from("cycle_report.csv");
    let mut default_prices = false;

    let mut args = env::args().skip(1);
    while let Some(flag) = args.next() {
        let mut value = || {
            args.next()
                .ok_or_else(|| ShopError::Config(format!("{} needs a value\n{}", flag, USAGE)))
        };
        match flag.as_str() {
            "--telemetry" => source = Some(Source::Telemetry(PathBuf::from(value()?))),
            "--synthetic" => {
                let seed = value()?;
                let seed = seed
                    .parse()
                    .map_err(|_| ShopError::Config(format!("bad seed {:?}", seed)))?;
                source = Some(Source::Synthetic(seed));
            }
            "--config" => config = Some(PathBuf::from(value()?)),
            "--reference" => {
                let id = value()?;
                let id = id
                    .parse()
                    .map_err(|_| ShopError::Config(format!("bad shop id {:?}", id)))?;
                reference = Some(id);
            }
            "--report" => report = PathBuf::from(value()?),
            "--default-prices" => default_prices = true,
            other => {
                return Err(ShopError::Config(format!(
                    "unknown argument {:?}\n{}",
                    other, USAGE
                )))
            }
        }
    }

    let source = source.ok_or_else(|| ShopError::Config(USAGE.to_string()))?;
    Ok(Args {
        source,
        config,
        reference,
        report,
        default_prices,
    })
}

fn run(args: Args) -> Result<()> {
    // 1. CONFIGURATION
    let config = match &args.config {
        Some(path) => ShopConfig::from_json_file(path)?,
        None => ShopConfig::default(),
    };

    // 2. TELEMETRY
    let telemetry: Telemetry = match &args.source {
        Source::Telemetry(path) => load_telemetry(path)?,
        Source::Synthetic(seed) => {
            let mut rng = StdRng::seed_from_u64(*seed);
            generate_market(&SyntheticMarket::default(), &mut rng)?
        }
    };
    let reference = match args.reference {
        Some(id) => id,
        None => telemetry
            .shops
            .first()
            .map(|s| s.id)
            .ok_or_else(|| ShopError::Config("telemetry lists no shops".to_string()))?,
    };
    info!(shops = telemetry.shops.len(), reference, "loaded telemetry");

    // 3. RUN ONE CYCLE
    let today = chrono::Local::now().date_naive();
    let mut manager = ShopManager::new(telemetry.game, config, today);
    if args.default_prices {
        for shop in &telemetry.shops {
            manager.set_default_prices(shop.id)?;
        }
    }
    let report = manager.manage_shops(&telemetry.shops, reference)?;

    // 4. EXPORT RESULTS
    reporting::write_cycle_report(&args.report, &report)?;

    // 5. SUMMARY
    println!("\n=== Cycle {} ===", report.date);
    for plan in &report.plans {
        println!(
            "product {}: {} of {} units allocated, clearance rate {:.0}%",
            plan.product_id,
            report.total_allocated(plan.product_id),
            plan.quantity_to_distribute,
            plan.clearance_rate * 100.0
        );
    }
    println!("Units shipped back: {}", report.total_repatriated());
    if !report.unknown_markets.is_empty() {
        println!("Skipped (unknown market): {:?}", report.unknown_markets);
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shop_allocator=info")),
        )
        .init();

    let result = parse_args().and_then(run);
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
