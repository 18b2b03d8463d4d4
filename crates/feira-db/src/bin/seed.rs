//! # Seed Data Generator
//!
//! Populates the database with demo catalog, customers and loyalty
//! configuration for development.
//!
//! ## Usage
//! ```bash
//! # Seed into the default dev database
//! cargo run -p feira-db --bin seed
//!
//! # Specify database path
//! cargo run -p feira-db --bin seed -- --db ./data/feira.db
//! ```
//!
//! Administrators are not seeded here: registering one requires hashing a
//! credential, which is feira-engine's job
//! (`ReconciliationEngine::register_admin`).

use chrono::Utc;
use std::env;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use feira_core::{Category, PointsConfig, Product};
use feira_db::{Database, DbConfig};

/// Demo catalog: (name, category, price in centavos, cost, stock).
const PRODUCTS: &[(&str, Category, i64, i64, i64)] = &[
    ("Pastel de Queijo", Category::Food, 800, 300, 120),
    ("Pastel de Carne", Category::Food, 900, 350, 120),
    ("Cachorro-Quente", Category::Food, 1000, 400, 80),
    ("Pão com Linguiça", Category::Food, 1200, 500, 60),
    ("Refrigerante Lata", Category::Drink, 500, 250, 200),
    ("Água Mineral", Category::Drink, 300, 120, 200),
    ("Suco Natural", Category::Drink, 700, 300, 90),
    ("Quentão", Category::Drink, 600, 200, 100),
    ("Bolo de Milho (fatia)", Category::Sweet, 600, 200, 70),
    ("Canjica", Category::Sweet, 700, 250, 50),
    ("Paçoca", Category::Sweet, 250, 100, 300),
    ("Maçã do Amor", Category::Sweet, 500, 180, 80),
    ("Pano de Prato Bordado", Category::Bazaar, 1500, 0, 40),
    ("Crochê Pequeno", Category::Bazaar, 2000, 0, 25),
    ("Rifa (número)", Category::Other, 200, 0, 500),
];

/// Demo customers: (phone digits, name, starting points).
const CUSTOMERS: &[(&str, &str)] = &[
    ("11987654321", "Maria Silva"),
    ("11912345678", "José Santos"),
    ("21998877665", "Ana Souza"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./feira_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Feira POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./feira_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Feira POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing products
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding catalog...");

    let now = Utc::now();
    for (name, category, price_cents, cost_cents, stock) in PRODUCTS {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            category: *category,
            price_cents: *price_cents,
            cost_cents: *cost_cents,
            stock: *stock,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await?;
    }
    println!("  {} products", PRODUCTS.len());

    println!("Seeding customers...");
    for (phone, name) in CUSTOMERS {
        db.customers().get_or_create(phone, name).await?;
    }
    println!("  {} customers", CUSTOMERS.len());

    println!("Seeding points configuration...");
    let config = PointsConfig::new(10) // one point worth R$0,10
        .with_rate(Category::Food, 5)
        .with_rate(Category::Drink, 2)
        .with_rate(Category::Sweet, 3)
        .with_rate(Category::Bazaar, 10);
    db.points_config().update(&config).await?;
    println!("  point value R$0,10 + {} category rates", config.rates.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
