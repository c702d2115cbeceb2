//! Query demo for exaquery.
//!
//! Runs a small script, walks the first levels of the explorer tree and
//! browses a few records.
//!
//! Note: This demo requires a running Exasol database instance. Connection
//! settings come from `EXASOL_HOST`, `EXASOL_PORT`, `EXASOL_USER`,
//! `EXASOL_PASSWORD` and friends.

use exaquery::{Driver, DriverConfig, ExecuteOptions, ExplorerNode, LogConfig};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("=== exaquery Query Demo ===\n");

    let config = DriverConfig::from_env()?.with_logging(LogConfig::default().level("info"));
    let driver = Driver::new(config);

    // 1. Check the connection
    println!("1. Testing connection...");
    driver.test_connection().await?;
    println!("   OK (connection id {})\n", driver.connection_id());

    // 2. Run a script; each statement gets its own result
    println!("2. Running a script...");
    let script = "SELECT 1 AS one, 'two' AS two; SELECT * FROM NO_SUCH_TABLE; \
                  SELECT LEVEL AS n FROM DUAL CONNECT BY LEVEL <= 2500";
    let options = ExecuteOptions::default().with_request_id("demo");
    for result in driver.execute(script, &options).await? {
        match result {
            Ok(result) => {
                println!("   {} ({})", result.message, result.query);
                if let Some(row) = result.rows.first() {
                    println!("   first row: {}", serde_json::to_string(row)?);
                }
            }
            Err(e) => println!("   error: {e}"),
        }
    }
    println!();

    // 3. Explore the first schema
    println!("3. Exploring...");
    let schemas = driver.get_children(&ExplorerNode::Connection).await?;
    println!("   {} schemas", schemas.len());
    if let Some(node) = schemas.first().and_then(|s| s.node()) {
        for group in driver.get_children(&node).await? {
            let Some(group_node) = group.node() else { continue };
            let objects = driver.get_children(&group_node).await?;
            println!("   {}: {}", group.label, objects.len());

            if let Some(ExplorerNode::Table(table)) = objects.first().and_then(|o| o.node()) {
                // 4. Browse the first table found
                let total = driver.count_records(&table).await?;
                let page = driver.fetch_records(&table, Some(5), None).await?;
                println!("   {table}: {total} records, showing {}", page.rows.len());
            }
        }
    }

    let stats = driver.cache_stats();
    println!("\nCache: {} hits, {} misses", stats.hits, stats.misses);

    driver.close().await?;
    println!("\n=== Demo completed successfully ===");
    Ok(())
}
