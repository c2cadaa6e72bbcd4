use std::sync::Arc;

use heapdb::common::TransactionId;
use heapdb::database::Database;
use heapdb::execution::{
    Aggregate, AggregateOp, Filter, Insert, OpIterator, Predicate, SeqScan, TupleIterator,
};
use heapdb::storage::HeapFile;
use heapdb::tuple::{Field, FieldType, Op, Tuple, TupleDesc};

fn main() -> heapdb::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("heapdb - a disk-oriented relational engine in Rust");
    println!("==================================================\n");

    let db = Arc::new(Database::new(50));

    // Register a two-column table backed by demo.dat
    let desc = Arc::new(TupleDesc::named(
        vec![FieldType::Int, FieldType::Int],
        &["k", "v"],
    ));
    let file = Arc::new(HeapFile::open("demo.dat", desc.clone())?);
    let table = db.catalog().add_table(file, "demo", "k");
    println!("Registered table 'demo' as {}", table);

    // Insert a few rows through the operator pipeline
    let tid = TransactionId::new();
    let rows: Vec<Tuple> = [(1, 10), (1, 30), (2, 50), (2, 70), (2, 90)]
        .iter()
        .map(|&(k, v)| Tuple::from_fields(desc.clone(), vec![Field::Int(k), Field::Int(v)]))
        .collect();
    let feed = Box::new(TupleIterator::new(desc, rows));
    let mut insert = Insert::new(db.clone(), tid, feed, table)?;
    insert.open()?;
    println!("Inserted {} rows", insert.next()?.field(0)?);
    insert.close();

    // Scan back everything with v > 20
    let scan = Box::new(SeqScan::new(db.clone(), tid, table, "d")?);
    let mut filter = Filter::new(Predicate::new(1, Op::GreaterThan, Field::Int(20)), scan);
    filter.open()?;
    println!("\nRows with v > 20:");
    while filter.has_next()? {
        println!("  {}", filter.next()?);
    }
    filter.close();

    // Group by k, summing v
    let scan = Box::new(SeqScan::new(db.clone(), tid, table, "d")?);
    let mut sums = Aggregate::new(scan, 1, Some(0), AggregateOp::Sum)?;
    sums.open()?;
    println!("\nSum of v per k:");
    while sums.has_next()? {
        println!("  {}", sums.next()?);
    }
    sums.close();

    db.buffer_pool().transaction_complete(tid, true)?;
    println!("\nCommitted");
    Ok(())
}
