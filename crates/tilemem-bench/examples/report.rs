//! Report driver: runs the scripted scenario on a 64 KiB heap and prints
//! the free-space survey after every step.
//!
//! Run with:
//!   cargo run -p tilemem-bench --example report
//!
//! Pass `debug` or `trace` as the first argument to see heap log output.

use log::LevelFilter;
use simple_logger::SimpleLogger;
use tilemem::Heap;
use tilemem_test_utils::fixtures::{report_heap, run_report_scenario};

fn report(label: &str, heap: &Heap) {
    println!("{label}: ");
    println!("{}", heap.stats());
    println!();
}

fn main() {
    let level = match std::env::args().nth(1).as_deref() {
        Some("trace") => LevelFilter::Trace,
        Some("debug") => LevelFilter::Debug,
        _ => LevelFilter::Warn,
    };
    SimpleLogger::new().with_level(level).init().unwrap();

    let mut heap = report_heap();
    if let Err(err) = run_report_scenario(&mut heap, report) {
        eprintln!("scenario failed: {err}");
        std::process::exit(1);
    }

    let metrics = heap.metrics();
    println!(
        "{} allocations, {} deallocations, {} splits, {} bytes in use",
        metrics.allocations, metrics.deallocations, metrics.splits, metrics.bytes_in_use
    );
}
