//! Count app launches across runs, persisted to a file store.

use eventtally::{EventCache, FileStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("events.jsonl");

    for run in 1..=3 {
        let mut cache = EventCache::new(FileStore::open(&path)?);

        cache.fire("app_launch", 1);
        if run == 2 {
            cache.disable("rate_prompt");
        }

        let launches = cache.state("app_launch");
        println!(
            "run {run}: {} launches, launched in last day: {}",
            launches.count(),
            launches.occurred_in_last_day()
        );

        let report = cache.synchronize();
        for failure in &report.failures {
            eprintln!("{failure}");
        }
    }

    let mut cache = EventCache::new(FileStore::open(&path)?);
    for name in ["app_launch", "rate_prompt"] {
        println!("{}", cache.state(name));
    }

    Ok(())
}
