//! `ccindex build-meta` - C7: fold every per-collection index into its
//! year index, then fold every year index into the master index.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ccindex_index::{build_master_index, build_year_index, CollectionRef, MasterIndexConfig, YearIndexConfig, YearRef};
use ccindex_core::Paths;
use clap::Args;

#[derive(Args, Debug)]
pub struct BuildMetaArgs {
    #[arg(long)]
    pub duckdb_root: PathBuf,
}

pub fn run(args: BuildMetaArgs) -> Result<i32> {
    let paths = Paths::new(PathBuf::new(), PathBuf::new(), args.duckdb_root.clone());

    let collection_db_dir = args.duckdb_root.join("cc_pointers_by_collection");
    let pattern = collection_db_dir.join("*.duckdb");
    let mut collection_dbs: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .context("invalid glob pattern")?
        .filter_map(|e| e.ok())
        .collect();
    collection_dbs.sort();

    let mut by_year: BTreeMap<String, Vec<CollectionRef>> = BTreeMap::new();
    for db_path in collection_dbs {
        let Some(collection) = db_path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        let year = ccindex_ingest::year_from_collection(&collection);
        by_year.entry(year).or_default().push(CollectionRef {
            collection,
            collection_db_path: db_path,
        });
    }

    if by_year.is_empty() {
        log::warn!("no per-collection indexes found under {}", collection_db_dir.display());
        return Ok(0);
    }

    let mut years = Vec::new();
    for (year, collections) in &by_year {
        let year_db_path = paths.year_db(year);
        let summary = build_year_index(&YearIndexConfig {
            year: year.clone(),
            year_db_path: year_db_path.clone(),
            collections: collections.clone(),
        })?;
        log::info!("build-meta: year {year}: {} collections registered", summary.collections_registered);
        years.push(YearRef { year: year.clone(), year_db_path });
    }

    let master_summary = build_master_index(&MasterIndexConfig {
        master_db_path: paths.master_db(),
        years,
    })?;
    log::info!(
        "build-meta: master index: {} years, {} collections summarized",
        master_summary.years_registered,
        master_summary.collections_summarized,
    );

    Ok(0)
}
