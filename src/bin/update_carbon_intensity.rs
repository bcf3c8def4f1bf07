use std::{error::Error, path::Path};

use clap::Parser;
use duckdb::Connection;
use jiff::civil::Date;
use log::{error, info};
use ukgrid::db::prod_db::ProdDb;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// First day to download, e.g. 2024-04-21
    #[arg(long)]
    start: Date,

    /// Last day to download, inclusive
    #[arg(long)]
    end: Date,

    /// Carbon intensity region ids, e.g. 1,2,13.  Defaults to the 14 DNO regions.
    #[arg(long, value_delimiter = ',')]
    regions: Vec<u8>,

    /// Insert at most this many new rows per region and table
    #[arg(long)]
    limit: Option<usize>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let env_file = format!(".env/{}.env", args.env);
    if Path::new(&env_file).exists() {
        dotenvy::from_path(Path::new(&env_file))?;
    }

    let regions: Vec<u8> = if args.regions.is_empty() {
        (1..=14).collect()
    } else {
        args.regions
    };

    let archive = ProdDb::carbon_intensity();
    let mut conn = Connection::open(archive.duckdb_path.clone())?;
    for region_id in regions {
        match archive.update_duckdb(&mut conn, args.start, args.end, region_id, args.limit) {
            Ok((n1, n2)) => info!(
                "region {}: inserted {} intensity and {} generation mix rows",
                region_id, n1, n2
            ),
            Err(e) => {
                error!("region {}: {}", region_id, e);
                return Err(e);
            }
        }
    }
    info!(
        "carbon_intensity has {} rows, generation_mix has {} rows",
        archive.count_intensity(&conn)?,
        archive.count_generation_mix(&conn)?
    );

    Ok(())
}
