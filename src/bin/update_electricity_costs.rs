use std::{error::Error, path::Path};

use clap::Parser;
use duckdb::Connection;
use jiff::civil::Date;
use log::{error, info};
use ukgrid::{api::electricity_costs::Voltage, db::prod_db::ProdDb, elec::dno::DnoRegion};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// First day to download, e.g. 2024-04-09
    #[arg(long)]
    start: Date,

    /// Last day to download, inclusive
    #[arg(long)]
    end: Date,

    /// DNO ids (10-23) or region names.  Defaults to all the DNO regions.
    #[arg(long, value_delimiter = ',')]
    dnos: Vec<DnoRegion>,

    /// Voltage level: HV, LV or LV-Sub
    #[arg(long, default_value = "HV")]
    voltage: Voltage,

    /// Insert at most this many new rows per region
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

    let regions: Vec<DnoRegion> = if args.dnos.is_empty() {
        DnoRegion::ALL.to_vec()
    } else {
        args.dnos
    };

    let archive = ProdDb::electricity_costs();
    let mut conn = Connection::open(archive.duckdb_path.clone())?;
    for region in regions {
        match archive.update_duckdb(
            &mut conn,
            args.start,
            args.end,
            region,
            args.voltage,
            args.limit,
        ) {
            Ok(n) => info!("{}: inserted {} rows", region, n),
            Err(e) => {
                error!("{}: {}", region, e);
                return Err(e);
            }
        }
    }
    info!("electricity_costs has {} rows", archive.count(&conn)?);

    Ok(())
}
