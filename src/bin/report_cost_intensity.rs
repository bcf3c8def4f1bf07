use std::{error::Error, fs, path::Path};

use clap::Parser;
use duckdb::Connection;
use log::{error, info, warn};
use serde_json::Value;
use ukgrid::{
    db::prod_db::ProdDb,
    elec::dno::DnoRegion,
    report::{charts, summary},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Region for the single region line chart
    #[arg(long, default_value = "London")]
    region: DnoRegion,

    /// GeoJSON file with the DNO region boundaries (lon/lat) and an `ID`
    /// property.  No map is made if missing.
    #[arg(long)]
    geojson: Option<String>,
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

    let carbon = ProdDb::carbon_intensity();
    let costs = ProdDb::electricity_costs();
    let conn = Connection::open(ProdDb::duckdb_path())?;
    carbon.setup(&conn)?;
    costs.setup(&conn)?;
    let out_dir = Path::new(&ProdDb::report_dir()).to_path_buf();

    // CSV summary for the map
    let by_region = carbon.average_intensity_by_region(&conn)?;
    let csv_path = out_dir.join(summary::INTENSITY_CSV);
    if let Err(e) = summary::write_intensity_csv(&csv_path, &by_region) {
        error!("failed to write {}: {}", csv_path.display(), e);
    }
    println!(
        "Average carbon intensity by region:\n{}",
        summary::region_intensity_table(&by_region)
    );

    // Cost vs. intensity for one region, then all of them
    let region = args.region.name();
    let data = costs.average_cost_intensity_by_time(&conn, region)?;
    if data.is_empty() {
        warn!("no overlapping prices and carbon intensity for {}", region);
    } else {
        println!("{}:\n{}", region, summary::cost_intensity_table(&data));
        let plot = charts::cost_intensity_line_chart(region, &data);
        let file = format!("cost_intensity_{}.html", region.replace(' ', "_").to_lowercase());
        if let Err(e) = charts::write_plot(&plot, &out_dir.join(file)) {
            error!("{}", e);
        }
    }

    let mut all = Vec::new();
    for r in DnoRegion::ALL {
        let data = costs.average_cost_intensity_by_time(&conn, r.name())?;
        if !data.is_empty() {
            all.push((r.name().to_string(), data));
        }
    }
    if !all.is_empty() {
        let plot = charts::cost_intensity_line_chart_all(&all);
        let path = out_dir.join("cost_intensity_all_regions.html");
        if let Err(e) = charts::write_plot(&plot, &path) {
            error!("{}", e);
        }
    }

    // Generation mix
    let mix = carbon.average_generation_mix(&conn)?;
    if mix.is_empty() {
        warn!("no generation mix data");
    } else {
        println!("Average generation mix:\n{}", summary::generation_mix_table(&mix));
        let plot = charts::generation_mix_pie_chart(&mix);
        if let Err(e) = charts::write_plot(&plot, &out_dir.join("generation_mix.html")) {
            error!("{}", e);
        }
    }

    // Map
    if let Some(path) = args.geojson {
        match fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str::<Value>(&s).map_err(|e| e.to_string()))
        {
            Ok(geojson) => {
                let html = charts::intensity_choropleth_html(&geojson, &by_region);
                if let Err(e) = charts::write_html(&html, &out_dir.join("intensity_map.html")) {
                    error!("{}", e);
                }
            }
            Err(e) => error!("failed to read {}: {}", path, e),
        }
    }

    info!("done");
    Ok(())
}
