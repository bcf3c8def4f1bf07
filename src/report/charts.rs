use std::error::Error;
use std::fs;
use std::path::Path;

use build_html::{Container, ContainerType, Html, HtmlContainer, HtmlPage};
use log::info;
use plotly::{
    common::{AxisSide, DashType, Line, Mode, Title},
    layout::Axis,
    Layout, Pie, Plot, Scatter,
};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde_json::{json, Value};

use crate::db::{
    carbon_intensity_archive::RegionIntensityAverage,
    electricity_costs_archive::CostIntensityAverage,
};
use crate::elec::{dno::DnoRegion, fuel::Fuel};

const INTENSITY_COLOR: &str = "#d62728";
const PRICE_COLOR: &str = "#1f77b4";
const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

fn to_f64(x: Decimal) -> f64 {
    x.to_f64().unwrap_or(f64::NAN)
}

fn dual_axis_layout(title: &str) -> Layout {
    Layout::new()
        .title(Title::with_text(title))
        .x_axis(Axis::new().title(Title::with_text("Time")).tick_angle(-60.0))
        .y_axis(
            Axis::new()
                .title(Title::with_text("Carbon Intensity (gCO2/kWh)"))
                .color(INTENSITY_COLOR),
        )
        .y_axis2(
            Axis::new()
                .title(Title::with_text("p/kWh"))
                .color(PRICE_COLOR)
                .overlaying("y")
                .side(AxisSide::Right),
        )
}

/// Average carbon intensity (left axis) and average price (right axis) over
/// the half hours of the day for one region.
pub fn cost_intensity_line_chart(region: &str, data: &[CostIntensityAverage]) -> Plot {
    let x: Vec<String> = data
        .iter()
        .map(|e| e.half_hour_start.strftime("%H:%M").to_string())
        .collect();
    let y1: Vec<f64> = data.iter().map(|e| to_f64(e.intensity)).collect();
    let y2: Vec<f64> = data.iter().map(|e| to_f64(e.price)).collect();
    let intensity = Scatter::new(x.clone(), y1)
        .name("Carbon intensity")
        .mode(Mode::Lines)
        .line(Line::new().color(INTENSITY_COLOR));
    let price = Scatter::new(x, y2)
        .name("Price")
        .mode(Mode::Lines)
        .line(Line::new().color(PRICE_COLOR))
        .y_axis("y2");

    let mut plot = Plot::new();
    plot.add_trace(intensity);
    plot.add_trace(price);
    let title = format!(
        "Average Carbon Intensity vs. Average Electricity Costs in {} Over Time",
        region
    );
    plot.set_layout(dual_axis_layout(&title));
    plot
}

/// Same as [cost_intensity_line_chart] but with all the regions in one figure.
/// Prices are dashed.
pub fn cost_intensity_line_chart_all(data: &[(String, Vec<CostIntensityAverage>)]) -> Plot {
    let mut plot = Plot::new();
    for (region, averages) in data {
        let x: Vec<String> = averages
            .iter()
            .map(|e| e.half_hour_start.strftime("%H:%M").to_string())
            .collect();
        let y1: Vec<f64> = averages.iter().map(|e| to_f64(e.intensity)).collect();
        let y2: Vec<f64> = averages.iter().map(|e| to_f64(e.price)).collect();
        plot.add_trace(
            Scatter::new(x.clone(), y1)
                .name(format!("{} intensity", region).as_str())
                .legend_group(region.as_str())
                .mode(Mode::Lines),
        );
        plot.add_trace(
            Scatter::new(x, y2)
                .name(format!("{} price", region).as_str())
                .legend_group(region.as_str())
                .mode(Mode::Lines)
                .line(Line::new().dash(DashType::Dash))
                .y_axis("y2"),
        );
    }
    plot.set_layout(dual_axis_layout(
        "Average Carbon Intensity vs. Average Electricity Costs by DNO Region",
    ));
    plot
}

pub fn generation_mix_pie_chart(mix: &[(Fuel, Decimal)]) -> Plot {
    let labels: Vec<String> = mix.iter().map(|(fuel, _)| fuel.label().to_string()).collect();
    let values: Vec<f64> = mix.iter().map(|(_, v)| to_f64(*v)).collect();
    let mut plot = Plot::new();
    plot.add_trace(Pie::new(values).labels(labels));
    plot.set_layout(Layout::new().title(Title::with_text("UK Power Generation Mix by Source")));
    plot
}

/// A standalone html page with a plotly.js choropleth of the average carbon
/// intensity by DNO region.  The GeoJSON features need an `ID` property with
/// the DNO id (10-23) and lon/lat coordinates.  Regions which are not DNO
/// regions (e.g. Scotland) are left out.
pub fn intensity_choropleth_html(geojson: &Value, averages: &[RegionIntensityAverage]) -> String {
    let mut ids: Vec<u8> = Vec::new();
    let mut names: Vec<String> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    for avg in averages {
        if let Ok(region) = avg.region.parse::<DnoRegion>() {
            ids.push(region.dno_id());
            names.push(region.name().to_string());
            values.push(to_f64(avg.intensity));
        }
    }
    let figure = json!({
        "data": [{
            "type": "choropleth",
            "geojson": geojson,
            "featureidkey": "properties.ID",
            "locations": ids,
            "z": values,
            "text": names,
            "colorscale": "YlOrRd",
            "marker": {"line": {"color": "grey", "width": 0.1}},
            "colorbar": {"title": {"text": "(gCO2/kWh)"}},
        }],
        "layout": {
            "title": {"text": "Average Carbon Intensity by UK DNO Regions"},
            "geo": {"fitbounds": "locations", "visible": false},
        },
    });
    HtmlPage::new()
        .with_title("Average Carbon Intensity by UK DNO Regions")
        .with_script_link(PLOTLY_JS)
        .with_container(
            Container::new(ContainerType::Div)
                .with_attributes([("id", "map"), ("style", "width:100%;height:90vh;")]),
        )
        .with_raw(format!(
            "<script>var figure = {}; Plotly.newPlot('map', figure.data, figure.layout);</script>",
            figure
        ))
        .to_html_string()
}

/// Write the plot as a standalone html file.
pub fn write_plot(plot: &Plot, path: &Path) -> Result<(), Box<dyn Error>> {
    write_html(&plot.to_html(), path)
}

pub fn write_html(html: &str, path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, html)?;
    info!("wrote {}", path.display());
    Ok(())
}
