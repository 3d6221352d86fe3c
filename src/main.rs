pub mod config;
pub mod data;
pub mod fetch;
pub mod index;
pub mod legend;
pub mod render;
pub mod scale;
pub mod server;
pub mod trend;
pub mod types;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::AppConfig;
use index::CaseIndex;
use render::MapLevel;
use scale::CaseScale;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the data and render the maps and trend chart
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the rendered output with the tooltip query API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            let app_config = AppConfig::load_from_file(config)?;
            generate(&app_config).await?;
        }
        Commands::Serve { config } => {
            let app_config = AppConfig::load_from_file(config)?;

            println!("Loading data for API...");
            let boundary_text = fetch::load_text(&app_config.sources.boundaries).await?;
            let regions =
                data::parse_boundaries(&boundary_text, &app_config.sources.county_object)?;
            let csv_text = fetch::load_text(&app_config.sources.county_cases).await?;
            let reports = data::parse_case_csv(&csv_text)?;
            let index = CaseIndex::build(&reports, index::NYC_BOROUGH_ALIASES.clone());

            server::start_server(app_config, regions, index).await?;
        }
    }

    Ok(())
}

/// Run the three render pipelines. Each is independent: a fetch or parse
/// failure drops that visualization and is logged, the others still render.
async fn generate(config: &AppConfig) -> Result<()> {
    let county_svg = match county_pipeline(config).await {
        Ok(svg) => Some(svg),
        Err(e) => {
            tracing::error!("County map pipeline failed: {:#}", e);
            None
        }
    };

    let state_svg = match state_pipeline(config).await {
        Ok(svg) => Some(svg),
        Err(e) => {
            tracing::error!("State map pipeline failed: {:#}", e);
            None
        }
    };

    let trend_svg = match trend_pipeline(config).await {
        Ok(svg) => Some(svg),
        Err(e) => {
            tracing::error!("Trend chart pipeline failed: {:#}", e);
            None
        }
    };

    render::write_outputs(
        &config.output,
        county_svg.as_deref(),
        state_svg.as_deref(),
        trend_svg.as_deref(),
        &config.trend.state,
    )?;

    println!("Generation complete! Output in {:?}", config.output.dir);
    Ok(())
}

/// County choropleth: county shapes colored by case count, state borders
/// drawn on top.
async fn county_pipeline(config: &AppConfig) -> Result<String> {
    // The two fetches are independent; run them concurrently.
    let (boundary_text, csv_text) = tokio::try_join!(
        fetch::load_text(&config.sources.boundaries),
        fetch::load_text(&config.sources.county_cases),
    )?;

    let counties = data::parse_boundaries(&boundary_text, &config.sources.county_object)?;
    let states = data::parse_boundaries(&boundary_text, &config.sources.state_object)?;
    let reports = data::parse_case_csv(&csv_text)?;
    println!("Loaded {} counties and {} county case rows", counties.len(), reports.len());

    let index = CaseIndex::build(&reports, index::NYC_BOROUGH_ALIASES.clone());
    let scale = CaseScale::from_max(index.max_cases());

    Ok(render::render_choropleth(
        &counties,
        Some(&states),
        &index,
        &scale,
        &config.map,
        MapLevel::County,
    ))
}

/// State choropleth: same boundary file, state-level feed, no alias table.
async fn state_pipeline(config: &AppConfig) -> Result<String> {
    let (boundary_text, csv_text) = tokio::try_join!(
        fetch::load_text(&config.sources.boundaries),
        fetch::load_text(&config.sources.state_cases),
    )?;

    let states = data::parse_boundaries(&boundary_text, &config.sources.state_object)?;
    let reports = data::parse_case_csv(&csv_text)?;
    println!("Loaded {} states and {} state case rows", states.len(), reports.len());

    let index = CaseIndex::build(&reports, HashMap::new());
    let scale = CaseScale::from_max(index.max_cases());

    Ok(render::render_choropleth(
        &states,
        None,
        &index,
        &scale,
        &config.map,
        MapLevel::State,
    ))
}

/// Cumulative case trend for the configured state.
async fn trend_pipeline(config: &AppConfig) -> Result<String> {
    let csv_text = fetch::load_text(&config.sources.state_cases).await?;
    let reports = data::parse_case_csv(&csv_text)?;
    trend::render_trend(&reports, &config.trend)
}
