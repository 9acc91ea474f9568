use anyhow::Context;
use clap::Parser;
use gui_bridge::bridge::MapBridge;
use log::error;
use meteorcore::filter::{FilterDimension, Range};
use meteorcore::format::{format_bound, format_timestamp, parse_bound};
use meteorcore::geometry::GeoPoint;
use meteorcore::throttle::{Dispatcher, DEFAULT_INTERVAL};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::ExplorerConfig;
use workflow::runner::{Runner, WorkflowResult};

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Meteor observation map explorer")]
struct Args {
    /// Load explorer settings from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Meteor dataset (JSON array); a synthetic one is generated when omitted
    #[arg(long)]
    dataset: Option<PathBuf>,
    /// Minimum interval between filter recomputes, in milliseconds
    #[arg(long)]
    throttle_ms: Option<u64>,
    /// Filter once and print a summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Position for the offline nearest-event lookup, as LNG,LAT
    #[arg(long, value_parser = parse_position, allow_hyphen_values = true)]
    nearest: Option<GeoPoint>,
    /// Filter override as DIMENSION=LOWER:UPPER; an empty bound is open
    #[arg(long = "filter", value_parser = parse_filter, allow_hyphen_values = true)]
    filters: Vec<(FilterDimension, Range)>,
    /// Append the offline summary to this file
    #[arg(long)]
    report: Option<PathBuf>,
    /// Serve the map bridge until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn parse_position(text: &str) -> Result<GeoPoint, String> {
    let (lng, lat) = text
        .split_once(',')
        .ok_or_else(|| format!("expected LNG,LAT, got {text:?}"))?;
    let lng = lng.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let lat = lat.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok(GeoPoint::new(lng, lat))
}

fn parse_filter(text: &str) -> Result<(FilterDimension, Range), String> {
    let (name, bounds) = text
        .split_once('=')
        .ok_or_else(|| format!("expected DIMENSION=LOWER:UPPER, got {text:?}"))?;
    let dimension = FilterDimension::ALL
        .into_iter()
        .find(|dimension| dimension_name(*dimension) == name.trim())
        .ok_or_else(|| format!("unknown filter dimension {name:?}"))?;
    let (lower, upper) = bounds
        .split_once(':')
        .ok_or_else(|| format!("expected LOWER:UPPER, got {bounds:?}"))?;
    let bound = |text: &str, open: f64| -> Result<f64, String> {
        if text.trim().is_empty() {
            return Ok(open);
        }
        parse_bound(text).ok_or_else(|| format!("invalid bound {text:?}"))
    };
    Ok((
        dimension,
        Range::new(bound(lower, f64::NEG_INFINITY)?, bound(upper, f64::INFINITY)?),
    ))
}

fn dimension_name(dimension: FilterDimension) -> &'static str {
    match dimension {
        FilterDimension::Time => "time",
        FilterDimension::StartHeight => "start_height",
        FilterDimension::EndHeight => "end_height",
        FilterDimension::Eccentricity => "eccentricity",
    }
}

fn summary(result: &WorkflowResult) -> String {
    let state = &result.filter_state;
    let mut lines = vec![
        format!(
            "events={} points={}/{} stations={}/{}",
            result.event_count,
            result.visible_points,
            result.total_points,
            result.visible_stations,
            result.total_stations
        ),
        format!(
            "time=[{}, {}] start_height=[{}, {}] end_height=[{}, {}] eccentricity=[{}, {}]",
            format_timestamp(state.time.lower),
            format_timestamp(state.time.upper),
            state.start_height.lower,
            format_bound(state.start_height.upper),
            state.end_height.lower,
            format_bound(state.end_height.upper),
            state.eccentricity.lower,
            format_bound(state.eccentricity.upper)
        ),
    ];
    if let Some(extent) = result.extent {
        lines.push(format!(
            "observed {} .. {}",
            format_timestamp(extent.min),
            format_timestamp(extent.max)
        ));
    }
    if let Some(point) = &result.nearest {
        lines.push(format!(
            "nearest {} at ({:.4}, {:.4}), bearing {:.1}",
            point.attributes.event_id, point.position.lng, point.position.lat, point.attributes.bearing
        ));
    }
    lines.join("\n")
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = args.workflow {
        let mut config = ExplorerConfig::load(path)?;
        if let Some(dataset) = args.dataset {
            config.dataset = Some(dataset);
        }
        if let Some(throttle_ms) = args.throttle_ms {
            config.throttle_ms = throttle_ms;
        }
        config
    } else {
        let throttle_ms = args
            .throttle_ms
            .unwrap_or(DEFAULT_INTERVAL.as_millis() as u64);
        ExplorerConfig::from_args(args.dataset, throttle_ms)
    };
    for (dimension, range) in args.filters {
        config.filters.set(dimension, range);
    }

    let runner = Runner::from_config(&config)?;

    if args.offline || !args.serve {
        let result = runner.execute(args.nearest)?;
        let report = summary(&result);
        println!("{}", report);

        if let Some(report_path) = args.report {
            if let Some(parent) = report_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&report_path)
                .with_context(|| format!("opening report {}", report_path.display()))?;
            writeln!(file, "{}", report)?;
        }
    }

    if args.serve {
        let engine = runner.engine()?;
        let (dispatcher, handle, visible) = Dispatcher::new(engine, config.throttle_interval());
        let bridge = MapBridge::new(handle, visible, runner.features().extent);
        let bind = config.bind;

        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for map bridge")?;
        runtime.block_on(async move {
            let dispatcher_task = tokio::spawn(dispatcher.run());
            let shutdown = async {
                if let Err(err) = signal::ctrl_c().await {
                    error!("awaiting Ctrl+C: {}", err);
                }
            };
            println!("Map bridge on http://{} (Ctrl+C to stop)", bind);
            bridge
                .serve_until_drained(dispatcher_task, bind, shutdown)
                .await
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_argument_parses_lng_lat() {
        assert_eq!(
            parse_position("10.75, 59.9").unwrap(),
            GeoPoint::new(10.75, 59.9)
        );
        assert_eq!(
            parse_position("-3.2,55.9").unwrap(),
            GeoPoint::new(-3.2, 55.9)
        );
        assert!(parse_position("10.75").is_err());
        assert!(parse_position("east,north").is_err());
    }

    #[test]
    fn filter_argument_allows_open_bounds() {
        assert_eq!(
            parse_filter("eccentricity=0.5:").unwrap(),
            (FilterDimension::Eccentricity, Range::at_least(0.5))
        );
        assert_eq!(
            parse_filter("end_height=:80").unwrap(),
            (FilterDimension::EndHeight, Range::new(f64::NEG_INFINITY, 80.0))
        );
        assert_eq!(
            parse_filter("start_height=70:∞").unwrap(),
            (FilterDimension::StartHeight, Range::at_least(70.0))
        );
        assert!(parse_filter("velocity=1:2").is_err());
        assert!(parse_filter("time=abc:1").is_err());
        assert!(parse_filter("time").is_err());
    }

    #[test]
    fn summary_mentions_unbounded_eccentricity() {
        let runner = Runner::from_config(&ExplorerConfig::default()).unwrap();
        let result = runner.execute(None).unwrap();
        let text = summary(&result);
        assert!(text.contains("eccentricity=[0, ∞]"));
        assert!(text.starts_with("events=250"));
    }
}
