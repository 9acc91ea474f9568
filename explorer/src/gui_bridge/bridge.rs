use crate::gui_bridge::model::{ExtentReply, FilterUpdate, NearestQuery, NearestReply, StatusReply};
use anyhow::Context;
use log::{error, info};
use meteorcore::dataset::TimeExtent;
use meteorcore::filter::VisibleSet;
use meteorcore::geojson;
use meteorcore::geometry::GeoPoint;
use meteorcore::throttle::DispatcherHandle;
use meteorcore::CoreError;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use warp::{http::StatusCode, Filter};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP front door for a map page: serves the visible layers and forwards
/// slider and click input to the filter dispatcher.
pub struct MapBridge {
    handle: DispatcherHandle,
    visible: watch::Receiver<Arc<VisibleSet>>,
    extent: Option<TimeExtent>,
}

impl MapBridge {
    pub fn new(
        handle: DispatcherHandle,
        visible: watch::Receiver<Arc<VisibleSet>>,
        extent: Option<TimeExtent>,
    ) -> Self {
        Self {
            handle,
            visible,
            extent,
        }
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let visible = self.visible.clone();
        let visible_filter = warp::any().map(move || visible.clone());
        let handle = self.handle.clone();
        let handle_filter = warp::any().map(move || handle.clone());
        let extent = self.extent;

        let features_route = warp::path("features")
            .and(warp::path::end())
            .and(warp::get())
            .and(visible_filter.clone())
            .map(|visible: watch::Receiver<Arc<VisibleSet>>| {
                let current = Arc::clone(&*visible.borrow());
                warp::reply::json(&geojson::layers(&current))
            });

        let filter_route = warp::path("filter")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(handle_filter.clone())
            .and_then(|update: FilterUpdate, handle: DispatcherHandle| async move {
                let (body, status) = match handle.set_filter(update.dimension, update.range).await {
                    Ok(()) => (StatusReply::ok(), StatusCode::OK),
                    Err(err @ CoreError::InvalidBounds { .. }) => (
                        StatusReply::failed("rejected", err.to_string()),
                        StatusCode::BAD_REQUEST,
                    ),
                    Err(err) => {
                        error!("filter update failed: {}", err);
                        (
                            StatusReply::failed("unavailable", err.to_string()),
                            StatusCode::SERVICE_UNAVAILABLE,
                        )
                    }
                };
                Ok::<_, warp::Rejection>(warp::reply::with_status(
                    warp::reply::json(&body),
                    status,
                ))
            });

        let nearest_route = warp::path("nearest")
            .and(warp::path::end())
            .and(warp::get())
            .and(warp::query::<NearestQuery>())
            .and(handle_filter)
            .and(visible_filter)
            .and_then(
                |query: NearestQuery,
                 handle: DispatcherHandle,
                 visible: watch::Receiver<Arc<VisibleSet>>| async move {
                    let position = GeoPoint::new(query.lng, query.lat);
                    let reply = match handle.nearest(position).await {
                        Ok(hit) => {
                            let features = Arc::clone(visible.borrow().features());
                            let feature = hit.map(|point| geojson::point_feature(&point, &features));
                            warp::reply::with_status(
                                warp::reply::json(&NearestReply { feature }),
                                StatusCode::OK,
                            )
                        }
                        Err(err @ CoreError::InvalidCoordinate { .. }) => warp::reply::with_status(
                            warp::reply::json(&StatusReply::failed("rejected", err.to_string())),
                            StatusCode::BAD_REQUEST,
                        ),
                        Err(err) => {
                            error!("nearest lookup failed: {}", err);
                            warp::reply::with_status(
                                warp::reply::json(&StatusReply::failed(
                                    "unavailable",
                                    err.to_string(),
                                )),
                                StatusCode::SERVICE_UNAVAILABLE,
                            )
                        }
                    };
                    Ok::<_, warp::Rejection>(reply)
                },
            );

        let extent_route = warp::path("extent")
            .and(warp::path::end())
            .and(warp::get())
            .map(move || warp::reply::json(&ExtentReply::new(extent)));

        features_route
            .or(filter_route)
            .or(nearest_route)
            .or(extent_route)
    }

    /// Serves until `shutdown` resolves.
    pub async fn serve<F>(self, addr: SocketAddr, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .with_context(|| format!("binding map bridge to {}", addr))?;
        info!("map bridge listening on http://{}", bound);
        server.await;
        Ok(())
    }

    /// Serves until `shutdown` resolves, then lets the dispatcher publish any
    /// pending recompute and stop once the bridge's handles are gone.
    pub async fn serve_until_drained<F>(
        self,
        dispatcher: JoinHandle<()>,
        addr: SocketAddr,
        shutdown: F,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let served = self.serve(addr, shutdown).await;
        match tokio::time::timeout(DRAIN_TIMEOUT, dispatcher).await {
            Ok(Ok(())) => info!("filter dispatcher drained"),
            Ok(Err(err)) => error!("filter dispatcher failed: {}", err),
            Err(_) => error!("filter dispatcher still busy after {:?}", DRAIN_TIMEOUT),
        }
        served
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{build_events, GeneratorConfig};
    use meteorcore::features;
    use meteorcore::filter::{FilterDimension, FilterEngine, Range};
    use meteorcore::throttle::Dispatcher;
    use serde_json::Value;

    fn bridge() -> (MapBridge, Dispatcher) {
        let config = GeneratorConfig {
            event_count: 60,
            seed: 3,
            ..Default::default()
        };
        let events = build_events(&config).unwrap();
        let features = Arc::new(features::build(&events));
        let extent = features.extent;
        let (dispatcher, handle, visible) =
            Dispatcher::new(FilterEngine::new(features), Duration::from_millis(10));
        (MapBridge::new(handle, visible, extent), dispatcher)
    }

    #[tokio::test]
    async fn features_route_serves_three_layers() {
        let (bridge, dispatcher) = bridge();
        tokio::spawn(dispatcher.run());

        let response = warp::test::request()
            .method("GET")
            .path("/features")
            .reply(&bridge.routes())
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_slice(response.body()).unwrap();
        let points = body["points"]["features"].as_array().unwrap();
        let tracks = body["tracks"]["features"].as_array().unwrap();
        assert_eq!(points.len(), tracks.len());
        assert!(!body["stations"]["features"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn filter_route_rejects_inverted_bounds() {
        let (bridge, dispatcher) = bridge();
        tokio::spawn(dispatcher.run());

        let response = warp::test::request()
            .method("POST")
            .path("/filter")
            .json(&serde_json::json!({"dimension": "start_height", "lower": 120.0, "upper": 80.0}))
            .reply(&bridge.routes())
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let accepted = warp::test::request()
            .method("POST")
            .path("/filter")
            .json(&serde_json::json!({"dimension": "eccentricity", "lower": 0.5, "upper": null}))
            .reply(&bridge.routes())
            .await;
        assert_eq!(accepted.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn nearest_route_returns_a_point_feature() {
        let (bridge, dispatcher) = bridge();
        tokio::spawn(dispatcher.run());

        let response = warp::test::request()
            .method("GET")
            .path("/nearest?lng=10.75&lat=59.9")
            .reply(&bridge.routes())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["feature"]["geometry"]["type"], "Point");

        let polar = warp::test::request()
            .method("GET")
            .path("/nearest?lng=10.0&lat=90.0")
            .reply(&bridge.routes())
            .await;
        assert_eq!(polar.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn shutdown_flushes_deferred_filter() {
        let config = GeneratorConfig {
            event_count: 40,
            seed: 5,
            ..Default::default()
        };
        let features = Arc::new(features::build(&build_events(&config).unwrap()));
        let extent = features.extent;
        let (dispatcher, handle, visible) =
            Dispatcher::new(FilterEngine::new(features), Duration::from_secs(60));
        let task = tokio::spawn(dispatcher.run());
        let bridge = MapBridge::new(handle.clone(), visible.clone(), extent);

        handle
            .set_filter(FilterDimension::Eccentricity, Range::new(0.25, 0.5))
            .await
            .unwrap();
        assert!(visible.borrow().filter_state().eccentricity.is_upper_unbounded());
        drop(handle);

        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        bridge
            .serve_until_drained(task, addr, async {})
            .await
            .unwrap();
        assert_eq!(
            visible.borrow().filter_state().eccentricity,
            Range::new(0.25, 0.5)
        );
    }

    #[tokio::test]
    async fn extent_route_labels_bounds() {
        let (bridge, _dispatcher) = bridge();
        let response = warp::test::request()
            .method("GET")
            .path("/extent")
            .reply(&bridge.routes())
            .await;
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["min_label"].as_str().unwrap().len(), "2025-01-01 00:00".len());
        assert_eq!(body["eccentricity_steps"][6], "∞");
    }
}
