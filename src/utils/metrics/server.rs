//! Metrics server module
//!
//! Serves the Prometheus registry over HTTP for scraping. Per-chain gauges are
//! refreshed from the sentinel on every request.

use actix_web::{
	middleware::{Compress, DefaultHeaders, NormalizePath},
	web, App, HttpResponse, HttpServer, Responder,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::{
	services::sentinel::Sentinel,
	utils::metrics::{gather_metrics, update_sentinel_metrics},
};

pub type SentinelData = web::Data<Arc<Sentinel>>;

/// Collects `(chain_id, subscribers, last_processed_block)` for every chain
async fn chain_snapshot(sentinel: &Sentinel) -> Vec<(u64, usize, u64)> {
	let mut chains = Vec::new();
	for chain_id in sentinel.chain_ids().await {
		if let Some(service) = sentinel.get_service(chain_id).await {
			chains.push((
				chain_id,
				service.subscription_manager().total_subscribers().await,
				service.last_processed_block(),
			));
		}
	}
	chains
}

/// Metrics endpoint handler
async fn metrics_handler(sentinel: SentinelData) -> impl Responder {
	update_sentinel_metrics(&chain_snapshot(&sentinel).await);

	match gather_metrics() {
		Ok(buffer) => HttpResponse::Ok()
			.content_type("text/plain; version=0.0.4; charset=utf-8")
			.body(buffer),
		Err(e) => {
			error!("Error gathering metrics: {}", e);
			HttpResponse::InternalServerError().finish()
		}
	}
}

/// Builds the metrics server bound to `bind_address`
///
/// The returned server must be awaited or spawned to start serving.
pub fn create_metrics_server(
	bind_address: String,
	sentinel: Arc<Sentinel>,
) -> std::io::Result<actix_web::dev::Server> {
	info!("Starting metrics server on {}", bind_address);

	Ok(HttpServer::new(move || {
		App::new()
			.wrap(Compress::default())
			.wrap(NormalizePath::trim())
			.wrap(DefaultHeaders::new())
			.app_data(web::Data::new(sentinel.clone()))
			.route("/metrics", web::get().to(metrics_handler))
	})
	.workers(2)
	.bind(bind_address)?
	.shutdown_timeout(5)
	.run())
}
