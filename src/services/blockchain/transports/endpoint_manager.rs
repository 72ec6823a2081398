//! Active endpoint tracking and failover for RPC requests.
//!
//! Requests go to the active URL. A rate limited response or a network failure
//! promotes the first reachable fallback to active and demotes the failed URL
//! to the back of the fallback list. Each request visits every endpoint at
//! most once.

use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};

use crate::services::blockchain::transports::{
	RotatingTransport, TransportError, ROTATE_ON_ERROR_CODES,
};

/// Tracks the active RPC endpoint and its fallbacks
#[derive(Clone, Debug)]
pub struct EndpointManager {
	pub active_url: Arc<RwLock<String>>,
	pub fallback_urls: Arc<RwLock<Vec<String>>>,
	client: ClientWithMiddleware,
	rotation_lock: Arc<Mutex<()>>,
}

/// Why a request on the active URL should move to another endpoint
enum Failover {
	RateLimited {
		status: reqwest::StatusCode,
		body: String,
	},
	Network(reqwest_middleware::Error),
}

impl EndpointManager {
	pub fn new(client: ClientWithMiddleware, active_url: &str, fallback_urls: Vec<String>) -> Self {
		Self {
			active_url: Arc::new(RwLock::new(active_url.to_string())),
			fallback_urls: Arc::new(RwLock::new(fallback_urls)),
			client,
			rotation_lock: Arc::new(Mutex::new(())),
		}
	}

	/// Switches the active URL to the first fallback that accepts a connection
	///
	/// # Returns
	/// * `Result<String, TransportError>` - The new active URL or a rotation error
	pub async fn try_rotate_url<T: RotatingTransport>(
		&self,
		transport: &T,
	) -> Result<String, TransportError> {
		let _guard = self.rotation_lock.lock().await;
		let current = self.active_url.read().await.clone();
		let candidates: Vec<String> = self
			.fallback_urls
			.read()
			.await
			.iter()
			.filter(|url| **url != current)
			.cloned()
			.collect();

		if candidates.is_empty() {
			return Err(TransportError::url_rotation(
				"No fallback URLs available",
				None,
				Some(HashMap::from([("active_url".to_string(), current)])),
			));
		}

		for candidate in candidates {
			if let Err(e) = transport.try_connect(&candidate).await {
				tracing::debug!(url = %candidate, error = %e, "Fallback URL rejected connection");
				continue;
			}
			transport.update_client(&candidate).await.map_err(|e| {
				TransportError::url_rotation(
					format!("Failed to switch transport to '{}'", candidate),
					Some(e.into()),
					None,
				)
			})?;

			let mut active = self.active_url.write().await;
			let mut fallbacks = self.fallback_urls.write().await;
			fallbacks.retain(|url| *url != candidate);
			fallbacks.push(current.clone());
			*active = candidate.clone();

			tracing::info!(from = %current, to = %candidate, "Rotated RPC endpoint");
			return Ok(candidate);
		}

		Err(TransportError::url_rotation(
			"No fallback URL accepted a connection",
			None,
			Some(HashMap::from([("active_url".to_string(), current)])),
		))
	}

	/// Sends a JSON-RPC request, failing over to other endpoints when needed
	///
	/// Rate limited responses and network failures trigger rotation; any other
	/// HTTP error is returned as is.
	pub async fn send_raw_request<T, P>(
		&self,
		transport: &T,
		method: &str,
		params: Option<P>,
	) -> Result<Value, TransportError>
	where
		T: RotatingTransport,
		P: Into<Value> + Send + Clone + Serialize,
	{
		let body = transport.customize_request(method, params).await;
		let body = serde_json::to_string(&body).map_err(|e| {
			TransportError::request_serialization(
				"Failed to serialize request JSON",
				Some(Box::new(e)),
				None,
			)
		})?;

		let max_attempts = self.fallback_urls.read().await.len() + 1;
		let mut attempt = 0;
		loop {
			attempt += 1;
			let url = self.active_url.read().await.clone();

			let failover = match self
				.client
				.post(&url)
				.header("Content-Type", "application/json")
				.body(body.clone())
				.send()
				.await
			{
				Ok(response) if response.status().is_success() => {
					return response.json().await.map_err(|e| {
						TransportError::response_parse(
							"Failed to parse JSON response",
							Some(Box::new(e)),
							Some(HashMap::from([("url".to_string(), url.clone())])),
						)
					});
				}
				Ok(response) => {
					let status = response.status();
					let body = response.text().await.unwrap_or_default();
					if !ROTATE_ON_ERROR_CODES.contains(&status.as_u16()) {
						return Err(TransportError::http(status, url, body, None, None));
					}
					Failover::RateLimited { status, body }
				}
				Err(e) => Failover::Network(e),
			};

			tracing::warn!(%url, method, attempt, "RPC request failed, trying fallback endpoint");

			let rotation = if attempt < max_attempts {
				self.try_rotate_url(transport).await.map(|_| ())
			} else {
				Err(TransportError::url_rotation(
					"All RPC endpoints were tried",
					None,
					None,
				))
			};

			if let Err(rotation_error) = rotation {
				return Err(match failover {
					Failover::RateLimited { status, body } => TransportError::http(
						status,
						url,
						body,
						Some(Box::new(rotation_error)),
						None,
					),
					Failover::Network(e) => TransportError::network(
						e.to_string(),
						Some(Box::new(rotation_error)),
						Some(HashMap::from([("url".to_string(), url)])),
					),
				});
			}
		}
	}
}
