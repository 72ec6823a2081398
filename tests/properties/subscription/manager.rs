use crate::properties::strategies::{event_key_strategy, registry_ops_strategy, RegistryOp};

use alloy::primitives::{Address, B256};
use chain_sentinel::{
	services::subscription::{LogSubscription, SubscriptionManager},
	utils::tests::builders::log::LogBuilder,
};
use proptest::{prelude::*, test_runner::Config};
use std::collections::{BTreeMap, BTreeSet, HashSet};

const MAX_OPS: usize = 40;

fn runtime() -> tokio::runtime::Runtime {
	tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.unwrap()
}

/// Applies `ops` and returns the subscriptions still live
async fn apply_ops(manager: &SubscriptionManager, ops: &[RegistryOp]) -> Vec<LogSubscription> {
	let mut live: Vec<LogSubscription> = Vec::new();
	for op in ops {
		match op {
			RegistryOp::Subscribe(key) => {
				live.push(manager.subscribe(key.address, key.topic).await.unwrap());
			}
			RegistryOp::Unsubscribe(index) if !live.is_empty() => {
				let subscription = live.remove(index % live.len());
				manager
					.unsubscribe(subscription.key.address, subscription.key.topic, subscription.id)
					.await
					.unwrap();
			}
			RegistryOp::Unsubscribe(_) => {}
		}
	}
	live
}

/// Expected interest view: every live address with its distinct topics, sorted
fn expected_view(live: &[LogSubscription]) -> BTreeMap<Address, Vec<B256>> {
	let mut view: BTreeMap<Address, BTreeSet<B256>> = BTreeMap::new();
	for subscription in live {
		view.entry(subscription.key.address)
			.or_default()
			.insert(subscription.key.topic);
	}
	view.into_iter()
		.map(|(address, topics)| (address, topics.into_iter().collect()))
		.collect()
}

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	// The cached view always matches the registry contents
	#[test]
	fn test_interest_view_matches_live_subscriptions(ops in registry_ops_strategy(MAX_OPS)) {
		let rt = runtime();
		let (view, live_keys, total) = rt.block_on(async {
			let manager = SubscriptionManager::new(1, 4);
			// Read the view between steps so stale caches would be observed
			let half = ops.len() / 2;
			let mut live = apply_ops(&manager, &ops[..half]).await;
			manager.get_addresses_and_topics().await;
			live.extend(apply_ops(&manager, &ops[half..]).await);

			let view = manager.get_addresses_and_topics().await;
			let view: BTreeMap<Address, Vec<B256>> =
				view.iter().map(|(a, t)| (*a, t.clone())).collect();
			(view, live, manager.total_subscribers().await)
		});

		prop_assert_eq!(view, expected_view(&live_keys));
		prop_assert_eq!(total, live_keys.len());
	}

	// Subscription ids are never reused within a registry
	#[test]
	fn test_subscription_ids_are_unique(ops in registry_ops_strategy(MAX_OPS)) {
		let rt = runtime();
		let ids = rt.block_on(async {
			let manager = SubscriptionManager::new(1, 4);
			let mut ids = Vec::new();
			let mut live: Vec<LogSubscription> = Vec::new();
			for op in &ops {
				match op {
					RegistryOp::Subscribe(key) => {
						let subscription = manager.subscribe(key.address, key.topic).await.unwrap();
						ids.push(subscription.id);
						live.push(subscription);
					}
					RegistryOp::Unsubscribe(index) if !live.is_empty() => {
						let subscription = live.remove(index % live.len());
						manager
							.unsubscribe(subscription.key.address, subscription.key.topic, subscription.id)
							.await
							.unwrap();
					}
					RegistryOp::Unsubscribe(_) => {}
				}
			}
			ids
		});

		let distinct: HashSet<_> = ids.iter().collect();
		prop_assert_eq!(distinct.len(), ids.len());
	}

	// Removing every subscription restores an empty registry, and a second
	// removal of any of them fails
	#[test]
	fn test_subscribe_unsubscribe_roundtrip(
		keys in prop::collection::vec(event_key_strategy(), 1..20)
	) {
		let rt = runtime();
		let (empty_view, total, second_removals_failed) = rt.block_on(async {
			let manager = SubscriptionManager::new(1, 4);
			let mut subscriptions = Vec::new();
			for key in &keys {
				subscriptions.push(manager.subscribe(key.address, key.topic).await.unwrap());
			}
			for subscription in &subscriptions {
				manager
					.unsubscribe(subscription.key.address, subscription.key.topic, subscription.id)
					.await
					.unwrap();
			}

			let mut failed = true;
			for subscription in &subscriptions {
				failed &= manager
					.unsubscribe(subscription.key.address, subscription.key.topic, subscription.id)
					.await
					.is_err();
			}
			(
				manager.get_addresses_and_topics().await.is_empty(),
				manager.total_subscribers().await,
				failed,
			)
		});

		prop_assert!(empty_view);
		prop_assert_eq!(total, 0);
		prop_assert!(second_removals_failed);
	}

	// A broadcast reaches exactly the subscribers of the log's key
	#[test]
	fn test_broadcast_reaches_matching_subscribers(
		keys in prop::collection::vec(event_key_strategy(), 1..20),
		target in event_key_strategy()
	) {
		let rt = runtime();
		let (delivered, expected, received) = rt.block_on(async {
			let manager = SubscriptionManager::new(1, 4);
			let mut subscriptions = Vec::new();
			for key in &keys {
				subscriptions.push(manager.subscribe(key.address, key.topic).await.unwrap());
			}

			let log = LogBuilder::new()
				.address(target.address)
				.topic(target.topic)
				.block_number(7)
				.build();
			let delivered = manager.broadcast_log(&target, &log).await;

			let mut received = Vec::new();
			for subscription in subscriptions.iter_mut() {
				received.push((subscription.key, subscription.receiver.try_recv().is_ok()));
			}
			(delivered, manager.subscriber_count(&target).await, received)
		});

		prop_assert_eq!(delivered, expected);
		for (key, got_log) in received {
			prop_assert_eq!(got_log, key == target);
		}
	}
}
