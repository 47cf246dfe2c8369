use super::*;

fn create_test_registry() -> Registry {
    let registry = Registry::new_custom(Some("watch".to_string()), None).unwrap();
    register_custom_metrics(&registry);
    registry
}

#[test]
fn test_custom_registry() {
    let registry = create_test_registry();

    APPLIED_COMMANDS.with_label_values(&["watch_put", "ok"]).inc();
    REJECTED_REQUESTS.with_label_values(&["not_leader"]).inc();
    STORE_LATENCY_METRIC.with_label_values(&["get"]).observe(3.0);
    let metrics = &registry.gather();
    assert!(!metrics.is_empty());

    let metric_names: Vec<_> = metrics.iter().map(|m| m.get_name()).collect();
    assert!(
        metric_names.contains(&"watch_range_applied_commands"),
        "Missing watch_range_applied_commands"
    );
    assert!(
        metric_names.contains(&"watch_range_rejected_requests"),
        "Missing watch_range_rejected_requests"
    );
}

#[test]
fn test_counter_increment() {
    let before = WATCHERS_REGISTERED.get();
    WATCHERS_REGISTERED.inc();
    assert!(WATCHERS_REGISTERED.get() > before);

    let before = APPLIED_COMMANDS.with_label_values(&["watch_delete", "not_found"]).get();
    APPLIED_COMMANDS
        .with_label_values(&["watch_delete", "not_found"])
        .inc();
    assert!(APPLIED_COMMANDS.with_label_values(&["watch_delete", "not_found"]).get() > before);
}
