use super::*;
use crate::partition::Partition;

#[test]
fn test_identity_ignores_label_order() {
    let a = Metric::new(vec![
        Label::new("__name__", "cpu"),
        Label::new("zone", "eu"),
        Label::new("host", "a"),
    ])
    .unwrap();
    let b = Metric::new(vec![
        Label::new("host", "a"),
        Label::new("zone", "eu"),
        Label::new("__name__", "cpu"),
    ])
    .unwrap();

    assert_eq!(a.key(), "cpu{host=\"a\",zone=\"eu\"}");
    assert_eq!(a.key(), b.key());
    assert_eq!(a.hash(), b.hash());
    assert_eq!(a.name(), "cpu");
    assert_eq!(a.labels()[0].name, METRIC_NAME_LABEL);
}

#[test]
fn test_different_labels_hash_differently() {
    let a = test_metric();
    let b = Metric::new(vec![Label::new("__name__", "cpu"), Label::new("host", "b")]).unwrap();
    assert_ne!(a.hash(), b.hash());
}

#[test]
fn test_missing_name_rejected() {
    let result = Metric::new(vec![Label::new("host", "a")]);
    assert!(matches!(result, Err(Error::InvalidMetric(_))));

    let result = Metric::new(vec![Label::new("__name__", "")]);
    assert!(matches!(result, Err(Error::InvalidMetric(_))));
}

#[test]
fn test_name_only_metric() {
    let metric = Metric::new(vec![Label::new("__name__", "up")]).unwrap();
    assert_eq!(metric.key(), "up{}");
}

#[test]
fn test_item_path() {
    let metric = test_metric();
    let partition = Partition::new(3, 3 * 3600, 4 * 3600, 3600, "metrics/10800".to_string());
    assert_eq!(
        metric.item_path(&partition),
        format!("metrics/10800/cpu.{}", metric.hash())
    );
}

#[test]
fn test_duplicate_label_names_rejected() {
    let result = Metric::new(vec![
        Label::new("__name__", "cpu"),
        Label::new("host", "a"),
        Label::new("host", "b"),
    ]);
    assert!(matches!(result, Err(Error::InvalidMetric(_))));
}

#[test]
fn test_label_names_must_be_identifiers() {
    for name in ["", "1st", "a;b", "x='y'", "v[0]"] {
        let result = Metric::new(vec![Label::new("__name__", "cpu"), Label::new(name, "a")]);
        assert!(matches!(result, Err(Error::InvalidMetric(_))), "accepted {:?}", name);
    }
}

#[test]
fn test_key_escapes_label_values() {
    let metric = Metric::new(vec![
        Label::new("__name__", "cpu"),
        Label::new("path", "C:\\tmp \"x\""),
    ])
    .unwrap();
    assert_eq!(metric.key(), "cpu{path=\"C:\\\\tmp \\\"x\\\"\"}");
}
