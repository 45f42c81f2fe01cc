use super::*;

#[test]
fn test_update_then_get() {
    let store = MemoryStore::new();
    let update = store
        .update_item("db/0/up.1", "_name='up'; _v0=init_array(4,'int'); _v0[1]=-7; _maxtime=10")
        .unwrap();
    let get = store.get_item("db/0/up.1", &["_maxtime", "_v0"]).unwrap();
    assert_ne!(update, get);

    let responses = store.drain_responses();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].id, update);
    assert_eq!(responses[0].outcome, Ok(None));

    let item = responses[1].outcome.clone().unwrap().unwrap();
    assert_eq!(item.len(), 2);
    assert_eq!(item["_maxtime"], AttributeValue::Int(10));
    assert_eq!(item["_v0"], AttributeValue::IntArray(vec![0, -7, 0, 0]));
    assert_eq!(store.pending_responses(), 0);
}

#[test]
fn test_get_missing_item() {
    let store = MemoryStore::new();
    store.get_item("db/0/missing.1", &["_maxtime"]).unwrap();

    let responses = store.drain_responses();
    assert!(matches!(responses[0].outcome, Err(Error::NotFound(_))));
}

#[test]
fn test_invalid_expression_is_atomic() {
    let store = MemoryStore::new();
    store.update_item("item", "a=1; b[3]=2").unwrap();

    let responses = store.drain_responses();
    assert!(matches!(responses[0].outcome, Err(Error::InvalidExpression(_))));
    assert!(store.item("item").is_none());
}

#[test]
fn test_injected_failures() {
    let store = MemoryStore::new();

    store.fail_next_issue();
    assert!(matches!(store.update_item("item", "a=1"), Err(Error::Transport(_))));
    assert!(store.issued().is_empty());

    store.fail_next_execution();
    let id = store.update_item("item", "a=1").unwrap();
    let responses = store.drain_responses();
    assert_eq!(responses[0].id, id);
    assert!(matches!(responses[0].outcome, Err(Error::Transport(_))));
    assert_eq!(store.item_count(), 0);

    store.update_item("item", "a=1").unwrap();
    assert_eq!(store.item("item").unwrap()["a"], AttributeValue::Int(1));
    assert_eq!(store.issued().len(), 2);
}

#[test]
fn test_quoted_strings() {
    let store = MemoryStore::new();
    store.update_item("item", "a='it''s; fine'; b='x=y'; c=''").unwrap();

    let item = store.item("item").unwrap();
    assert_eq!(item["a"], AttributeValue::Str("it's; fine".to_string()));
    assert_eq!(item["b"], AttributeValue::Str("x=y".to_string()));
    assert_eq!(item["c"], AttributeValue::Str(String::new()));
}

#[test]
fn test_malformed_strings_rejected() {
    let store = MemoryStore::new();
    store.update_item("item", "a='open; b=1").unwrap();
    store.update_item("item", "a='x'y'").unwrap();

    let responses = store.drain_responses();
    assert!(responses.iter().all(|r| matches!(r.outcome, Err(Error::InvalidExpression(_)))));
    assert!(store.item("item").is_none());
}
