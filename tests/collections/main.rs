//! Integration tests for Collection over JSON values and records.

mod orders;

use modelkit::{Collection, Key, Retriever};
use orders::orders;
use serde_json::{json, Value};

#[test]
fn empty_and_keyed_json_projection() {
    assert_eq!(Collection::<Value>::new().to_json().unwrap(), "{}");
    assert_eq!(
        Collection::from_value(json!({"a": 1})).to_json().unwrap(),
        r#"{"a":1}"#
    );
    assert_eq!(
        Collection::from(vec![1, 2, 3]).to_json().unwrap(),
        "[1,2,3]"
    );
}

#[test]
fn sort_by_identity_then_values() {
    let sorted = Collection::from_value(json!({"a": 3, "b": 1, "c": 2}))
        .sort_by(Retriever::<Value>::identity(), false);
    let keys: Vec<String> = sorted.keys().map(Key::to_string).collect();
    assert_eq!(keys, vec!["b", "c", "a"]);
    assert_eq!(sorted.values().to_array(), json!([1, 2, 3]));
}

#[test]
fn group_by_parity() {
    let groups = Collection::from(vec![1, 2, 3, 4])
        .group_by(Retriever::callback(|n: &i32, _| json!(n % 2)), false);
    assert_eq!(groups.count(), 2);
    assert_eq!(groups[1].count(), 2);
    assert_eq!(groups[0].count(), 2);
    // first bucket seen is odd, so keys are not a 0..n list
    assert_eq!(groups.to_array(), json!({"1": [1, 3], "0": [2, 4]}));
}

#[test]
fn order_report() {
    let orders = orders();

    let by_status = orders.group_by("status", true);
    assert_eq!(by_status["paid"].count(), 3);
    assert_eq!(by_status["refunded"].keys().next(), Some(&Key::from("o-3")));

    let paid = orders.filter(|order, _| order["status"] == "paid");
    assert_eq!(paid.sum_by("total"), 97.5);
    assert_eq!(paid.avg_by("total"), Some(32.5));
    assert_eq!(paid.median_by("total"), Some(30.0));
    assert_eq!(orders.max_by("total"), Some(json!(55)));
    assert_eq!(orders.min_by("discount"), Some(json!(5)));

    let customers = orders.pluck("customer.name", None);
    assert_eq!(
        customers.to_array(),
        json!(["ann", "bob", "ann", "cid", "bob"])
    );

    let tags = orders.pluck("tags", None).collapse();
    assert_eq!(tags.count(), 5);
    assert!(tags.contains(&json!("gift")));

    let biggest = orders.sort_by("total", true).first().cloned().unwrap();
    assert_eq!(biggest["id"], json!("o-4"));

    assert!(orders.every("id"));
    assert!(!orders.every("discount"));
}

#[test]
fn mutating_operations_keep_keys_consistent() {
    let mut list = Collection::from(vec![json!("b"), json!("c")]);
    list.prepend(json!("a"), None);
    list.push(json!("d"));
    assert_eq!(list.to_array(), json!(["a", "b", "c", "d"]));

    list.forget([1]);
    assert_eq!(list.to_array(), json!({"0": "a", "2": "c", "3": "d"}));
    assert_eq!(list.pop(), Some(json!("d")));

    list.prepend(json!("z"), Some(Key::from("first")));
    assert_eq!(list.keys().next(), Some(&Key::from("first")));
    assert_eq!(list.offset_unset("first"), Some(json!("z")));
    assert_eq!(list.values().to_array(), json!(["a", "c"]));
}

#[test]
fn flip_and_map_with_keys() {
    let roles = Collection::from_value(json!({"ann": "admin", "bob": "editor"}));
    assert_eq!(roles.flip().to_array(), json!({"admin": "ann", "editor": "bob"}));

    let lengths = roles.map_with_keys(|role, name| {
        [(format!("{}:{}", name, role.as_str().unwrap_or("")), json!(name.to_string().len()))]
    });
    assert_eq!(lengths.to_array(), json!({"ann:admin": 3, "bob:editor": 3}));
}
