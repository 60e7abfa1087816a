use modelkit::Collection;
use serde_json::{json, Value};

fn order(
    id: &str,
    status: &str,
    total: Value,
    discount: Value,
    customer: &str,
    tags: Value,
) -> Value {
    json!({
        "id": id,
        "status": status,
        "total": total,
        "discount": discount,
        "customer": {"name": customer},
        "tags": tags
    })
}

/// Five orders keyed by their id.
pub fn orders() -> Collection<Value> {
    let rows = vec![
        order("o-1", "paid", json!(30), json!(null), "ann", json!(["gift"])),
        order("o-2", "paid", json!(12.5), json!(5), "bob", json!([])),
        order("o-3", "refunded", json!(8), json!(null), "ann", json!(["late", "gift"])),
        order("o-4", "paid", json!(55), json!(10), "cid", json!(["bulk"])),
        order("o-5", "pending", json!("20"), json!(null), "bob", json!(["late"])),
    ];

    Collection::from(rows).map_with_keys(|order, _| {
        let id = order["id"].as_str().unwrap_or_default().to_string();
        [(id, order.clone())]
    })
}
