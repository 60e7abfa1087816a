use modelkit::{ComputedFields, InMemoryDao, Record, Repository, Schema};
use serde_json::{json, Value};

#[derive(Schema)]
#[schema(table = "users", computed = user_fields)]
pub struct User;

pub fn user_fields() -> ComputedFields<User> {
    ComputedFields::new()
        .always("full_name", |user| {
            json!(format!("{} {}", text(user, "first_name"), text(user, "last_name")).trim())
        })
        .memoized("initials", |user| {
            let initials: String = [text(user, "first_name"), text(user, "last_name")]
                .iter()
                .filter_map(|part| part.chars().next())
                .collect();
            json!(initials)
        })
}

fn text(user: &Record<User>, field: &str) -> String {
    match user.get(field) {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Table and key derived from the type name.
#[derive(Schema)]
#[schema(primary_key = "slug")]
pub struct BlogPost;

pub fn user_repository() -> Repository<User, InMemoryDao> {
    Repository::new(InMemoryDao::for_schema::<User>())
}
