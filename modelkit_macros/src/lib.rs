mod schema;

use proc_macro::TokenStream;

/// Derive macro for `modelkit::Schema`.
///
/// # Usage
///
/// ```ignore
/// #[derive(Schema)]
/// #[schema(table = "users", primary_key = "id", computed = user_fields)]
/// struct User;
///
/// fn user_fields() -> ComputedFields<User> {
///     ComputedFields::new().always("display_name", |r| r.get("name"))
/// }
/// ```
///
/// Every key is optional:
/// - `table`: defaults to the snake_case type name plus `s`
/// - `primary_key`: defaults to `"id"`
/// - `computed`: path to a `fn() -> ComputedFields<Self>`; no computed fields when omitted
#[proc_macro_derive(Schema, attributes(schema))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    schema::derive_schema(input)
}
