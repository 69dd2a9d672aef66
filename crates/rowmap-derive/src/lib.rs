use proc_macro::TokenStream;

mod entity;

/// Derive `rowmap::traits::Entity` from `#[mapper(...)]` attributes.
///
/// ```ignore
/// #[derive(Clone, Debug, Default, Entity)]
/// #[mapper(name = "user")]
/// struct User {
///     #[mapper(primary_key = "user_id")]
///     id: i64,
///     #[mapper(column = "name")]
///     name: String,
///     #[mapper(relation)]
///     address: Option<Address>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(mapper))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity::derive_entity(input.into()).into()
}
