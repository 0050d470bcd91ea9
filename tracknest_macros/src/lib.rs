mod record;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Record)]
// ============================================================================

/// Derive macro for the `Record` trait.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize, Record)]
/// #[record(collection = "groups")]
/// struct EntryGroup {
///     #[record(id)]
///     pub id: i64,
///     pub name: String,
/// }
/// ```
///
/// - `collection` defaults to the snake_case type name plus `s`.
/// - The id field defaults to the field named `id`. Its type becomes
///   `Record::Id`.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input)
}
