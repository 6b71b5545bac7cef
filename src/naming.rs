//! Name derivation for entities: table names, route segments, relation short names.

/// Convert an entity name to snake_case. An underscore is inserted only where a lowercase
/// ASCII letter is directly followed by an uppercase one, then everything is lowercased.
/// e.g. "ItemTag" -> "item_tag", "HTTPServer" -> "httpserver", "Category" -> "category"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for c in s.chars() {
        if c.is_ascii_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_ascii_lowercase();
        out.extend(c.to_lowercase());
    }
    out
}

/// Naive pluralization: always a trailing "s" ("Category" -> "Categorys").
pub fn pluralize(s: &str) -> String {
    format!("{}s", s)
}

/// Physical table name: snake_case + "s". e.g. "ItemTag" -> "item_tags"
pub fn table_name(entity_name: &str) -> String {
    pluralize(&to_snake_case(entity_name))
}

/// Route segment: lowercase + "s", without snake_casing. e.g. "ItemTag" -> "itemtags"
pub fn route_path(entity_name: &str) -> String {
    pluralize(&entity_name.to_lowercase())
}

/// Key under which an eager-loaded relation is attached: the property name without a trailing
/// `_id`. e.g. "category_id" -> "category", "owner" -> "owner"
pub fn relation_short_name(property: &str) -> &str {
    property.strip_suffix("_id").unwrap_or(property)
}

/// Whether `s` is a plain SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
