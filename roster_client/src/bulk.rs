//! Bulk-add input parsing

/// Split a comma-separated list of champion names
///
/// Names are trimmed and empty entries dropped, so `"Hulk, ,Thor,"` yields
/// two names.
pub fn parse_bulk_names(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
