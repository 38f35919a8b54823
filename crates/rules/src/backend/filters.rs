//! Filter strings passed alongside backend queries.

/// Wildcard query matching every message.
pub const MATCH_ALL: &str = "*";

/// `streams:<id>` restricting a search to one stream.
pub fn stream_filter(stream: &str) -> String {
    format!("streams:{}", stream.trim())
}

/// Stream filter conjoined with the definition's query.
///
/// The query is only added when it narrows anything, i.e. when it is
/// neither blank nor the wildcard.
pub fn stream_query_filter(stream: &str, query: &str) -> String {
    let mut filter = stream_filter(stream);
    let query = query.trim();
    if !query.is_empty() && query != MATCH_ALL {
        filter.push_str(" AND (");
        filter.push_str(query);
        filter.push(')');
    }
    filter
}
