//! PQL expressions for selecting exported scrape jobs.

pub const DEFAULT_RESOURCE_TYPE: &str = "Prometheus::Scrape_job";

/// Escapes a value for use inside a double-quoted PQL string literal.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Selects every exported `resource_type` resource whose node has not opted out
/// of monitoring.
///
/// A node opts out by setting `monitoring_fact` to `false`, as either a boolean
/// or the string `"false"`. Nodes without the fact at all stay included, since
/// the sub-query then matches no certname and the negation holds.
pub fn exported_scrape_jobs(resource_type: &str, monitoring_fact: &str) -> String {
    format!(
        "resources {{ !(certname in facts[certname] {{ name = {} and (value = \"false\" or value = false) }}) and type = {} and exported = true }}",
        quote(monitoring_fact),
        quote(resource_type),
    )
}
