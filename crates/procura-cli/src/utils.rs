//! Shared utilities

use procura_ai::{Model, Usage};

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// One-line token and cost report
pub fn usage_line(usage: &Usage, model: &Model) -> String {
    format!(
        "[{} in / {} out tokens, ${:.4}]",
        usage.input,
        usage.output,
        usage.calculate_cost(model)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("laptop", 10), "laptop");
        assert_eq!(truncate_chars("ergonomic chairs", 9), "ergonomic...");
        assert_eq!(truncate_chars("café au lait", 4), "café...");
    }

    #[test]
    fn test_usage_line() {
        let mut model = Model::custom(procura_ai::Provider::Google, "gemini-test");
        model.cost.input = 1.0;
        model.cost.output = 2.0;
        let line = usage_line(&Usage { input: 1_000_000, output: 500_000 }, &model);
        assert_eq!(line, "[1000000 in / 500000 out tokens, $2.0000]");
    }
}
