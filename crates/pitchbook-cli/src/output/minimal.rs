use serde_json::Value;

use super::{cell, result_of};

/// Headline figure of each command, in priority order.
const PRIORITY_KEYS: [&str; 5] = [
    "enterprise_value",
    "accretion_pct",
    "equity_value_per_share",
    "implied_valuations",
    "written",
];

/// Just the headline answer: the first non-null priority key, else the
/// first field of the result.
pub fn render_minimal(value: &Value) -> String {
    let result = result_of(value);

    let line = match result {
        Value::Object(map) => PRIORITY_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find(|v| !v.is_null())
            .map(cell)
            .or_else(|| map.iter().next().map(|(k, v)| format!("{}: {}", k, cell(v))))
            .unwrap_or_default(),
        other => cell(other),
    };
    line + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_headline_for_merger() {
        let v = json!({"result": {"pre_deal_eps": "1.44", "accretion_pct": "23.91"}});
        assert_eq!(render_minimal(&v), "23.91\n");
    }

    #[test]
    fn test_null_priority_key_skipped() {
        let v = json!({"result": {"equity_value_per_share": null, "base_year": 2024}});
        assert_eq!(render_minimal(&v), "base_year: 2024\n");
    }
}
