use once_cell::sync::Lazy;
use serde_json::Value;

const RAW_TEMPLATE: &str = include_str!("../schema/record_template.json");

static TEMPLATE_VALUE: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(RAW_TEMPLATE).expect("record template must contain valid JSON")
});

/// Returns the canonical tagging template as a parsed `serde_json::Value`.
pub fn record_template() -> &'static Value {
    &TEMPLATE_VALUE
}

/// Returns the canonical tagging template as a raw JSON string.
///
/// This is the exact shape a prediction pipeline is asked to emit for one
/// contract; the address itself is supplied by the caller.
pub fn record_template_json() -> &'static str {
    RAW_TEMPLATE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Field;

    #[test]
    fn template_covers_every_descriptive_field() {
        let template = record_template().as_object().unwrap();
        for field in Field::DESCRIPTIVE {
            assert!(template.contains_key(field.json_key()), "{}", field.json_key());
        }
        assert!(!template.contains_key(Field::ContractAddress.json_key()));
    }
}
