use serde_json::Value;

pub(crate) mod data {
    include!(concat!(env!("OUT_DIR"), "/build_info.rs"));
}

pub fn build_info_json() -> &'static str {
    data::BUILD_INFO_JSON
}

/// Build metadata as a JSON value, for embedding into reports.
pub fn build_info() -> Value {
    serde_json::from_str(data::BUILD_INFO_JSON).unwrap_or(Value::Null)
}
