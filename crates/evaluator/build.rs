use chrono::{SecondsFormat, Utc};
use rustc_version::version_meta;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

const TEMPLATE_PATH: &str = "schema/record_template.json";
const SCHEMA_VERSION: u32 = 1;

/// Field names mapped to their prompt descriptions.
type Template = BTreeMap<String, String>;

fn load_template(raw: &[u8]) -> Template {
    let template: Template = serde_json::from_slice(raw).unwrap_or_else(|err| {
        panic!("{TEMPLATE_PATH} must be an object of string descriptions: {err}")
    });
    if template.is_empty() {
        panic!("{TEMPLATE_PATH} declares no fields");
    }
    if let Some(name) = template.keys().find(|name| name.trim().is_empty()) {
        panic!("{TEMPLATE_PATH} has a blank field name {name:?}");
    }
    template
}

fn source_commit() -> Option<String> {
    if let Ok(commit) = env::var("GIT_COMMIT") {
        return Some(commit);
    }
    let output = Command::new("git").args(["rev-parse", "HEAD"]).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={TEMPLATE_PATH}");
    println!("cargo:rerun-if-env-changed=GIT_COMMIT");

    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let raw = fs::read(Path::new(&manifest_dir).join(TEMPLATE_PATH))
        .unwrap_or_else(|err| panic!("failed to read {TEMPLATE_PATH}: {err}"));
    let template = load_template(&raw);

    let build_info = json!({
        "schema_version": SCHEMA_VERSION,
        "package_version": env!("CARGO_PKG_VERSION"),
        "rustc_version": version_meta()
            .map(|meta| meta.short_version_string)
            .unwrap_or_else(|_| "unknown".into()),
        "build_timestamp_utc": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "record_template_sha256": format!("{:x}", Sha256::digest(&raw)),
        "template_field_count": template.len(),
        "template_fields": template.keys().collect::<Vec<_>>(),
        "source_commit": source_commit(),
    });

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let generated = format!("pub const BUILD_INFO_JSON: &str = r#\"{build_info}\"#;\n");
    fs::write(Path::new(&out_dir).join("build_info.rs"), generated)
        .expect("failed to write build_info.rs");
}
