#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use scaffold_core::grid::memory::MemoryStore;
use scaffold_core::schema::SchemaRegistry;

pub fn fixture_path(rel: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(rel)
        .to_string_lossy()
        .to_string()
}

pub fn load_schema_registry() -> SchemaRegistry {
    SchemaRegistry::load(&fixture_path("models.json")).expect("load schema registry")
}

pub fn load_rows(model: &str) -> MemoryStore {
    let path = fixture_path(&format!("rows/{}.json", model));
    let s = fs::read_to_string(path).expect("fixture read");
    let value = serde_json::from_str(&s).expect("fixture parse");
    MemoryStore::from_value(model, value)
}

pub fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

pub fn normalize_sql(s: &str) -> String {
    s.lines().map(|l| l.trim_end()).collect::<Vec<_>>().join("\n").trim().to_string()
}
