//! Shared fixtures: tiny corpora built through the real pipeline.

use std::path::{Path, PathBuf};

use quarry::build::{run_build, BuildConfig};

/// Render one cleaned-document JSONL line.
pub fn doc_line(
    ext_id: &str,
    pub_date: Option<&str>,
    title: Option<&str>,
    terms: &[(&str, u32)],
) -> String {
    let tokens: Vec<serde_json::Value> = terms
        .iter()
        .map(|(term, pos)| serde_json::json!({ "term": term, "pos": pos }))
        .collect();
    let mut record = serde_json::json!({
        "docid": ext_id,
        "fields": [{ "tokens": tokens }],
    });
    if let Some(date) = pub_date {
        record["pub_date"] = serde_json::json!(date);
    }
    if let Some(title) = title {
        record["title"] = serde_json::json!(title);
    }
    record.to_string()
}

/// Tokenize a sentence into `(term, position)` pairs the way the upstream
/// cleaner would: whitespace split, lowercase, 0-based positions.
pub fn sentence(text: &str) -> Vec<(String, u32)> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, w)| (w.to_lowercase(), i as u32))
        .collect()
}

pub fn doc_line_text(ext_id: &str, pub_date: Option<&str>, text: &str) -> String {
    let owned = sentence(text);
    let terms: Vec<(&str, u32)> = owned.iter().map(|(t, p)| (t.as_str(), *p)).collect();
    doc_line(ext_id, pub_date, None, &terms)
}

/// Run the full build pipeline over the given lines.
pub fn build_index(dir: &Path, lines: &[String], config: impl FnOnce(&mut BuildConfig)) -> PathBuf {
    let input = dir.join("cleaned.jsonl");
    std::fs::write(&input, lines.join("\n")).unwrap();
    let out = dir.join("index");
    let mut build_config = BuildConfig::new(&input, &out);
    config(&mut build_config);
    run_build(&build_config).unwrap();
    out
}

/// Three tiny documents exercising every query mode:
/// d1 "the quick brown fox", d2 "quick brown dogs", d3 "lazy dogs".
pub fn fox_corpus(dir: &Path) -> PathBuf {
    build_index(
        dir,
        &[
            doc_line_text("d1", Some("2020"), "the quick brown fox"),
            doc_line_text("d2", Some("2010"), "quick brown dogs"),
            doc_line_text("d3", Some(""), "lazy dogs"),
        ],
        |_| {},
    )
}
