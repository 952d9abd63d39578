#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use shift_loader::config::LoaderConfig;
use shift_loader::load::Loader;
use shift_loader::store::{quote_ident, DuckDbStore};

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

pub fn tmp_file(name: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("shift-loader-{name}-{nanos}.{ext}"))
}

pub fn write_tmp(name: &str, ext: &str, contents: &[u8]) -> PathBuf {
    let path = tmp_file(name, ext);
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn loader() -> Loader {
    loader_with(LoaderConfig::default())
}

pub fn loader_with(config: LoaderConfig) -> Loader {
    Loader::new(DuckDbStore::open_in_memory().unwrap(), config).unwrap()
}

pub fn column_names(store: &DuckDbStore, table: &str) -> Vec<String> {
    store
        .table_columns(table)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect()
}

pub fn column_types(store: &DuckDbStore, table: &str) -> Vec<String> {
    store
        .table_columns(table)
        .unwrap()
        .into_iter()
        .map(|c| c.data_type)
        .collect()
}

/// Every column except `_full_text`, cast to text, ordered by `_id`.
pub fn records(store: &DuckDbStore, table: &str) -> Vec<Vec<Option<String>>> {
    let columns: Vec<String> = column_names(store, table)
        .into_iter()
        .filter(|c| c != "_full_text")
        .collect();
    let select: Vec<String> = columns
        .iter()
        .map(|c| format!("CAST({} AS VARCHAR)", quote_ident(c)))
        .collect();
    let sql = format!(
        "SELECT {} FROM {} ORDER BY \"_id\"",
        select.join(", "),
        quote_ident(table)
    );
    let mut stmt = store.connection().prepare(&sql).unwrap();
    let rows = stmt
        .query_map([], |row| {
            (0..columns.len())
                .map(|i| row.get::<_, Option<String>>(i))
                .collect::<Result<Vec<_>, _>>()
        })
        .unwrap();
    rows.map(|r| r.unwrap()).collect()
}

pub fn full_text(store: &DuckDbStore, table: &str, id: i64) -> String {
    store
        .connection()
        .query_row(
            &format!("SELECT \"_full_text\" FROM {} WHERE \"_id\" = ?", quote_ident(table)),
            [id],
            |row| row.get(0),
        )
        .unwrap()
}

pub fn s(value: &str) -> Option<String> {
    Some(value.to_string())
}
