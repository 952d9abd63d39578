mod common;

use std::path::{Path, PathBuf};

use common::{column_names, column_types, loader, loader_with, records, s, tmp_file};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use shift_loader::config::LoaderConfig;
use shift_loader::ingestion::NullObserver;
use shift_loader::load::LoadRequest;
use shift_loader::LoadErrorKind;

const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn write_weather_xlsx(path: &Path) {
    let mut wb = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let notes = wb.add_worksheet();
    notes.set_name("Notes").unwrap();
    notes.write_string(0, 0, "readme").unwrap();
    notes.write_string(1, 0, "weather readings").unwrap();

    let ws = wb.add_worksheet();
    ws.set_name("Readings").unwrap();
    // Leading blank row before the header.
    ws.write_string(1, 0, "date").unwrap();
    ws.write_string(1, 1, "temperature").unwrap();
    ws.write_string(1, 2, "place").unwrap();
    ws.write_string(1, 3, "code").unwrap();
    ws.write_string(1, 4, "active").unwrap();

    let rows = [
        (2011, 1, 1, 1.0, "Galway", 2124.0, true),
        (2011, 1, 2, -1.5, "Galway", 2128.0, false),
        (2011, 1, 3, 0.0, "Berkeley", 94704.0, true),
    ];
    for (i, (y, m, d, temp, place, code, active)) in rows.iter().enumerate() {
        let r = (i + 2) as u32;
        let date = ExcelDateTime::from_ymd(*y, *m, *d).unwrap();
        ws.write_datetime_with_format(r, 0, &date, &date_format).unwrap();
        ws.write_number(r, 1, *temp).unwrap();
        ws.write_string(r, 2, *place).unwrap();
        ws.write_number(r, 3, *code).unwrap();
        ws.write_boolean(r, 4, *active).unwrap();
    }
    ws.write_string(5, 3, "n/a").unwrap();
    ws.write_string(5, 2, "Nowhere").unwrap();

    wb.save(path).unwrap();
}

fn weather_file(name: &str, ext: &str) -> PathBuf {
    let path = tmp_file(name, ext);
    write_weather_xlsx(&path);
    path
}

fn readings_config() -> LoaderConfig {
    LoaderConfig {
        sheet_name: Some("Readings".to_string()),
        ..LoaderConfig::default()
    }
}

#[test]
fn xlsx_cells_keep_native_types() {
    let path = weather_file("weather", "xlsx");
    let loader = loader_with(readings_config());
    let stats = loader
        .load(&LoadRequest::new(&path, XLSX, "weather"), &NullObserver)
        .unwrap();
    assert_eq!(stats.rows, 4);

    let store = loader.store();
    assert_eq!(
        column_names(store, "weather"),
        vec!["_id", "_full_text", "date", "temperature", "place", "code", "active"]
    );
    assert_eq!(
        column_types(store, "weather"),
        vec!["BIGINT", "VARCHAR", "TIMESTAMP", "DECIMAL(38,10)", "VARCHAR", "VARCHAR", "VARCHAR"]
    );

    let rows = records(store, "weather");
    assert_eq!(
        rows[0],
        vec![s("1"), s("2011-01-01 00:00:00"), s("1.0000000000"), s("Galway"), s("2124"), s("true")]
    );
    assert_eq!(rows[1][2], s("-1.5000000000"));
    assert_eq!(rows[3], vec![s("4"), None, None, s("Nowhere"), s("n/a"), None]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn declared_format_wins_over_extension() {
    let path = weather_file("weather-no-ext", "bin");
    let loader = loader_with(readings_config());
    let stats = loader
        .load(&LoadRequest::new(&path, "xlsx", "weather"), &NullObserver)
        .unwrap();
    assert_eq!(stats.rows, 4);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn first_sheet_is_used_by_default() {
    let path = weather_file("weather-first", "xlsx");
    let loader = loader();
    let stats = loader
        .load(&LoadRequest::new(&path, XLSX, "notes"), &NullObserver)
        .unwrap();
    assert_eq!(stats.rows, 1);
    assert_eq!(records(loader.store(), "notes"), vec![vec![s("1"), s("weather readings")]]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_sheet_is_a_format_error() {
    let path = weather_file("weather-missing", "xlsx");
    let loader = loader_with(LoaderConfig {
        sheet_name: Some("Nope".to_string()),
        ..LoaderConfig::default()
    });
    let err = loader
        .load(&LoadRequest::new(&path, XLSX, "weather"), &NullObserver)
        .unwrap_err();
    assert_eq!(err.kind(), LoadErrorKind::FormatDetection);
    assert!(err.to_string().contains("Nope"));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn csv_declared_as_xlsx_is_a_format_error() {
    let loader = loader();
    let err = loader
        .load(
            &LoadRequest::new(common::fixture("simple.csv"), XLSX, "weather"),
            &NullObserver,
        )
        .unwrap_err();
    assert_eq!(err.kind(), LoadErrorKind::FormatDetection);
    assert!(!loader.store().table_exists("weather").unwrap());
}
