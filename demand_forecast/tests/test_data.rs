use chrono::NaiveDate;
use demand_forecast::data::{
    detect_columns, normalize_column_name, CellValue, ColumnSelection, DataLoader, Dataset,
    Dimension, Row, DEMO_DAYS,
};
use demand_forecast::ForecastError;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rstest::rstest;
use std::io::Write;
use tempfile::{Builder, NamedTempFile};

fn dataset_with_columns(columns: &[&str]) -> Dataset {
    let row: Row = columns
        .iter()
        .map(|c| (c.to_string(), CellValue::from("1")))
        .collect();
    Dataset::new(vec![row])
}

#[rstest]
#[case("Units Sold", "unitssold")]
#[case("store_id", "storeid")]
#[case("  Date (UTC) ", "dateutc")]
#[case("Qty-2", "qty2")]
fn test_normalize_column_name(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(normalize_column_name(raw), expected);
}

#[rstest]
#[case(&["Date", "Store ID", "Units Sold"], Some("Date"), Some("Units Sold"))]
#[case(&["ds", "y"], Some("ds"), Some("y"))]
#[case(&["order_timestamp", "total_sales"], Some("order_timestamp"), Some("total_sales"))]
#[case(&["when", "amount", "qty"], Some("when"), Some("qty"))]
#[case(&["only"], Some("only"), None)]
fn test_detect_columns(
    #[case] columns: &[&str],
    #[case] date: Option<&str>,
    #[case] target: Option<&str>,
) {
    let selection = detect_columns(&dataset_with_columns(columns));
    assert_eq!(selection.date.as_deref(), date);
    assert_eq!(selection.target.as_deref(), target);
}

#[test]
fn test_detect_columns_prefers_exact_match_in_candidate_order() {
    // "Total Sales" contains a candidate, but an exact match wins
    let selection = detect_columns(&dataset_with_columns(&["day", "Total Sales", "Demand"]));
    assert_eq!(selection.target.as_deref(), Some("Demand"));
}

#[test]
fn test_detect_columns_on_empty_dataset() {
    let selection = detect_columns(&Dataset::new(Vec::new()));
    assert_eq!(selection, ColumnSelection::default());
}

#[test]
fn test_cell_value_numeric_parsing() {
    assert_eq!(CellValue::from(" 12.5 ").as_f64(), Some(12.5));
    assert_eq!(CellValue::from(3.0).as_f64(), Some(3.0));
    assert_eq!(CellValue::from("").as_f64(), None);
    assert_eq!(CellValue::from("abc").as_f64(), None);
    assert_eq!(CellValue::from(f64::NAN).as_f64(), None);
    assert_eq!(CellValue::from(true).as_f64(), None);
    assert_eq!(CellValue::Null.as_f64(), None);
}

#[test]
fn test_row_dimension_aliases() {
    let row = Row::new()
        .with("store", "S9")
        .with("Product ID", CellValue::Null)
        .with("product_id", "P7");
    assert_eq!(row.dimension(Dimension::Store).as_deref(), Some("S9"));
    assert_eq!(row.dimension(Dimension::Product).as_deref(), Some("P7"));
    assert_eq!(row.dimension(Dimension::Region), None);
}

#[test]
fn test_data_loader_from_csv() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,Store ID,Units Sold").unwrap();
    writeln!(file, "2024-01-01, S1 ,10").unwrap();
    writeln!(file, "2024-01-02,S2").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "2024-01-03,S1,12").unwrap();

    let data = DataLoader::from_csv(file.path()).unwrap();

    assert_eq!(data.len(), 3);
    assert_eq!(data.columns(), &["Date", "Store ID", "Units Sold"]);
    assert_eq!(data.rows()[0].get("Store ID"), Some(&CellValue::from("S1")));
    assert_eq!(data.rows()[1].get("Units Sold"), Some(&CellValue::Null));
    assert_eq!(data.numeric_columns(), vec!["Units Sold".to_string()]);
}

#[test]
fn test_data_loader_from_json_keeps_key_order() {
    let text = r#"[
        {"ds": "2024-03-01", "region": "East", "y": 4},
        {"ds": "2024-03-02", "region": "West", "y": null}
    ]"#;
    let data = DataLoader::from_json_str(text).unwrap();

    assert_eq!(data.columns(), &["ds", "region", "y"]);
    assert_eq!(data.rows()[0].get("y"), Some(&CellValue::Number(4.0)));
    assert_eq!(data.rows()[1].get("y"), Some(&CellValue::Null));
    assert_eq!(
        data.distinct_values(Dimension::Region),
        vec!["East".to_string(), "West".to_string()]
    );
}

#[test]
fn test_data_loader_from_path_picks_format() {
    let mut file = Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"[{{"date": "2024-01-01", "sales": 1}}]"#).unwrap();
    let data = DataLoader::from_path(file.path()).unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data.rows()[0].get("sales"), Some(&CellValue::Number(1.0)));
}

#[test]
fn test_data_loader_error_handling() {
    assert!(matches!(
        DataLoader::from_csv("nonexistent_file.csv"),
        Err(ForecastError::IoError(_))
    ));

    let mut header_only = NamedTempFile::new().unwrap();
    writeln!(header_only, "date,value").unwrap();
    assert!(matches!(
        DataLoader::from_csv(header_only.path()),
        Err(ForecastError::MissingInput(_))
    ));

    assert!(matches!(
        DataLoader::from_json_str("[]"),
        Err(ForecastError::MissingInput(_))
    ));
    assert!(matches!(
        DataLoader::from_json_str("{\"not\": \"an array\"}"),
        Err(ForecastError::JsonError(_))
    ));
    assert!(matches!(
        DataLoader::from_rows(Vec::new()),
        Err(ForecastError::MissingInput(_))
    ));
}

#[test]
fn test_synthetic_dataset_shape() {
    let mut rng = StdRng::seed_from_u64(42);
    let data = DataLoader::synthetic(DEMO_DAYS, &mut rng);

    assert_eq!(data.len(), 365);
    assert_eq!(
        data.columns(),
        &["Date", "Store ID", "Product ID", "Region", "Units Sold"]
    );
    let first = &data.rows()[0];
    assert_eq!(first.get("Date"), Some(&CellValue::from("2024-01-01")));
    assert_eq!(first.dimension(Dimension::Store).as_deref(), Some("S001"));
    assert_eq!(first.dimension(Dimension::Product).as_deref(), Some("P0001"));
    assert_eq!(first.dimension(Dimension::Region).as_deref(), Some("North"));

    for row in data.rows() {
        let value = row.get("Units Sold").and_then(CellValue::as_f64).unwrap();
        assert!(value >= 0.0);
        assert_eq!((value * 100.0).round() / 100.0, value);
    }

    let last = data.rows()[364].get("Date").unwrap().to_string();
    assert_eq!(last, "2024-12-30");
}

#[test]
fn test_synthetic_dataset_is_seed_repeatable() {
    let a = DataLoader::synthetic(30, &mut StdRng::seed_from_u64(1));
    let b = DataLoader::synthetic(30, &mut StdRng::seed_from_u64(1));
    assert_eq!(a, b);
}

#[test]
fn test_dataset_summary() {
    let rows = vec![
        Row::new().with("date", "2024-01-03").with("units", 30.0),
        Row::new().with("date", "2024-01-01").with("units", "10"),
        Row::new().with("date", "bad").with("units", "n/a"),
        Row::new().with("date", "2024-01-02").with("units", 20.0),
    ];
    let summary = Dataset::new(rows).summary("date", "units");

    assert_eq!(summary.rows, 4);
    assert_eq!(summary.first_date, NaiveDate::from_ymd_opt(2024, 1, 1));
    assert_eq!(summary.last_date, NaiveDate::from_ymd_opt(2024, 1, 3));
    let stats = summary.target.unwrap();
    assert_eq!(stats.count, 3);
    assert_eq!(stats.mean, 20.0);
    assert_eq!(stats.min, 10.0);
    assert_eq!(stats.max, 30.0);
}
