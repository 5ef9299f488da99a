use chrono::NaiveDate;
use demand_forecast::data::CellValue;
use demand_forecast::utils::{date_parser, future_dates};
use demand_forecast::ForecastError;
use rstest::rstest;

#[rstest]
#[case("2023-01-15")]
#[case("2023/01/15")]
#[case("01/15/2023")]
#[case("15.01.2023")]
#[case("2023-01-15T08:30:00Z")]
#[case("2023-01-15T08:30:00+02:00")]
#[case("2023-01-15 08:30:00")]
#[case("2023-01-15T08:30")]
#[case(" 2023-01-15 ")]
fn test_date_parser_formats(#[case] text: &str) {
    let expected = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap();
    assert_eq!(date_parser::parse_date(text).unwrap(), expected);
}

#[rstest]
#[case("")]
#[case("yesterday")]
#[case("2023-13-45")]
fn test_date_parser_rejects(#[case] text: &str) {
    assert!(matches!(
        date_parser::parse_date(text),
        Err(ForecastError::ParseError(_))
    ));
}

#[test]
fn test_parse_cell() {
    let expected = NaiveDate::from_ymd_opt(2024, 1, 1);
    assert_eq!(date_parser::parse_cell(&CellValue::from("2024-01-01")), expected);
    assert_eq!(
        date_parser::parse_cell(&CellValue::from(1_704_067_200_000.0)),
        expected
    );
    assert_eq!(date_parser::parse_cell(&CellValue::Null), None);
    assert_eq!(date_parser::parse_cell(&CellValue::from(true)), None);
    assert_eq!(date_parser::parse_cell(&CellValue::from(f64::NAN)), None);
}

#[test]
fn test_future_dates_over_year_end() {
    let last = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    let dates = future_dates(last, 2);
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        ]
    );
}
