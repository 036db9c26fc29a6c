use std::cmp::Ordering;

use chrono::NaiveDate;
use jetdb::types::value::{DataType, Value};

#[test]
fn test_value_data_types() {
    let dt = NaiveDate::from_ymd_opt(2001, 9, 9)
        .unwrap()
        .and_hms_opt(1, 46, 40)
        .unwrap();

    assert_eq!(Value::Null.data_type(), DataType::Null);
    assert_eq!(Value::Bool(true).data_type(), DataType::Bool);
    assert_eq!(Value::Int(42).data_type(), DataType::Int);
    assert_eq!(Value::Long(42).data_type(), DataType::Long);
    assert_eq!(Value::Double(3.5).data_type(), DataType::Double);
    assert_eq!(Value::from("hello").data_type(), DataType::Text);
    assert_eq!(Value::DateTime(dt).data_type(), DataType::DateTime);
    assert_eq!(Value::Binary(vec![1, 2]).data_type(), DataType::Binary);
}

#[test]
fn test_numeric_values_compare_across_widths() {
    assert_eq!(Value::Int(5).compare(&Value::Long(5)), Some(Ordering::Equal));
    assert!(Value::Int(5) < Value::Long(10));
    assert!(Value::Int(5) < Value::Double(5.5));
    assert!(Value::Double(-1.0) < Value::Int(0));
}

#[test]
fn test_null_sorts_first_but_never_equals() {
    assert_eq!(Value::Null.compare(&Value::Int(0)), Some(Ordering::Less));
    assert_eq!(Value::from("a").compare(&Value::Null), Some(Ordering::Greater));
    assert_eq!(Value::Null.compare(&Value::Null), Some(Ordering::Equal));
    assert!(!Value::Null.sql_eq(&Value::Null));
    assert!(!Value::Int(1).sql_eq(&Value::Null));
    assert!(Value::Int(1).sql_eq(&Value::Long(1)));
}

#[test]
fn test_incomparable_values() {
    assert_eq!(Value::from("1").compare(&Value::Int(1)), None);
    assert_eq!(Value::Bool(true).compare(&Value::Binary(vec![])), None);
    assert!(!Value::from("1").sql_eq(&Value::Int(1)));
}

#[test]
fn test_text_ordering_is_case_sensitive() {
    // "F-150" sorts before lowercase names, as min(model) relies on
    assert!(Value::from("F-150") < Value::from("contour"));
    assert!(Value::from("viper") > Value::from("stratus"));
}

#[test]
fn test_accessors_and_display() {
    assert_eq!(Value::from("ford").as_text(), Some("ford"));
    assert_eq!(Value::Int(3).as_text(), None);
    assert_eq!(Value::Int(3).as_i64(), Some(3));
    assert_eq!(Value::Long(-7).as_i64(), Some(-7));
    assert!(Value::Null.is_null());
    assert_eq!(Value::Null.to_string(), "NULL");
    assert_eq!(Value::Binary(vec![0; 4]).to_string(), "<4 bytes>");
    assert_eq!(Value::default(), Value::Null);
}

#[test]
fn test_data_type_names() {
    assert_eq!(DataType::Text.to_string(), "TEXT");
    assert_eq!(DataType::Long.to_string(), "LONG");
}
