//! Deterministic demo data served when the database cannot be reached.
//!
//! The sets are internally consistent: the summary and the department
//! distribution are derived from the sample interns, so the dashboard tells
//! the same story on every view.

use core_types::{Row, Rows};
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn to_rows(value: Value) -> Rows {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn departments() -> Rows {
    let counts = interns_per_department();
    let base = to_rows(json!([
        { "id": 1, "name": "Engineering", "manager": "Priya Raman" },
        { "id": 2, "name": "Marketing", "manager": "Daniel Okafor" },
        { "id": 3, "name": "Operations", "manager": "Sofia Lindqvist" },
        { "id": 4, "name": "Finance", "manager": "Marcus Chen" },
        { "id": 5, "name": "People", "manager": "Amara Nwosu" },
    ]));
    base.into_iter()
        .map(|mut row| {
            let name = row.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
            row.insert("intern_count".to_string(), json!(counts.get(&name).copied().unwrap_or(0)));
            row
        })
        .collect()
}

pub fn interns() -> Rows {
    to_rows(json!([
        { "id": 1, "first_name": "Alex", "last_name": "Morgan", "email": "alex.morgan@example.com",
          "department": "Engineering", "housing": "Maple House", "start_date": "2024-06-03",
          "end_date": "2024-08-23", "status": "active" },
        { "id": 2, "first_name": "Jordan", "last_name": "Lee", "email": "jordan.lee@example.com",
          "department": "Engineering", "housing": "Maple House", "start_date": "2024-06-03",
          "end_date": "2024-08-23", "status": "active" },
        { "id": 3, "first_name": "Sam", "last_name": "Patel", "email": "sam.patel@example.com",
          "department": "Engineering", "housing": "Cedar Court", "start_date": "2024-06-10",
          "end_date": "2024-08-30", "status": "active" },
        { "id": 4, "first_name": "Riley", "last_name": "Nguyen", "email": "riley.nguyen@example.com",
          "department": "Marketing", "housing": "Cedar Court", "start_date": "2024-06-03",
          "end_date": "2024-08-16", "status": "active" },
        { "id": 5, "first_name": "Casey", "last_name": "Brooks", "email": "casey.brooks@example.com",
          "department": "Marketing", "housing": null, "start_date": "2024-06-17",
          "end_date": "2024-09-06", "status": "active" },
        { "id": 6, "first_name": "Taylor", "last_name": "Kim", "email": "taylor.kim@example.com",
          "department": "Operations", "housing": "Birch Lofts", "start_date": "2024-05-20",
          "end_date": "2024-08-09", "status": "active" },
        { "id": 7, "first_name": "Morgan", "last_name": "Diaz", "email": "morgan.diaz@example.com",
          "department": "Finance", "housing": "Birch Lofts", "start_date": "2024-06-03",
          "end_date": "2024-08-23", "status": "active" },
        { "id": 8, "first_name": "Jamie", "last_name": "Fischer", "email": "jamie.fischer@example.com",
          "department": "People", "housing": null, "start_date": "2024-09-09",
          "end_date": "2024-12-13", "status": "upcoming" },
    ]))
}

/// Sample interns whose department matches `department`, ignoring case.
pub fn interns_in(department: &str) -> Rows {
    interns()
        .into_iter()
        .filter(|row| {
            row.get("department")
                .and_then(Value::as_str)
                .is_some_and(|d| d.eq_ignore_ascii_case(department))
        })
        .collect()
}

pub fn intern(id: i64) -> Option<Row> {
    interns().into_iter().find(|row| row.get("id").and_then(Value::as_i64) == Some(id))
}

fn is_active(row: &Row) -> bool {
    row.get("status").and_then(Value::as_str) == Some("active")
}

fn interns_per_department() -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for row in interns().iter().filter(|row| is_active(row)) {
        if let Some(dept) = row.get("department").and_then(Value::as_str) {
            *counts.entry(dept.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

pub fn housing() -> Rows {
    let units: [(i64, &str, &str, i64); 3] = [
        (1, "Maple House", "12 Maple St", 4),
        (2, "Cedar Court", "48 Cedar Ave", 3),
        (3, "Birch Lofts", "7 Birch Rd", 2),
    ];
    let interns = interns();
    units
        .iter()
        .map(|(id, name, address, capacity)| {
            let occupied = interns
                .iter()
                .filter(|row| is_active(row) && row.get("housing").and_then(Value::as_str) == Some(*name))
                .count() as i64;
            let mut row = Row::new();
            row.insert("id".to_string(), json!(id));
            row.insert("name".to_string(), json!(name));
            row.insert("address".to_string(), json!(address));
            row.insert("capacity".to_string(), json!(capacity));
            row.insert("occupied".to_string(), json!(occupied));
            row.insert("available".to_string(), json!(capacity - occupied));
            row
        })
        .collect()
}

pub fn summary() -> Rows {
    let interns = interns();
    let housing = housing();
    let sum = |column: &str| -> i64 { housing.iter().filter_map(|row| row.get(column).and_then(Value::as_i64)).sum() };
    to_rows(json!([{
        "total_interns": interns.len(),
        "active_interns": interns.iter().filter(|row| is_active(row)).count(),
        "departments": departments().len(),
        "housing_capacity": sum("capacity"),
        "housed_interns": sum("occupied"),
    }]))
}

pub fn department_distribution() -> Rows {
    let counts = interns_per_department();
    let mut rows: Vec<(String, i64)> = counts.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows.into_iter()
        .map(|(department, interns)| {
            let mut row = Row::new();
            row.insert("department".to_string(), json!(department));
            row.insert("interns".to_string(), json!(interns));
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_department_is_engineering() {
        let departments = departments();
        assert_eq!(departments[0]["id"], json!(1));
        assert_eq!(departments[0]["name"], json!("Engineering"));
        assert_eq!(departments[0]["intern_count"], json!(3));
    }

    #[test]
    fn filter_is_case_insensitive() {
        assert_eq!(interns_in("marketing").len(), 2);
        assert!(interns_in("Legal").is_empty());
    }

    #[test]
    fn housing_occupancy_counts_active_interns_only() {
        let housing = housing();
        let maple = &housing[0];
        assert_eq!(maple["occupied"], json!(2));
        assert_eq!(maple["available"], json!(2));
    }

    #[test]
    fn summary_agrees_with_the_other_sets() {
        let rows = summary();
        let summary = &rows[0];
        assert_eq!(summary["total_interns"], json!(8));
        assert_eq!(summary["active_interns"], json!(7));
        assert_eq!(summary["departments"], json!(5));
        assert_eq!(summary["housing_capacity"], json!(9));
        assert_eq!(summary["housed_interns"], json!(6));
    }

    #[test]
    fn distribution_is_sorted_by_size() {
        let distribution = department_distribution();
        assert_eq!(distribution[0]["department"], json!("Engineering"));
        assert_eq!(distribution[0]["interns"], json!(3));
        // People has only an upcoming intern.
        assert!(distribution.iter().all(|row| row["department"] != json!("People")));
    }

    #[test]
    fn intern_lookup_by_id() {
        assert_eq!(intern(4).unwrap()["last_name"], json!("Nguyen"));
        assert!(intern(99).is_none());
    }
}
