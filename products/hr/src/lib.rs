//! HR module: employee records and the collection they live in.
//!
//! An [`Employee`] is an open JSON object whose only known field is an integer
//! `id`; every other attribute is carried through untouched. The [`Roster`] is
//! the ordered collection persisted by an [`EmployeeStore`].
//!
//! Ids are handed out as `len + 1` on create. After a delete this can hand out
//! an id that is still held by another record, so ids are not unique. Callers
//! that look records up by id always get the first match.

mod store;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use store::{EmployeeStore, JsonFileStore, MemoryStore};

pub type HrResult<T> = Result<T, HrError>;

/// Largest float that still holds every smaller integer exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Error)]
pub enum HrError {
    #[error("Employee not found")]
    NotFound { id: i64 },
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize employees: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("{} already exists", .path.display())]
    AlreadyExists { path: PathBuf },
}

/// A single employee record.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Employee(Map<String, Value>);

impl Employee {
    /// The record's id, if its `id` field is a whole number. Floats such as
    /// `1.0` count; strings never do.
    pub fn id(&self) -> Option<i64> {
        let Value::Number(number) = self.0.get("id")? else {
            return None;
        };
        number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER)
                .map(|value| value as i64)
        })
    }

    /// Sets `id`, keeping the key where it is when already present.
    pub fn set_id(&mut self, id: i64) {
        self.0.insert("id".to_string(), Value::from(id));
    }
}

impl From<Map<String, Value>> for Employee {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// Ordered employee collection, serialized as a bare JSON array.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Roster(Vec<Employee>);

impl Roster {
    pub fn employees(&self) -> &[Employee] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, id: i64) -> Option<usize> {
        self.0.iter().position(|employee| employee.id() == Some(id))
    }

    pub fn find(&self, id: i64) -> Option<&Employee> {
        self.0.iter().find(|employee| employee.id() == Some(id))
    }

    /// Appends `employee` with `id = len + 1` and returns the stored record.
    pub fn create(&mut self, mut employee: Employee) -> Employee {
        let id = self.0.len() as i64 + 1;
        employee.set_id(id);
        self.0.push(employee.clone());
        employee
    }

    /// Replaces the first record matching `id`; the stored record keeps `id`
    /// whatever the replacement carried.
    pub fn replace(&mut self, id: i64, mut employee: Employee) -> HrResult<Employee> {
        let index = self.position(id).ok_or(HrError::NotFound { id })?;
        employee.set_id(id);
        self.0[index] = employee.clone();
        Ok(employee)
    }

    pub fn remove(&mut self, id: i64) -> HrResult<Employee> {
        let index = self.position(id).ok_or(HrError::NotFound { id })?;
        Ok(self.0.remove(index))
    }
}

/// Reads an id the way path parameters have always been read: leading
/// whitespace and an optional sign, then as many digits as follow. A `0x`
/// prefix switches to hexadecimal. Trailing garbage is ignored; no digits at
/// all yields `None`.
pub fn parse_id(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let (radix, rest) = match rest.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("0x") => (16, &rest[2..]),
        _ => (10, rest),
    };
    let digits = rest.chars().take_while(|c| c.is_digit(radix)).count();
    if digits == 0 {
        return None;
    }
    let magnitude = i64::from_str_radix(&rest[..digits], radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn employee(value: Value) -> Employee {
        serde_json::from_value(value).unwrap()
    }

    fn roster(value: Value) -> Roster {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn create_appends_id_after_existing_fields() {
        let mut roster = Roster::default();
        let created = roster.create(employee(json!({"name": "A"})));
        assert_eq!(
            serde_json::to_string(&created).unwrap(),
            r#"{"name":"A","id":1}"#
        );
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.find(1), Some(&created));
    }

    #[test]
    fn create_reuses_ids_after_delete() {
        let mut roster = roster(json!([
            {"id": 1, "name": "A"},
            {"id": 2, "name": "B"}
        ]));
        roster.remove(1).unwrap();
        let created = roster.create(employee(json!({"name": "C"})));
        assert_eq!(created.id(), Some(2));
        assert_eq!(roster.position(2), Some(0));
    }

    #[test]
    fn replace_forces_path_id() {
        let mut roster = roster(json!([{"id": 1, "name": "A"}]));
        let updated = roster
            .replace(1, employee(json!({"id": 7, "name": "B"})))
            .unwrap();
        assert_eq!(updated, employee(json!({"id": 1, "name": "B"})));
        assert_eq!(roster.employees(), &[updated]);
    }

    #[test]
    fn missing_ids_are_not_found() {
        let mut roster = roster(json!([{"id": 1}]));
        assert!(roster.find(99).is_none());
        assert!(matches!(
            roster.replace(99, Employee::default()),
            Err(HrError::NotFound { id: 99 })
        ));
        assert!(matches!(roster.remove(99), Err(HrError::NotFound { id: 99 })));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn string_ids_do_not_match() {
        let roster = roster(json!([{"id": "1"}, {"id": 1, "name": "real"}]));
        assert_eq!(roster.position(1), Some(1));
    }

    #[test]
    fn whole_number_floats_count_as_ids() {
        let roster = roster(json!([{"id": 2.5}, {"id": 1.0, "name": "float"}]));
        assert_eq!(roster.position(1), Some(1));
        assert_eq!(roster.employees()[0].id(), None);
        assert_eq!(employee(json!({"id": 1e300})).id(), None);
    }

    #[test]
    fn parse_id_reads_hex_prefix() {
        assert_eq!(parse_id("0x1A"), Some(26));
        assert_eq!(parse_id("0X1a"), Some(26));
        assert_eq!(parse_id("-0x10"), Some(-16));
        assert_eq!(parse_id("0x"), None);
        assert_eq!(parse_id("0xg"), None);
        assert_eq!(parse_id("07"), Some(7));
        assert_eq!(parse_id("0"), Some(0));
    }

    #[test]
    fn parse_id_reads_leading_integer() {
        assert_eq!(parse_id("12"), Some(12));
        assert_eq!(parse_id("12abc"), Some(12));
        assert_eq!(parse_id("  -3"), Some(-3));
        assert_eq!(parse_id("+4"), Some(4));
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id("-"), None);
        assert_eq!(parse_id(""), None);
    }
}
