//! Payload validation shared by every write operation.
//!
//! Inputs are structs of `Option`s so one type serves create, full replace and
//! partial update. [`Checker`] collects per-field messages and turns them into
//! a single [`Error::Validation`].

use crate::errors::{Error, FieldErrors, Result};
use sea_orm::{ActiveValue, ConnectionTrait, EntityTrait, PrimaryKeyTrait, Value};
use uuid::Uuid;

/// Message for a missing required field
pub const REQUIRED: &str = "This field is required.";
/// Message for an empty string
pub const BLANK: &str = "This field may not be blank.";

/// How a payload is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// POST: required fields must be present, defaults fill the rest
    Create,
    /// PUT: required fields must be present, absent defaulted fields are kept
    Replace,
    /// PATCH: only present fields are validated and written
    Patch,
}

impl WriteMode {
    /// Whether required fields must be present.
    #[must_use]
    pub const fn requires_all(self) -> bool {
        !matches!(self, Self::Patch)
    }
}

/// Field error collector
#[derive(Debug)]
pub struct Checker {
    mode: WriteMode,
    errors: FieldErrors,
}

impl Checker {
    /// Starts a check for the given mode.
    #[must_use]
    pub fn new(mode: WriteMode) -> Self {
        Self {
            mode,
            errors: FieldErrors::default(),
        }
    }

    /// Records an arbitrary message.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    /// Requires presence unless patching.
    pub fn required<T>(&mut self, field: &str, value: Option<&T>) {
        if value.is_none() && self.mode.requires_all() {
            self.errors.add(field, REQUIRED);
        }
    }

    /// Required, and not empty after trimming when present.
    pub fn text(&mut self, field: &str, value: Option<&String>) {
        self.required(field, value);
        self.not_blank(field, value);
    }

    /// Not empty after trimming when present.
    pub fn not_blank(&mut self, field: &str, value: Option<&String>) {
        if value.is_some_and(|v| v.trim().is_empty()) {
            self.errors.add(field, BLANK);
        }
    }

    /// Inclusive integer range when present.
    pub fn int_range(&mut self, field: &str, value: Option<i32>, min: i32, max: i32) {
        if let Some(value) = value {
            if value < min {
                self.errors.add(
                    field,
                    format!("Ensure this value is greater than or equal to {min}."),
                );
            } else if value > max {
                self.errors.add(
                    field,
                    format!("Ensure this value is less than or equal to {max}."),
                );
            }
        }
    }

    /// Finite and inside an inclusive range when present.
    pub fn float_range(&mut self, field: &str, value: Option<f64>, min: f64, max: f64) {
        if let Some(value) = value {
            if !value.is_finite() {
                self.errors.add(field, "A valid number is required.");
            } else if value < min {
                self.errors.add(
                    field,
                    format!("Ensure this value is greater than or equal to {min}."),
                );
            } else if value > max {
                self.errors.add(
                    field,
                    format!("Ensure this value is less than or equal to {max}."),
                );
            }
        }
    }

    /// Finite when present.
    pub fn finite(&mut self, field: &str, value: Option<f64>) {
        if value.is_some_and(|v| !v.is_finite()) {
            self.errors.add(field, "A valid number is required.");
        }
    }

    /// Whether any error has been recorded for `field`.
    #[must_use]
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains(field)
    }

    /// Write mode being checked.
    #[must_use]
    pub const fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Consumes the checker.
    pub fn finish(self) -> Result<()> {
        self.errors.into_result()
    }
}

/// Writes `value` into an active model slot when present.
pub fn assign<T>(slot: &mut ActiveValue<T>, value: Option<T>)
where
    T: Into<Value>,
{
    if let Some(value) = value {
        *slot = ActiveValue::Set(value);
    }
}

/// Writes a nullable column when present.
pub fn assign_opt<T>(slot: &mut ActiveValue<Option<T>>, value: Option<T>)
where
    Option<T>: Into<Value>,
{
    if let Some(value) = value {
        *slot = ActiveValue::Set(Some(value));
    }
}

/// Error for a foreign key that does not resolve.
pub fn missing_reference(field: &str, id: impl std::fmt::Display) -> Error {
    Error::field(field, format!("Invalid pk \"{id}\" - object does not exist."))
}

/// Drops repeated ids, keeping first occurrences in order.
#[must_use]
pub fn dedup_ids(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Checks that every id in a link list refers to an existing `E` row.
pub async fn ensure_references<E, C>(db: &C, field: &str, ids: &[Uuid]) -> Result<()>
where
    E: EntityTrait,
    C: ConnectionTrait,
    Uuid: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
{
    for id in ids {
        if E::find_by_id(*id).one(db).await?.is_none() {
            return Err(missing_reference(field, id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields_depend_on_mode() {
        let missing: Option<&String> = None;

        let mut create = Checker::new(WriteMode::Create);
        create.text("address", missing);
        assert!(create.has_error("address"));

        let mut replace = Checker::new(WriteMode::Replace);
        replace.text("address", missing);
        assert!(replace.has_error("address"));

        let mut patch = Checker::new(WriteMode::Patch);
        patch.text("address", missing);
        assert!(patch.finish().is_ok());
    }

    #[test]
    fn test_blank_and_range_checks() {
        let blank = "   ".to_string();
        let mut checker = Checker::new(WriteMode::Patch);
        checker.text("name", Some(&blank));
        checker.int_range("fill_level", Some(101), 0, 100);
        checker.int_range("fuel_level", Some(50), 0, 100);
        checker.float_range("progress", Some(f64::NAN), 0.0, 100.0);

        assert!(checker.has_error("name"));
        assert!(checker.has_error("fill_level"));
        assert!(!checker.has_error("fuel_level"));
        assert!(checker.has_error("progress"));
        assert!(matches!(checker.finish(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_assign_only_writes_present_values() {
        let mut slot: ActiveValue<i32> = ActiveValue::Set(5);
        assign(&mut slot, None);
        assert_eq!(slot, ActiveValue::Set(5));
        assign(&mut slot, Some(7));
        assert_eq!(slot, ActiveValue::Set(7));

        let mut nullable: ActiveValue<Option<String>> = ActiveValue::NotSet;
        assign_opt(&mut nullable, Some("x".to_string()));
        assert_eq!(nullable, ActiveValue::Set(Some("x".to_string())));
    }

    #[test]
    fn test_dedup_ids_keeps_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup_ids(vec![b, a, b, a]), vec![b, a]);
    }
}
