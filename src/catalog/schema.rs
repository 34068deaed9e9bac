use crate::catalog::types::{Record, Value};
use crate::error::FlatDbError;

/// What the engine needs to know about a collection's records.
pub trait RecordSchema {
    fn collection_name(&self) -> &str;

    /// `None` means the records have no identity (value-object semantics).
    fn primary_key_field(&self) -> Option<&str>;

    /// Fails with the first field that breaks a rule.
    fn validate(&self, record: &Record) -> Result<(), FlatDbError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldRule {
    Text {
        min_len: Option<usize>,
        max_len: Option<usize>,
    },
    Integer {
        min: Option<i64>,
        max: Option<i64>,
        /// Rewrite numeric text and integral floats to `Integer` before checking.
        coerce: bool,
    },
    List {
        min_len: Option<usize>,
    },
    Boolean,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub rule: FieldRule,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDef {
    pub collection_name: String,
    pub primary_key: Option<String>,
    pub fields: Vec<FieldSpec>,
}

impl SchemaDef {
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            primary_key: Some("id".to_string()),
            fields: Vec::new(),
        }
    }

    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = Some(field.into());
        self
    }

    pub fn without_primary_key(mut self) -> Self {
        self.primary_key = None;
        self
    }

    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            rule,
            optional: false,
        });
        self
    }

    pub fn optional_field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            rule,
            optional: true,
        });
        self
    }

    /// Applies the integer coercions declared by the schema. Values that
    /// cannot be coerced are left untouched for `validate` to reject.
    pub fn sanitize(&self, record: &mut Record) {
        for spec in &self.fields {
            if let FieldRule::Integer { coerce: true, .. } = spec.rule
                && let Some(value) = record.get_mut(&spec.name)
                && let Some(coerced) = coerce_integer(value)
            {
                *value = Value::Integer(coerced);
            }
        }
    }
}

impl RecordSchema for SchemaDef {
    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    fn primary_key_field(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    fn validate(&self, record: &Record) -> Result<(), FlatDbError> {
        self.fields
            .iter()
            .try_for_each(|spec| check_spec(spec, record))
    }
}

impl SchemaDef {
    /// Runs the rules of a single declared field. Undeclared fields pass.
    pub fn validate_field(&self, record: &Record, name: &str) -> Result<(), FlatDbError> {
        match self.fields.iter().find(|spec| spec.name == name) {
            Some(spec) => check_spec(spec, record),
            None => Ok(()),
        }
    }
}

fn check_spec(spec: &FieldSpec, record: &Record) -> Result<(), FlatDbError> {
    let value = record.field(&spec.name);
    if value.is_null() {
        if spec.optional {
            return Ok(());
        }
        return Err(FlatDbError::validation(&spec.name, "Invalid value"));
    }
    check_rule(&spec.name, &spec.rule, value)
}

fn check_rule(field: &str, rule: &FieldRule, value: &Value) -> Result<(), FlatDbError> {
    match rule {
        FieldRule::Text { min_len, max_len } => {
            let text = value
                .as_str()
                .ok_or_else(|| FlatDbError::validation(field, "must be a string"))?;
            let len = text.chars().count();
            if min_len.is_some_and(|min| len < min) || max_len.is_some_and(|max| len > max) {
                return Err(FlatDbError::validation(
                    field,
                    format!("length must be {}", describe_range(*min_len, *max_len)),
                ));
            }
        }
        FieldRule::Integer { min, max, .. } => {
            let number = value
                .as_i64()
                .ok_or_else(|| FlatDbError::validation(field, "must be an integer"))?;
            if min.is_some_and(|min| number < min) || max.is_some_and(|max| number > max) {
                return Err(FlatDbError::validation(
                    field,
                    format!("must be an integer {}", describe_range(*min, *max)),
                ));
            }
        }
        FieldRule::List { min_len } => {
            let items = value
                .as_list()
                .ok_or_else(|| FlatDbError::validation(field, "must be an array"))?;
            if min_len.is_some_and(|min| items.len() < min) {
                return Err(FlatDbError::validation(
                    field,
                    format!("must be an array {}", describe_range(*min_len, None)),
                ));
            }
        }
        FieldRule::Boolean => {
            if value.as_bool().is_none() {
                return Err(FlatDbError::validation(field, "must be a boolean"));
            }
        }
    }
    Ok(())
}

fn describe_range<T: std::fmt::Display>(min: Option<T>, max: Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("between {min} and {max}"),
        (Some(min), None) => format!("of at least {min}"),
        (None, Some(max)) => format!("of at most {max}"),
        (None, None) => "unbounded".to_string(),
    }
}

/// Integer view of a value: integers as-is, integral floats, and text that
/// parses as a base-10 integer.
pub fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
        Value::Text(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldRule, RecordSchema, SchemaDef};
    use crate::catalog::types::{Record, Value};
    use crate::error::FlatDbError;

    fn people_schema() -> SchemaDef {
        SchemaDef::new("people")
            .field(
                "name",
                FieldRule::Text {
                    min_len: Some(1),
                    max_len: Some(32),
                },
            )
            .field(
                "yearOfBirth",
                FieldRule::Integer {
                    min: Some(1900),
                    max: Some(2100),
                    coerce: true,
                },
            )
            .optional_field(
                "nickname",
                FieldRule::Text {
                    min_len: None,
                    max_len: Some(16),
                },
            )
    }

    #[test]
    fn rejects_first_failing_field() {
        let record = Record::new()
            .with("name", "Hubert Blaine Wolfeschlegelsteinhausenbergerdorff Sr")
            .with("yearOfBirth", 3000);
        let err = people_schema().validate(&record).expect_err("invalid");
        match err {
            FlatDbError::Validation { field, message } => {
                assert_eq!(field, "name");
                assert_eq!(message, "length must be between 1 and 32");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validate_field_checks_only_the_named_field() {
        let record = Record::new().with("name", "").with("yearOfBirth", 1950);
        let schema = people_schema();
        schema
            .validate_field(&record, "yearOfBirth")
            .expect("year is fine");
        schema
            .validate_field(&record, "undeclared")
            .expect("undeclared passes");
        let err = schema.validate_field(&record, "name").expect_err("empty name");
        assert_eq!(err.code_str(), "validation");
    }

    #[test]
    fn accepts_matching_record_and_skips_absent_optional_fields() {
        let record = Record::new()
            .with("name", "Trevor Philips")
            .with("yearOfBirth", 1986);
        people_schema().validate(&record).expect("valid");
    }

    #[test]
    fn sanitize_coerces_numeric_text() {
        let schema = people_schema();
        let mut record = Record::new()
            .with("name", "Trevor")
            .with("yearOfBirth", "1986");
        assert!(schema.validate(&record).is_err());
        schema.sanitize(&mut record);
        assert_eq!(record.field("yearOfBirth"), &Value::Integer(1986));
        schema.validate(&record).expect("valid after sanitize");
    }

    #[test]
    fn missing_required_field_fails() {
        let record = Record::new().with("yearOfBirth", 1986);
        let err = people_schema().validate(&record).expect_err("missing name");
        assert_eq!(
            err.to_string(),
            "Model validation failed. Field 'name': Invalid value"
        );
    }

    #[test]
    fn schema_declares_identity() {
        let schema = SchemaDef::new("genres").without_primary_key();
        assert_eq!(schema.collection_name(), "genres");
        assert_eq!(schema.primary_key_field(), None);
        assert_eq!(people_schema().primary_key_field(), Some("id"));
    }
}
