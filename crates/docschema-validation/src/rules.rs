//! Validation rules for single values

use docschema_ast::{ScalarValue, ValueShape};
use docschema_schema::{EnumType, Field, PrimitiveType, Record, TypeShape};

/// Validation rule result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleResult {
    pub is_valid: bool,
    pub message: Option<String>,
}

impl RuleResult {
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
        }
    }
}

/// Missing required field
#[must_use]
pub fn missing_field_message(field: &str) -> String {
    format!("The '{field}' field is required.")
}

/// Expected types as listed in mismatch messages: every shape except `null`
#[must_use]
pub fn expected_types(shapes: &[&TypeShape]) -> String {
    let names: Vec<String> = shapes
        .iter()
        .filter(|shape| ***shape != TypeShape::Primitive(PrimitiveType::Null))
        .map(|shape| shape.display_name())
        .collect();
    if names.is_empty() {
        PrimitiveType::Null.name().to_string()
    } else {
        names.join(" | ")
    }
}

/// Field value found with the wrong shape
#[must_use]
pub fn type_mismatch(field: &Field, shapes: &[&TypeShape], found: ValueShape) -> RuleResult {
    RuleResult::invalid(format!(
        "Type mismatch for field '{}'. Expected '{}' but found '{}'.",
        field.name,
        expected_types(shapes),
        found
    ))
}

/// Whether any primitive shape accepts the scalar. A rejected scalar may
/// still be an enum symbol or record shorthand, so there is no message here.
#[must_use]
pub fn accepts_primitive(value: &ScalarValue, shapes: &[&TypeShape]) -> bool {
    shapes.iter().any(|shape| match shape {
        TypeShape::Primitive(primitive) => primitive.accepts(value),
        _ => false,
    })
}

/// Check a symbol against an enum; the message lists every symbol in
/// declaration order
#[must_use]
pub fn validate_enum(value: &str, enum_type: &EnumType) -> RuleResult {
    if enum_type.contains(value) {
        return RuleResult::valid();
    }
    RuleResult::invalid(format!(
        "The value '{value}' is not a valid '{}'. Allowed values are: {}.",
        enum_type.name,
        enum_type.symbols.join(", ")
    ))
}

/// A non-object node standing where a record is expected is accepted when
/// it names the record itself, or when the enclosing field maps identifiers
/// and the scalar is the shorthand form.
#[must_use]
pub fn validate_record_shorthand(
    value: Option<&ScalarValue>,
    record: &Record,
    parent: Option<&Field>,
) -> RuleResult {
    let names_record = value
        .and_then(ScalarValue::as_str)
        .is_some_and(|text| text == record.name);
    let maps_identifiers = value.is_some() && parent.is_some_and(|field| field.id_map.is_some());

    if names_record || maps_identifiers {
        RuleResult::valid()
    } else {
        RuleResult::invalid(format!("{} definition expected", record.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docschema_schema::IdMap;

    fn shapes(list: &[TypeShape]) -> Vec<&TypeShape> {
        list.iter().collect()
    }

    #[test]
    fn test_accepts_primitive() {
        let list = [TypeShape::Primitive(PrimitiveType::String)];
        assert!(accepts_primitive(&ScalarValue::String("x".into()), &shapes(&list)));
        assert!(!accepts_primitive(&ScalarValue::Integer(1), &shapes(&list)));

        let numbers = [TypeShape::Primitive(PrimitiveType::Float)];
        assert!(accepts_primitive(&ScalarValue::Integer(1), &shapes(&numbers)));
    }

    #[test]
    fn test_type_mismatch_message_omits_null() {
        let list = [
            TypeShape::Primitive(PrimitiveType::Null),
            TypeShape::Primitive(PrimitiveType::String),
        ];
        let field = Field::new("class", list.to_vec());
        let result = type_mismatch(&field, &shapes(&list), ValueShape::Number);
        assert_eq!(
            result.message.as_deref(),
            Some("Type mismatch for field 'class'. Expected 'string' but found 'number'.")
        );
    }

    #[test]
    fn test_expected_types_union() {
        let list = [
            TypeShape::Primitive(PrimitiveType::String),
            TypeShape::Array(vec![TypeShape::Ref("Step".into())]),
        ];
        assert_eq!(expected_types(&shapes(&list)), "string | Step[]");
    }

    #[test]
    fn test_validate_enum_lists_all_symbols() {
        let kind = EnumType::new("StepKind", vec!["tool".into(), "pause".into()]);
        assert!(validate_enum("pause", &kind).is_valid);

        let result = validate_enum("bogus", &kind);
        assert!(!result.is_valid);
        assert_eq!(
            result.message.as_deref(),
            Some("The value 'bogus' is not a valid 'StepKind'. Allowed values are: tool, pause.")
        );
    }

    #[test]
    fn test_record_shorthand() {
        let record = Record::new("Step", vec![]);
        let name = ScalarValue::String("Step".into());
        let other = ScalarValue::String("cat1".into());

        assert!(validate_record_shorthand(Some(&name), &record, None).is_valid);

        let result = validate_record_shorthand(Some(&other), &record, None);
        assert_eq!(result.message.as_deref(), Some("Step definition expected"));

        let mut inputs = Field::new("in", vec![]);
        inputs.id_map = Some(IdMap {
            subject: "id".into(),
            predicate: Some("source".into()),
        });
        assert!(validate_record_shorthand(Some(&other), &record, Some(&inputs)).is_valid);
        assert!(!validate_record_shorthand(None, &record, Some(&inputs)).is_valid);
    }

    #[test]
    fn test_missing_field_message() {
        assert_eq!(missing_field_message("steps"), "The 'steps' field is required.");
    }
}
