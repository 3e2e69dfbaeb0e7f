//! Wire framing for row messages: column values joined by the ASCII Record Separator (`\x1E`,
//! decimal 30). Integers are base-10 signed ASCII digits; text fields are arbitrary bytes other
//! than the separator itself.

use crate::{
    error::CodecError,
    row::ColumnValue,
    schema::{ColumnType, Schema},
};

const RECORD_SEPARATOR: u8 = 0x1E;

/// Splits `payload` on the record separator and type-checks each field against `schema`.
pub fn parse(payload: &[u8], schema: &Schema) -> Result<Vec<ColumnValue>, CodecError> {
    let fields: Vec<&[u8]> = payload.split(|&b| b == RECORD_SEPARATOR).collect();
    let columns = schema.columns();
    if fields.len() != columns.len() {
        return Err(CodecError::ColumnCountMismatch {
            expected: columns.len(),
            found: fields.len(),
        });
    }
    let mut values = Vec::with_capacity(columns.len());
    for (index, (field, spec)) in fields.iter().zip(columns.iter()).enumerate() {
        let value = match spec.ty {
            ColumnType::Integer => {
                let parsed: i64 =
                    atoi::atoi(field).ok_or_else(|| CodecError::InvalidInteger {
                        index,
                        name: spec.name.clone(),
                    })?;
                ColumnValue::Integer(parsed)
            }
            ColumnType::Text => ColumnValue::Text(field.to_vec()),
        };
        values.push(value);
    }
    Ok(values)
}

/// Joins column values with the record separator, the inverse of [`parse`].
pub fn encode(values: &[ColumnValue]) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(RECORD_SEPARATOR);
        }
        match value {
            ColumnValue::Integer(v) => out.extend_from_slice(v.to_string().as_bytes()),
            ColumnValue::Text(bytes) => out.extend_from_slice(bytes),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;

    fn schema() -> Schema {
        Schema::new(vec![ColumnSpec {
            name: "value".to_string(),
            ty: ColumnType::Text,
        }])
    }

    #[test]
    fn round_trips_integer_and_text() {
        let schema = schema();
        let values = vec![ColumnValue::Integer(-42), ColumnValue::Text(b"hi".to_vec())];
        let wire = encode(&values);
        assert_eq!(wire, b"-42\x1Ehi");
        assert_eq!(parse(&wire, &schema).unwrap(), values);
    }

    #[test]
    fn rejects_wrong_column_count() {
        let schema = schema();
        let err = parse(b"1", &schema).unwrap_err();
        assert!(matches!(
            err,
            CodecError::ColumnCountMismatch {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn rejects_non_numeric_integer_field() {
        let schema = schema();
        let err = parse(b"not-a-number\x1Ehi", &schema).unwrap_err();
        assert!(matches!(err, CodecError::InvalidInteger { index: 0, .. }));
    }

    #[test]
    fn text_fields_allow_any_byte_but_the_separator() {
        let schema = schema();
        let values = vec![ColumnValue::Integer(1), ColumnValue::Text(b"a,b;c".to_vec())];
        let wire = encode(&values);
        assert_eq!(parse(&wire, &schema).unwrap(), values);
    }
}
