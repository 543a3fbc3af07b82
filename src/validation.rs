use serde::Deserialize;

use crate::model::{AMOUNT_FIELD, KIND_FIELD, NewConversion, RESULT_FIELD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequiredField {
    Type,
    Amount,
    Result,
}

impl RequiredField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredField::Type => KIND_FIELD.0,
            RequiredField::Amount => AMOUNT_FIELD.0,
            RequiredField::Result => RESULT_FIELD.0,
        }
    }

    fn is_present(&self, input: &NewConversion) -> bool {
        match self {
            RequiredField::Type => input.kind.is_some(),
            RequiredField::Amount => input.amount.is_some(),
            RequiredField::Result => input.result.is_some(),
        }
    }
}

/// Returns the configured fields the input lacks, in configuration order.
/// An empty list means the input is accepted.
pub fn missing_fields(required: &[RequiredField], input: &NewConversion) -> Vec<&'static str> {
    required
        .iter()
        .filter(|f| !f.is_present(input))
        .map(|f| f.as_str())
        .collect()
}
