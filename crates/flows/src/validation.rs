//! Step gating: whether the data gathered so far allows leaving a step.
//!
//! Each wizard schema lists, per step, the required fields and their current
//! values. A field is present when it holds something other than whitespace.
//! These functions have no side effects.

use crate::wizard::WizardSchema;

/// One required field of a step and the value it currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredField<'a> {
    pub name: &'static str,
    pub value: &'a str,
}

impl<'a> RequiredField<'a> {
    pub fn new(name: &'static str, value: &'a str) -> Self {
        Self { name, value }
    }

    pub fn is_present(&self) -> bool {
        is_present(self.value)
    }
}

pub fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Names of the required fields of `step` that are still blank.
/// Steps outside the wizard have no requirements.
pub fn missing_fields<S: WizardSchema>(step: usize, sections: &S::Sections) -> Vec<&'static str> {
    S::required_fields(step, sections)
        .into_iter()
        .filter(|field| !field.is_present())
        .map(|field| field.name)
        .collect()
}

pub fn valid<S: WizardSchema>(step: usize, sections: &S::Sections) -> bool {
    S::required_fields(step, sections)
        .iter()
        .all(RequiredField::is_present)
}
