use super::error::ValidationError;
use super::types::{GenerationResult, JobHandle};
use std::collections::HashSet;

/// What to do with a freshly completed result.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Show the result now.
    Release(GenerationResult),
    /// Keep the result until contact info has been captured.
    Hold,
}

/// Holds results back from accounts without supplementary contact info.
#[derive(Debug, Default)]
pub struct GatingResolver {
    satisfied: bool,
    held: Vec<GenerationResult>,
    resolved: HashSet<JobHandle>,
}

impl GatingResolver {
    pub fn new(has_contact_info: bool) -> Self {
        Self {
            satisfied: has_contact_info,
            ..Default::default()
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    pub fn held(&self) -> &[GenerationResult] {
        &self.held
    }

    /// Decides once per job. Returns `None` for a job that was already resolved.
    pub fn resolve(&mut self, result: GenerationResult) -> Option<Resolution> {
        if !self.resolved.insert(result.job_id.clone()) {
            return None;
        }

        if self.satisfied {
            return Some(Resolution::Release(result));
        }

        tracing::info!(job_id = %result.job_id, "Holding result until contact info is captured");
        self.held.push(result);
        Some(Resolution::Hold)
    }

    /// Records that contact info is on file and hands back every held result,
    /// unchanged and in arrival order.
    pub fn mark_satisfied(&mut self) -> Vec<GenerationResult> {
        self.satisfied = true;
        std::mem::take(&mut self.held)
    }
}

/// Normalizes a phone number to `+` and digits, accepting spaces, dashes, dots
/// and parentheses as separators.
pub fn normalize_phone_number(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return Err(ValidationError::InvalidPhoneNumber),
        }
    }

    if !(8..=15).contains(&digits.len()) {
        return Err(ValidationError::InvalidPhoneNumber);
    }
    Ok(format!("{}{}", plus, digits))
}
