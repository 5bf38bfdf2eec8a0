//! Number-set resolution
//!
//! Turns the untrusted request payload (an explicit list of values, or a
//! `(start, end)` range) into an ordered, deduplicated set of positive
//! integers. Constructed once per request and immutable afterwards.

use serde_json::Value;

use crate::error::{AppError, Result};

/// Which request shape produced the set. Drives the suggested filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    Explicit,
    Range { start: u32, end: u32 },
}

/// Resolved, deduplicated, ascending set of chest numbers.
#[derive(Debug, Clone)]
pub struct NumberSet {
    values: Vec<u32>,
    shape: InputShape,
}

impl NumberSet {
    /// Resolve a request into a `NumberSet`.
    ///
    /// An explicit non-empty list takes priority over the range. List values
    /// that fail integer coercion or are not positive are dropped silently;
    /// if nothing survives, the input is invalid. A range must satisfy
    /// `1 <= start <= end` and expands to the closed interval.
    pub fn resolve(
        numbers: Option<&[Value]>,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Self> {
        if let Some(list) = numbers.filter(|l| !l.is_empty()) {
            let mut values: Vec<u32> = list.iter().filter_map(coerce_positive).collect();
            if values.is_empty() {
                return Err(AppError::InvalidInput(
                    "No valid numbers provided".to_string(),
                ));
            }
            values.sort_unstable();
            values.dedup();
            return Ok(NumberSet {
                values,
                shape: InputShape::Explicit,
            });
        }

        match (start, end) {
            (Some(start), Some(end))
                if start >= 1 && start <= end && end <= u32::MAX as i64 =>
            {
                let (start, end) = (start as u32, end as u32);
                Ok(NumberSet {
                    values: (start..=end).collect(),
                    shape: InputShape::Range { start, end },
                })
            }
            _ => Err(AppError::InvalidInput(
                "Invalid parameters: provide start/end or numbers array".to_string(),
            )),
        }
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn shape(&self) -> InputShape {
        self.shape
    }

    /// Suggested download filename: `<prefix>_<start>_to_<end>.pdf` for a
    /// range, `<prefix>_custom_<count>.pdf` for an explicit list.
    pub fn suggested_filename(&self, prefix: &str) -> String {
        match self.shape {
            InputShape::Range { start, end } => format!("{}_{}_to_{}.pdf", prefix, start, end),
            InputShape::Explicit => format!("{}_custom_{}.pdf", prefix, self.values.len()),
        }
    }
}

/// Coerce a JSON value to a positive integer, accepting numbers and numeric
/// strings (the browser form submits both).
fn coerce_positive(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    if n >= 1 && n <= u32::MAX as i64 {
        Some(n as u32)
    } else {
        None
    }
}
