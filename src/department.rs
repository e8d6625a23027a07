//! The fixed set of departments questions are routed to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DeptClassError, Result};

/// Target label for question classification.
///
/// The declaration order is the display order used everywhere a
/// per-department value is listed (`Department::ALL`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Department {
    /// Human resources.
    HR,
    /// Finance and accounting.
    Finance,
    /// Information technology.
    IT,
    /// Production and manufacturing.
    Production,
    /// Sales and marketing.
    Sales,
}

impl Department {
    /// All departments in display order.
    pub const ALL: [Department; 5] = [
        Department::HR,
        Department::Finance,
        Department::IT,
        Department::Production,
        Department::Sales,
    ];

    /// Number of departments.
    pub const COUNT: usize = Self::ALL.len();

    /// Canonical name, as used on the wire and in training data.
    pub fn name(self) -> &'static str {
        match self {
            Department::HR => "HR",
            Department::Finance => "Finance",
            Department::IT => "IT",
            Department::Production => "Production",
            Department::Sales => "Sales",
        }
    }

    /// Short department code.
    pub fn code(self) -> &'static str {
        match self {
            Department::HR => "HR",
            Department::Finance => "FIN",
            Department::IT => "IT",
            Department::Production => "PROD",
            Department::Sales => "SALES",
        }
    }

    /// Human readable description.
    pub fn description(self) -> &'static str {
        match self {
            Department::HR => "Human Resources",
            Department::Finance => "Finance and Accounting",
            Department::IT => "Information Technology",
            Department::Production => "Production and Manufacturing",
            Department::Sales => "Sales and Marketing",
        }
    }

    /// Position of this department in [`Department::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical names of every department, in display order.
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|d| d.name().to_string()).collect()
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Department {
    type Err = DeptClassError;

    /// Accepts the canonical name or the short code, ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Department::ALL
            .iter()
            .copied()
            .find(|d| d.name().eq_ignore_ascii_case(s) || d.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| DeptClassError::validation(format!("Unknown department: '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_department_order_and_index() {
        for (i, dept) in Department::ALL.iter().enumerate() {
            assert_eq!(dept.index(), i);
        }
        assert_eq!(
            Department::names(),
            vec!["HR", "Finance", "IT", "Production", "Sales"]
        );
    }

    #[test]
    fn test_department_parsing() {
        assert_eq!("Finance".parse::<Department>().unwrap(), Department::Finance);
        assert_eq!("fin".parse::<Department>().unwrap(), Department::Finance);
        assert_eq!(" it ".parse::<Department>().unwrap(), Department::IT);
        assert_eq!("PROD".parse::<Department>().unwrap(), Department::Production);
        assert!("Legal".parse::<Department>().is_err());
    }

    #[test]
    fn test_department_serde() {
        let json = serde_json::to_string(&Department::Sales).unwrap();
        assert_eq!(json, "\"Sales\"");
        let dept: Department = serde_json::from_str("\"HR\"").unwrap();
        assert_eq!(dept, Department::HR);
    }
}
