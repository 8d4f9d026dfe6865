//! Display-eligibility rules for rates and uplifts.
//!
//! Low-sample figures are noisy, so a figure backed by fewer than
//! `min_display_users` users is reported as unavailable rather than as a number.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder rendered for unavailable figures.
pub const UNAVAILABLE: &str = "—";

/// A numeric figure or the "unavailable" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Figure {
    /// Displayable value (a fraction, e.g. `0.15` for 15%).
    Available(f64),
    /// Not displayable.
    #[default]
    Unavailable,
}

impl Figure {
    /// The value when available.
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Available(v) => Some(v),
            Self::Unavailable => None,
        }
    }

    /// True when the figure may be displayed.
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// `"15.00%"`, or the placeholder.
    #[must_use]
    pub fn format_percent(self) -> String {
        match self {
            Self::Available(v) => format!("{:.2}%", v * 100.0),
            Self::Unavailable => UNAVAILABLE.to_string(),
        }
    }

    /// `"+50.00%"` / `"-3.10%"`, or the placeholder.
    #[must_use]
    pub fn format_signed_percent(self) -> String {
        match self {
            Self::Available(v) => format!("{:+.2}%", v * 100.0),
            Self::Unavailable => UNAVAILABLE.to_string(),
        }
    }
}

impl fmt::Display for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_percent())
    }
}

/// Conversion rate or win probability: shown only with enough backing users.
#[must_use]
pub fn rate_figure(value: f64, users: u64, min_users: u64) -> Figure {
    if users >= min_users {
        Figure::Available(value)
    } else {
        Figure::Unavailable
    }
}

/// Uplift: shown only with enough users, and never for the control row.
#[must_use]
pub fn uplift_figure(value: f64, users: u64, is_control: bool, min_users: u64) -> Figure {
    if is_control {
        return Figure::Unavailable;
    }
    rate_figure(value, users, min_users)
}
