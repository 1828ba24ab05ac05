//! Supported currency codes.
//!
//! Currencies are defined declaratively with `define_currencies!`, which
//! generates the `CurrencyCode` enum together with its metadata lookups,
//! parsing and display.
//!
//! # Adding a New Currency
//! Add a line to the macro invocation at the bottom of this file:
//! ```ignore
//! define_currencies! {
//!     // ... existing currencies ...
//!     GBP => ("GBP", "British Pound", "£"),
//! }
//! ```

use crate::error::DomainError;

macro_rules! define_currencies {
    (
        $(
            $(#[$meta:meta])*
            $name:ident => ($code:literal, $display:literal, $symbol:literal)
        ),* $(,)?
    ) => {
        /// ISO-like 3-letter codes of every currency the system supports.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize, utoipa::ToSchema,
        )]
        #[serde(rename_all = "UPPERCASE")]
        pub enum CurrencyCode {
            $($(#[$meta])* $name),*
        }

        impl CurrencyCode {
            pub fn code(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $code),*
                }
            }

            pub fn display_name(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $display),*
                }
            }

            pub fn symbol(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $symbol),*
                }
            }

            /// Every supported code, in declaration order.
            pub fn all() -> &'static [CurrencyCode] {
                &[$(CurrencyCode::$name),*]
            }
        }

        impl std::fmt::Display for CurrencyCode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.code())
            }
        }

        impl std::str::FromStr for CurrencyCode {
            type Err = DomainError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($code => Ok(CurrencyCode::$name),)*
                    _ => Err(DomainError::UnsupportedCurrency(s.to_string())),
                }
            }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// CURRENCY DEFINITIONS
// ─────────────────────────────────────────────────────────────────────────────

define_currencies! {
    /// New Taiwan Dollar
    TWD => ("TWD", "New Taiwan Dollar", "NT$"),
    /// US Dollar
    USD => ("USD", "US Dollar", "$"),
    /// Euro
    EUR => ("EUR", "Euro", "€"),
    /// Japanese Yen
    JPY => ("JPY", "Japanese Yen", "¥"),
    /// Chinese Yuan
    CNY => ("CNY", "Chinese Yuan", "CN¥"),
}
