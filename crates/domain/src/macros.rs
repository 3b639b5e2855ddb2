//! Macro for implementing Display and FromStr for wire-named enums
//!
//! Slot statuses and booking actions travel as lowercase words between the
//! portal adapter, the configuration files and the logs. This macro keeps the
//! two directions of that mapping in one place.
//!
//! # Example
//!
//! ```rust
//! use washslot_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Shift {
//!     Morning,
//!     Evening,
//! }
//!
//! impl_wire_name_conversions!(Shift {
//!     Morning => "morning",
//!     Evening => "evening",
//! });
//!
//! assert_eq!("EVENING".parse::<Shift>(), Ok(Shift::Evening));
//! ```

/// Implements Display and FromStr for enums with a fixed lowercase wire name
///
/// Parsing is case-insensitive; display always yields the wire name.
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
