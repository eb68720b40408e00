/// Implements `as_str`, `Display` and `FromStr` for a status-like enum using
/// the same lowercase strings serde writes into the indexed columns.
macro_rules! impl_str_enum {
    ($ty:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $s,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($ty::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($ty), other)),
                }
            }
        }
    };
}

pub(crate) use impl_str_enum;

mod appointment;
mod batch;
mod card;
mod clinic;
mod label;
mod location;
mod message;
mod perk;
mod transaction;

pub use appointment::*;
pub use batch::*;
pub use card::*;
pub use clinic::*;
pub use label::*;
pub use location::*;
pub use message::*;
pub use perk::*;
pub use transaction::*;
