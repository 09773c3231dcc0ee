pub mod helpers;
pub mod op;
mod paise;

pub use paise::{Paise, PaiseConversionError, PAISE_PER_RUPEE, RUPEE_CURRENCY_CODE};
