pub mod issue;
pub mod similar;

pub use issue::*;
pub use similar::*;
