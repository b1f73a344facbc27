pub mod enums;
pub mod vitals;
pub mod triage;
pub mod note;
pub mod patient;

pub use enums::*;
pub use vitals::*;
pub use triage::*;
pub use note::*;
pub use patient::*;
