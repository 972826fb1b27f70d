pub mod count;
pub mod enums;
pub mod envelope;
pub mod models;

pub use count::*;
pub use enums::*;
pub use envelope::*;
pub use models::*;
