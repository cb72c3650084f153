pub mod account;
pub mod points;
pub mod reset;

pub use account::{Account, AccountRecord};
pub use points::PointsRecord;
pub use reset::ResetTokenRecord;
