// Models module - Database entity representations

pub mod appeal;
pub mod coupon;
pub mod petition;
pub mod principal;

pub use appeal::Appeal;
pub use coupon::Coupon;
pub use petition::Petition;
pub use principal::{Principal, Role};
