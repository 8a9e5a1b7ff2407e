pub mod charge;
pub mod pix;
pub mod plan;
pub mod session;
pub mod status;
pub mod user;
