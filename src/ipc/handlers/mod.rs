pub mod attendance;
pub mod attention;
pub mod core;
pub mod destinations;
pub mod fees;
pub mod reports;
pub mod students;
pub mod vehicles;
