pub mod buwizz;
pub mod logging;
