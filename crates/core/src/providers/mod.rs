pub mod extract;
pub mod http;
pub mod retry;
pub mod traits;

// Commodity sources
pub mod egg_100ppi;
pub mod sge_gold;
