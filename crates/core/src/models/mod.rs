pub mod band;
pub mod commodity;
pub mod record;
