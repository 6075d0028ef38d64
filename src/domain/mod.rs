pub mod classify;
pub mod normalize;
pub mod record;
pub mod zone;
