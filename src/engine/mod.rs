pub mod matcher;
pub mod planner;
