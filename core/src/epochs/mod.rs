pub mod conditions;
pub mod file;

pub use conditions::{Condition, ConditionMap};
pub use file::{Epochs, EpochsFile};
