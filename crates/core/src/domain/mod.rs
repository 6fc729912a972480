pub mod history;
pub mod quote;
pub mod selection;
