pub mod script;
pub mod template;
