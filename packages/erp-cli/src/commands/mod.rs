pub mod batch;
pub mod defaults;
pub mod run;
pub mod validate;
