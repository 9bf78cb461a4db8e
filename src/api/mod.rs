pub mod pagination;
pub mod validate;

pub use pagination::{Page, PageQuery};
pub use validate::Validator;
