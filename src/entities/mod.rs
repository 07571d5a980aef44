pub mod category;
pub mod product;
pub mod transaction;

pub use transaction::TransactionType;
