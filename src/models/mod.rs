pub mod balance_book;
pub mod identity;
pub mod order;
pub mod pair_balance;

pub use balance_book::{BalanceBook, BiggestDebtor};
pub use identity::Identity;
pub use order::{Cost, Order};
pub use pair_balance::{Debt, PairBalance, PAIR_KEY_SEPARATOR};
