//! Aggregates module
pub mod product;
pub mod cart;
pub mod order;
pub mod payment_session;
pub mod user;

pub use product::{Product, ProductError};
pub use cart::{Cart, CartItem, CartLine, CartSnapshot};
pub use order::{Order, OrderError, OrderItem, OrderStatus};
pub use payment_session::PaymentSession;
pub use user::{User, UserProfile};
