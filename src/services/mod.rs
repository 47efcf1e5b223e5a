//! Application services. Each takes an already authenticated [`User`]
//! where it needs one and knows nothing about HTTP.
//!
//! [`User`]: crate::domain::aggregates::User

pub mod cart;
pub mod checkout;
pub mod orders;
pub mod payment;
pub mod profile;

pub use cart::{CartService, CartView};
pub use checkout::{CheckoutRedirect, CheckoutService};
pub use orders::OrderService;
pub use payment::{PaymentConfirmation, PaymentService};
pub use profile::ProfileService;
