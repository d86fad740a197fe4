//! Domain models.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`] and from the request bodies in [`crate::routes`]. Response
//! bodies serialize these types directly.

pub mod customer;
pub mod order;
pub mod product;
pub mod status;

pub use customer::{Address, Customer, CustomerUpdate, NewAddress, NewCustomer};
pub use order::{
    Basket, BasketItem, NewCheckout, Order, OrderDetails, Payment, PaymentUpdate, PricedLine,
};
pub use product::{NewProduct, Product};
pub use status::{NewStatus, Status};
