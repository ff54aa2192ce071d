//! Domain types for the shop.
//!
//! Rows that embed arrays (variants, order items, notifications) are stored
//! as JSONB documents; these are the decoded shapes.

pub mod admin;
pub mod cart;
pub mod category;
pub mod discount;
pub mod order;
pub mod pos_mirror;
pub mod product;
pub mod session;
pub mod settings;
pub mod user;

pub use admin::Admin;
pub use cart::{Cart, CartError, CartItem, Wishlist};
pub use category::{Category, CategoryInput};
pub use discount::{DiscountCode, DiscountError, DiscountInput};
pub use order::{Address, NewOrder, Order, OrderError, OrderItem, StockChange};
pub use pos_mirror::{ItemGroup, Modifier, ModifierGroup};
pub use product::{Product, ProductDraft, StockError, Variant};
pub use session::{CurrentAdmin, CurrentUser};
pub use settings::StoreSettings;
pub use user::{Notification, User};
