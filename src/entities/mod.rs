pub mod category;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user;

pub use category::Entity as Category;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
pub use user::Entity as User;
