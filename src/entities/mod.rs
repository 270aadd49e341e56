pub mod item;
pub mod sales;

pub use item::Entity as Item;
pub use sales::Entity as Sales;
