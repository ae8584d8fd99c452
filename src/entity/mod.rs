pub mod addresses;
pub mod audit_logs;
pub mod categories;
pub mod customers;
pub mod deliveries;
pub mod order_items;
pub mod orders;
pub mod partners;
pub mod payments;
pub mod product_categories;
pub mod products;
pub mod users;

pub use addresses::Entity as Addresses;
pub use audit_logs::Entity as AuditLogs;
pub use categories::Entity as Categories;
pub use customers::Entity as Customers;
pub use deliveries::Entity as Deliveries;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use partners::Entity as Partners;
pub use payments::Entity as Payments;
pub use product_categories::Entity as ProductCategories;
pub use products::Entity as Products;
pub use users::Entity as Users;
