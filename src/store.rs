//! Fixed in-memory datasets backing the demo API
//!
//! The records are read-only after construction, so the store can be shared
//! across request tasks without locking.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub stock: i64,
}

#[derive(Debug, Clone)]
pub struct Store {
    users: Vec<User>,
    products: Vec<Product>,
}

impl Store {
    /// Build the store with the fixed demo dataset
    pub fn with_demo_data() -> Self {
        Self {
            users: vec![
                User {
                    id: 1,
                    name: "Alice Johnson".to_string(),
                    email: "alice@example.com".to_string(),
                },
                User {
                    id: 2,
                    name: "Bob Smith".to_string(),
                    email: "bob@example.com".to_string(),
                },
                User {
                    id: 3,
                    name: "Charlie Brown".to_string(),
                    email: "charlie@example.com".to_string(),
                },
            ],
            products: vec![
                Product {
                    id: 1,
                    name: "Laptop".to_string(),
                    price: 999.99,
                    stock: 50,
                },
                Product {
                    id: 2,
                    name: "Mouse".to_string(),
                    price: 29.99,
                    stock: 200,
                },
                Product {
                    id: 3,
                    name: "Keyboard".to_string(),
                    price: 79.99,
                    stock: 150,
                },
            ],
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn find_user(&self, id: i64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn find_product(&self, id: i64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_data_shape() {
        let store = Store::with_demo_data();
        assert_eq!(store.users().len(), 3);
        assert_eq!(store.products().len(), 3);
    }

    #[test]
    fn test_find_user() {
        let store = Store::with_demo_data();

        let user = store.find_user(1).unwrap();
        assert_eq!(user.name, "Alice Johnson");
        assert_eq!(user.email, "alice@example.com");

        assert!(store.find_user(42).is_none());
        assert!(store.find_user(-1).is_none());
    }

    #[test]
    fn test_find_product() {
        let store = Store::with_demo_data();

        let product = store.find_product(2).unwrap();
        assert_eq!(product.name, "Mouse");
        assert_eq!(product.stock, 200);

        assert!(store.find_product(0).is_none());
    }
}
