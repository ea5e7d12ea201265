//! Static store and menu reference data.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::model::{Category, MenuItem};
use crate::config::DEFAULT_DELIVERY_FEE;
use crate::safety::fold;

/// Store identity used in chat copy and the order handoff.
#[derive(Debug, Clone, Serialize)]
pub struct StoreInfo {
    pub name: String,
    /// WhatsApp number, digits only, with country code.
    pub whatsapp: String,
    pub delivery_fee: Decimal,
    pub hours: String,
    pub location: String,
}

impl Default for StoreInfo {
    fn default() -> Self {
        Self {
            name: "Burger House".to_string(),
            whatsapp: "5511999999999".to_string(),
            delivery_fee: DEFAULT_DELIVERY_FEE,
            hours: "todos os dias, das 18h às 23h".to_string(),
            location: "Rua Augusta, 1500 - Consolação, São Paulo".to_string(),
        }
    }
}

/// The read-only menu catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Menu {
    items: Vec<MenuItem>,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn find(&self, id: u32) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn by_category(&self, category: Category) -> Vec<&MenuItem> {
        self.items
            .iter()
            .filter(|item| item.category == category)
            .collect()
    }

    /// Items whose name appears in `text`, ignoring case and accents.
    pub fn mentioned_in(&self, text: &str) -> Vec<&MenuItem> {
        let folded = fold(text);
        self.items
            .iter()
            .filter(|item| folded.contains(&fold(&item.name)))
            .collect()
    }
}

impl Default for Menu {
    fn default() -> Self {
        use Category::*;
        Self::new(vec![
            MenuItem::new(1, "Classic Burger", "Pão brioche, blend 160g, queijo cheddar e molho da casa", dec!(25.00), Burgers),
            MenuItem::new(2, "Bacon Burger", "Blend 160g, bacon crocante, cheddar e cebola caramelizada", dec!(29.90), Burgers),
            MenuItem::new(3, "Veggie Burger", "Hambúrguer de grão-de-bico, rúcula e tomate", dec!(27.00), Burgers),
            MenuItem::new(4, "Batata Frita", "Porção individual com sal e alecrim", dec!(12.00), Sides),
            MenuItem::new(5, "Onion Rings", "Anéis de cebola empanados", dec!(14.00), Sides),
            MenuItem::new(6, "Refrigerante Lata", "350ml", dec!(6.00), Drinks),
            MenuItem::new(7, "Suco Natural", "Laranja ou limão, 500ml", dec!(9.00), Drinks),
            MenuItem::new(8, "Brownie", "Brownie de chocolate com calda", dec!(11.00), Desserts),
            MenuItem::new(9, "Milkshake", "Baunilha, chocolate ou morango, 400ml", dec!(16.00), Desserts),
        ])
    }
}
