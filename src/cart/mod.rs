//! Cart engine: order line items, quantities and totals.
//!
//! The cart is mutated only through [`Cart::add`] and [`Cart::remove`];
//! there is no direct quantity assignment.

pub mod menu;
pub mod model;

pub use menu::{Menu, StoreInfo};
pub use model::{CartItem, Category, MenuItem, format_brl};

use rust_decimal::Decimal;
use tracing::debug;

use model::MAX_QUANTITY;

/// Line items keyed by menu item id, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit. Silently ignored once the line is at the ceiling.
    pub fn add(&mut self, item: &MenuItem) {
        match self.lines.iter_mut().find(|line| line.item.id == item.id) {
            Some(line) if line.quantity >= MAX_QUANTITY => {
                debug!(item_id = item.id, "Quantity ceiling reached, ignoring add");
            }
            Some(line) => line.quantity += 1,
            None => self.lines.push(CartItem {
                item: item.clone(),
                quantity: 1,
            }),
        }
    }

    /// Remove one unit; the line disappears when it reaches zero.
    pub fn remove(&mut self, item_id: u32) {
        let Some(index) = self.lines.iter().position(|line| line.item.id == item_id) else {
            return;
        };
        if self.lines[index].quantity <= 1 {
            self.lines.remove(index);
        } else {
            self.lines[index].quantity -= 1;
        }
    }

    pub fn lines(&self) -> &[CartItem] {
        &self.lines
    }

    /// Quantity for an item; absent items are quantity 0.
    pub fn quantity_of(&self, item_id: u32) -> u8 {
        self.lines
            .iter()
            .find(|line| line.item.id == item_id)
            .map(|line| line.quantity)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| u32::from(line.quantity)).sum()
    }

    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartItem::line_total).sum()
    }

    /// The fee is only charged on a non-empty order.
    pub fn delivery_fee(&self, fee: Decimal) -> Decimal {
        if self.subtotal() > Decimal::ZERO {
            fee
        } else {
            Decimal::ZERO
        }
    }

    pub fn total(&self, fee: Decimal) -> Decimal {
        self.subtotal() + self.delivery_fee(fee)
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rust_decimal_macros::dec;

    use super::*;

    fn burger() -> MenuItem {
        MenuItem::new(1, "Classic Burger", "", dec!(25.00), Category::Burgers)
    }

    fn soda() -> MenuItem {
        MenuItem::new(6, "Refrigerante Lata", "", dec!(6.00), Category::Drinks)
    }

    #[test]
    fn classic_burger_scenario() {
        let mut cart = Cart::new();
        cart.add(&burger());
        cart.add(&burger());
        assert_eq!(cart.subtotal(), dec!(50.00));
        assert_eq!(cart.total(dec!(7.00)), dec!(57.00));
    }

    #[test]
    fn empty_cart_has_zero_total() {
        let cart = Cart::new();
        assert_eq!(cart.subtotal(), Decimal::ZERO);
        assert_eq!(cart.total(dec!(7.00)), Decimal::ZERO);
    }

    #[test]
    fn remove_drops_line_at_zero() {
        let mut cart = Cart::new();
        cart.add(&burger());
        cart.remove(1);
        assert!(cart.is_empty());
        assert_eq!(cart.quantity_of(1), 0);

        // Removing an absent item is a no-op.
        cart.remove(1);
        assert!(cart.is_empty());
    }

    #[test]
    fn add_stops_at_ceiling() {
        let mut cart = Cart::new();
        for _ in 0..150 {
            cart.add(&burger());
        }
        assert_eq!(cart.quantity_of(1), MAX_QUANTITY);
    }

    #[test]
    fn invariants_hold_under_random_operations() {
        let items = [burger(), soda()];
        let fee = dec!(7.00);
        let mut rng = rand::thread_rng();
        let mut cart = Cart::new();

        for _ in 0..2000 {
            let item = &items[rng.gen_range(0..items.len())];
            if rng.gen_bool(0.6) {
                cart.add(item);
            } else {
                cart.remove(item.id);
            }

            for line in cart.lines() {
                assert!((1..=MAX_QUANTITY).contains(&line.quantity));
            }
            let expected: Decimal = cart.lines().iter().map(|l| l.item.price * Decimal::from(l.quantity)).sum();
            assert_eq!(cart.subtotal(), expected);
            let expected_fee = if expected > Decimal::ZERO { fee } else { Decimal::ZERO };
            assert_eq!(cart.total(fee), expected + expected_fee);
        }
    }
}
