//! Menu and cart data model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Upper bound for a single line's quantity.
pub const MAX_QUANTITY: u8 = 99;

/// Menu sections shown as tabs in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Burgers,
    Sides,
    Drinks,
    Desserts,
}

impl Category {
    pub const ALL: [Category; 4] = [Self::Burgers, Self::Sides, Self::Drinks, Self::Desserts];

    /// Label shown to the customer.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Burgers => "Hambúrgueres",
            Self::Sides => "Acompanhamentos",
            Self::Drinks => "Bebidas",
            Self::Desserts => "Sobremesas",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Burgers => "burgers",
            Self::Sides => "sides",
            Self::Drinks => "drinks",
            Self::Desserts => "desserts",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Category {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "burgers" => Ok(Self::Burgers),
            "sides" => Ok(Self::Sides),
            "drinks" => Ok(Self::Drinks),
            "desserts" => Ok(Self::Desserts),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// A static menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: u32,
    pub name: String,
    pub description: String,
    /// Unit price, never negative.
    pub price: Decimal,
    pub category: Category,
}

impl MenuItem {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Decimal,
        category: Category,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            price: price.max(Decimal::ZERO),
            category,
        }
    }
}

/// A menu item with a quantity in `1..=MAX_QUANTITY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub item: MenuItem,
    pub quantity: u8,
}

impl CartItem {
    /// Unit price × quantity.
    pub fn line_total(&self) -> Decimal {
        self.item.price * Decimal::from(self.quantity)
    }
}

/// Format an amount as Brazilian reais, e.g. `R$ 57,00`.
pub fn format_brl(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    format!("R$ {:.2}", rounded).replace('.', ",")
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn category_display_matches_serde() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(format!("\"{category}\""), json);
            assert_eq!(category.to_string().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn negative_price_is_clamped() {
        let item = MenuItem::new(1, "Free", "", dec!(-3), Category::Sides);
        assert_eq!(item.price, Decimal::ZERO);
    }

    #[test]
    fn brl_formatting() {
        assert_eq!(format_brl(dec!(57)), "R$ 57,00");
        assert_eq!(format_brl(dec!(7.5)), "R$ 7,50");
        assert_eq!(format_brl(dec!(1234.567)), "R$ 1234,57");
    }
}
