//! Priced item catalog
//!
//! The catalog is supplied from outside the workflow core and is read-only
//! to it. Prices are fixed-point (integer cents) so running totals never
//! accumulate rounding error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid price: {0:?}")]
    InvalidPrice(String),
    #[error("Duplicate catalog item: {0}")]
    DuplicateItem(String),
    #[error("Catalog item name {0:?} is empty, has surrounding whitespace, or contains '[', ']' or ','")]
    InvalidItemName(String),
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// Price
// ============================================================================

/// Non-negative money amount stored as integer cents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Price(u64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn saturating_add(self, other: Price) -> Price {
        Price(self.0.saturating_add(other.0))
    }

    #[must_use]
    pub fn saturating_sub(self, other: Price) -> Price {
        Price(self.0.saturating_sub(other.0))
    }
}

impl FromStr for Price {
    type Err = CatalogError;

    /// Accepts `"$9.99"`, `"9.99"`, `"9.9"` and `"9"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CatalogError::InvalidPrice(s.to_string());
        let text = s.trim();
        let text = text.strip_prefix('$').unwrap_or(text).trim();

        let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if text.ends_with('.') {
            return Err(invalid());
        }

        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let frac_cents: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .map(Price)
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for Price {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Price> for String {
    fn from(price: Price) -> Self {
        price.to_string()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// One priced menu entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub price: Price,
}

/// On-disk shape of a catalog file
#[derive(Debug, Deserialize)]
struct CatalogFile {
    name: String,
    items: Vec<CatalogItem>,
}

/// Read-only mapping from item name to price
#[derive(Debug, Clone)]
pub struct Catalog {
    name: String,
    items: Vec<CatalogItem>,
    prices: HashMap<String, Price>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate names and names that would be
    /// ambiguous inside a cart update (`[`, `]`, `,`).
    pub fn new(name: impl Into<String>, items: Vec<CatalogItem>) -> Result<Self, CatalogError> {
        let mut prices = HashMap::with_capacity(items.len());
        for item in &items {
            if !is_valid_item_name(&item.name) {
                return Err(CatalogError::InvalidItemName(item.name.clone()));
            }
            if prices.insert(item.name.clone(), item.price).is_some() {
                return Err(CatalogError::DuplicateItem(item.name.clone()));
            }
        }
        Ok(Self {
            name: name.into(),
            items,
            prices,
        })
    }

    /// The built-in "Fresh Burger" menu
    pub fn fresh_burger() -> Self {
        let items = [
            ("King Burger", 999),
            ("Mini Burger", 799),
            ("French Fries", 299),
            ("Onion Rings", 399),
            ("Large Fountain Drink", 399),
            ("Medium Fountain Drink", 299),
        ];
        let items: Vec<CatalogItem> = items
            .into_iter()
            .map(|(name, cents)| CatalogItem {
                name: name.to_string(),
                price: Price::from_cents(cents),
            })
            .collect();
        let prices = items.iter().map(|i| (i.name.clone(), i.price)).collect();
        Self {
            name: "Fresh Burger".to_string(),
            items,
            prices,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.name, file.items)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn price(&self, item: &str) -> Option<Price> {
        self.prices.get(item).copied()
    }

    pub fn contains(&self, item: &str) -> bool {
        self.prices.contains_key(item)
    }

    /// Menu rendering embedded in handler prompts
    pub fn to_prompt_text(&self) -> String {
        let mut out = format!("name: {}\nitems:\n", self.name);
        for item in &self.items {
            out.push_str(&format!(
                "    - name: {}\n      price: ${}\n",
                item.name, item.price
            ));
        }
        out
    }
}

/// Names must survive the cart parser unchanged: it trims items and
/// splits on brackets and commas.
fn is_valid_item_name(name: &str) -> bool {
    !name.is_empty() && name.trim() == name && !name.contains(['[', ']', ','])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_parsing() {
        assert_eq!("$9.99".parse::<Price>().unwrap(), Price::from_cents(999));
        assert_eq!("9.99".parse::<Price>().unwrap(), Price::from_cents(999));
        assert_eq!("2.5".parse::<Price>().unwrap(), Price::from_cents(250));
        assert_eq!("7".parse::<Price>().unwrap(), Price::from_cents(700));
        assert_eq!(" $ 3.99 ".parse::<Price>().unwrap(), Price::from_cents(399));

        for bad in ["", "$", "-1.00", "1.999", "abc", "1.", ".5", "1.a"] {
            assert!(bad.parse::<Price>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price::from_cents(999).to_string(), "9.99");
        assert_eq!(Price::from_cents(5).to_string(), "0.05");
        assert_eq!(Price::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_price_serde_as_string() {
        let json = serde_json::to_string(&Price::from_cents(1234)).unwrap();
        assert_eq!(json, "\"12.34\"");
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Price::from_cents(1234));
        assert!(serde_json::from_str::<Price>("\"oops\"").is_err());
    }

    #[test]
    fn test_fresh_burger_menu() {
        let catalog = Catalog::fresh_burger();
        assert_eq!(catalog.name(), "Fresh Burger");
        assert_eq!(catalog.items().len(), 6);
        assert_eq!(catalog.price("King Burger"), Some(Price::from_cents(999)));
        assert_eq!(catalog.price("king burger"), None);
        assert!(catalog.contains("Onion Rings"));
    }

    #[test]
    fn test_catalog_from_json() {
        let catalog = Catalog::from_json_str(
            r#"{"name": "Taco Stand", "items": [
                {"name": "Taco", "price": "$3.50"},
                {"name": "Horchata", "price": "2"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(catalog.name(), "Taco Stand");
        assert_eq!(catalog.price("Taco"), Some(Price::from_cents(350)));
        assert_eq!(catalog.price("Horchata"), Some(Price::from_cents(200)));
    }

    #[test]
    fn test_catalog_rejects_ambiguous_names() {
        let item = |name: &str| CatalogItem {
            name: name.to_string(),
            price: Price::ZERO,
        };
        assert!(matches!(
            Catalog::new("m", vec![item("Fries, Large")]),
            Err(CatalogError::InvalidItemName(_))
        ));
        assert!(matches!(
            Catalog::new("m", vec![item("Combo [A]")]),
            Err(CatalogError::InvalidItemName(_))
        ));
        for padded in [" Fries", "Fries\t", "   "] {
            assert!(matches!(
                Catalog::new("m", vec![item(padded)]),
                Err(CatalogError::InvalidItemName(_))
            ));
        }
        assert!(matches!(
            Catalog::new("m", vec![item("Taco"), item("Taco")]),
            Err(CatalogError::DuplicateItem(_))
        ));
    }

    #[test]
    fn test_catalog_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.json");
        std::fs::write(
            &path,
            r#"{"name": "Diner", "items": [{"name": "Pie", "price": "$4.25"}]}"#,
        )
        .unwrap();

        let catalog = Catalog::from_json_file(&path).unwrap();
        assert_eq!(catalog.price("Pie"), Some(Price::from_cents(425)));

        let missing = Catalog::from_json_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(CatalogError::Io(_))));
    }

    #[test]
    fn test_prompt_text_lists_prices() {
        let text = Catalog::fresh_burger().to_prompt_text();
        assert!(text.starts_with("name: Fresh Burger\n"));
        assert!(text.contains("- name: King Burger\n      price: $9.99"));
    }
}
