use std::str::FromStr;
use rust_decimal::Decimal;

pub type MenuItemId = i64;

/// A dish on the menu. Options are free-text labels kept in listed order.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    pub price: Decimal,
    pub available: bool,
    pub options: Vec<String>,
}

impl MenuItem {
    pub fn has_options(&self) -> bool {
        !self.options.is_empty()
    }

    /// Finds the listed label matching `choice`, ignoring case and padding.
    pub fn option_matching(&self, choice: &str) -> Option<&str> {
        let choice = choice.trim();
        self.options
            .iter()
            .find(|label| label.eq_ignore_ascii_case(choice))
            .map(String::as_str)
    }
}

/// Payload for adding a menu item.
#[derive(Debug, Clone)]
pub struct MenuItemCreate {
    pub name: String,
    pub price: Decimal,
    pub available: bool,
    pub options: Vec<String>,
}

impl MenuItemCreate {
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into().trim().to_string(),
            price,
            available: true,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, raw: &str) -> Self {
        self.options = parse_options(raw);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

/// Partial update; `options: Some(vec![])` clears the options.
#[derive(Debug, Clone, Default)]
pub struct MenuItemPatch {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub available: Option<bool>,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuQuery {
    All,
    Available,
}

/// Splits a comma-separated option list, trimming labels and dropping blanks.
pub fn parse_options(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

/// Column form of an option list: `None` when there are no options.
pub fn join_options(options: &[String]) -> Option<String> {
    if options.is_empty() {
        None
    } else {
        Some(options.join(","))
    }
}

pub fn parse_price(raw: &str) -> Result<Decimal, String> {
    let price = Decimal::from_str(raw.trim()).map_err(|_| format!("Bad price: {:?}", raw))?;
    check_price(price)?;
    Ok(price)
}

pub fn check_price(price: Decimal) -> Result<(), String> {
    if price.is_sign_negative() {
        return Err(format!("Price cannot be negative: {}", price));
    }
    Ok(())
}
