use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use super::{MenuItemId, UserId};

pub type OrderId = i64;

/// Most recent orders shown to a customer.
pub const CUSTOMER_ORDER_LIMIT: i64 = 20;

/// Order lifecycle: `PENDING -> PREPARING -> COMPLETED`, forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Preparing,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Completed => "COMPLETED",
        }
    }

    /// The single successor in the lifecycle, if any.
    pub fn next(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Completed),
            OrderStatus::Completed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "PREPARING" => Ok(OrderStatus::Preparing),
            "COMPLETED" => Ok(OrderStatus::Completed),
            _ => Err(format!("Unrecognized order status: {:?}", s)),
        }
    }
}

/// Status column as read from the store. Text outside the lifecycle is kept
/// verbatim so it can be shown and left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedStatus {
    Known(OrderStatus),
    Unrecognized(String),
}

impl RecordedStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<OrderStatus>() {
            Ok(status) => RecordedStatus::Known(status),
            Err(_) => RecordedStatus::Unrecognized(raw.to_string()),
        }
    }

    pub fn known(&self) -> Option<OrderStatus> {
        match self {
            RecordedStatus::Known(status) => Some(*status),
            RecordedStatus::Unrecognized(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RecordedStatus::Known(status) => status.as_str(),
            RecordedStatus::Unrecognized(raw) => raw,
        }
    }
}

impl From<OrderStatus> for RecordedStatus {
    fn from(status: OrderStatus) -> Self {
        RecordedStatus::Known(status)
    }
}

impl fmt::Display for RecordedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a placed order. The unit price is the menu price at placement.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub option_selected: Option<String>,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Represents a customer order.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Name of the ordering user, when that row still exists.
    pub customer_name: Option<String>,
    pub total: Decimal,
    pub status: RecordedStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// A basket line chosen by the customer.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    pub option: Option<String>,
}

impl OrderLine {
    pub fn new(menu_item_id: MenuItemId, quantity: u32) -> Self {
        Self {
            menu_item_id,
            quantity,
            option: None,
        }
    }

    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.option = Some(option.into());
        self
    }
}

/// `ID:QTY[:OPTION]`, e.g. `3:2:Extra Hot`.
impl FromStr for OrderLine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let id = parts
            .next()
            .and_then(|part| part.trim().parse::<MenuItemId>().ok())
            .ok_or_else(|| format!("Bad menu item id in {:?}", s))?;
        let quantity = parts
            .next()
            .and_then(|part| part.trim().parse::<u32>().ok())
            .ok_or_else(|| format!("Bad quantity in {:?}", s))?;
        let line = OrderLine::new(id, quantity);
        Ok(match parts.next().map(str::trim) {
            Some(option) if !option.is_empty() => line.with_option(option),
            _ => line,
        })
    }
}

/// Payload for placing an order. Prices are looked up by the store.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
}

impl OrderCreate {
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderQuery {
    /// Every order, newest first.
    All,
    /// One customer's orders, newest first.
    ForUser { user_id: UserId, limit: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_moves_forward_only() {
        assert_eq!(OrderStatus::Pending.next(), Some(OrderStatus::Preparing));
        assert_eq!(OrderStatus::Preparing.next(), Some(OrderStatus::Completed));
        assert_eq!(OrderStatus::Completed.next(), None);
        assert!(OrderStatus::Completed.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn recorded_status_keeps_unknown_text() {
        assert_eq!(RecordedStatus::parse("preparing"), RecordedStatus::Known(OrderStatus::Preparing));
        assert_eq!(RecordedStatus::parse(" COMPLETED "), RecordedStatus::Known(OrderStatus::Completed));

        let odd = RecordedStatus::parse("ON_HOLD");
        assert_eq!(odd, RecordedStatus::Unrecognized("ON_HOLD".to_string()));
        assert_eq!(odd.known(), None);
        assert_eq!(odd.to_string(), "ON_HOLD");
    }

    #[test]
    fn order_lines_parse_from_cli_form() {
        assert_eq!("4:2".parse::<OrderLine>(), Ok(OrderLine::new(4, 2)));
        assert_eq!("4:1:Extra Hot".parse::<OrderLine>(), Ok(OrderLine::new(4, 1).with_option("Extra Hot")));
        assert_eq!("4:1: ".parse::<OrderLine>(), Ok(OrderLine::new(4, 1)));
        assert!("four:1".parse::<OrderLine>().is_err());
        assert!("4".parse::<OrderLine>().is_err());
        assert!("4:-1".parse::<OrderLine>().is_err());
    }

    #[test]
    fn create_payload_sums_quantities() {
        let create = OrderCreate {
            user_id: 1,
            lines: vec![OrderLine::new(1, 0), OrderLine::new(2, 3)],
        };
        assert_eq!(create.total_quantity(), 3);
    }
}
