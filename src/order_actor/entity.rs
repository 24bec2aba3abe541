use crate::actor_framework::{ActionOutcome, Entity};
use crate::domain::{Order, OrderCreate, OrderId, OrderQuery};
use super::actions::{OrderAction, OrderActionResult};

impl Entity for Order {
    const KIND: &'static str = "order";
    type Id = OrderId;
    type CreatePayload = OrderCreate;
    type Patch = ();
    type Query = OrderQuery;
    type Action = OrderAction;
    type ActionResult = OrderActionResult;

    fn id(&self) -> &OrderId { &self.id }

    /// An order needs at least one unit of something, and every line at least one unit.
    fn validate_create(payload: &OrderCreate) -> Result<(), String> {
        if payload.total_quantity() == 0 {
            return Err("Choose at least one item".to_string());
        }
        if let Some(line) = payload.lines.iter().find(|line| line.quantity == 0) {
            return Err(format!("Quantity for menu item {} must be at least 1", line.menu_item_id));
        }
        Ok(())
    }

    /// Placed orders are immutable apart from their status.
    fn on_update(&mut self, _patch: ()) -> Result<(), String> {
        Err("Placed orders cannot be edited".to_string())
    }

    fn on_delete(&self) -> Result<(), String> {
        Err("Orders have no cancellation path".to_string())
    }

    /// Handles order-specific actions.
    ///
    /// # Actions
    /// - `Advance`: moves the status to its successor. A completed order, or one
    ///   whose status text is outside the lifecycle, reports `NoTransition` and is
    ///   left as it is.
    fn handle_action(&mut self, action: OrderAction) -> Result<ActionOutcome<OrderActionResult>, String> {
        match action {
            OrderAction::Advance => {
                let step = self.status.known().and_then(|from| from.next().map(|to| (from, to)));
                match step {
                    Some((from, to)) => {
                        self.status = to.into();
                        Ok(ActionOutcome::changed(OrderActionResult::Advanced { from, to }))
                    }
                    None => Ok(ActionOutcome::unchanged(OrderActionResult::NoTransition(self.status.clone()))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use crate::domain::{OrderLine, OrderStatus, RecordedStatus};

    fn order_with(status: RecordedStatus) -> Order {
        Order {
            id: 1,
            user_id: 1,
            customer_name: None,
            total: dec!(10),
            status,
            created_at: Utc::now(),
            items: Vec::new(),
        }
    }

    #[test]
    fn advance_follows_the_lifecycle() {
        let mut order = order_with(OrderStatus::Pending.into());

        let outcome = order.handle_action(OrderAction::Advance).unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.result, OrderActionResult::Advanced { from: OrderStatus::Pending, to: OrderStatus::Preparing });

        let outcome = order.handle_action(OrderAction::Advance).unwrap();
        assert_eq!(outcome.result, OrderActionResult::Advanced { from: OrderStatus::Preparing, to: OrderStatus::Completed });
        assert_eq!(order.status, RecordedStatus::Known(OrderStatus::Completed));
    }

    #[test]
    fn completed_order_does_not_move() {
        let mut order = order_with(OrderStatus::Completed.into());
        let outcome = order.handle_action(OrderAction::Advance).unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.result, OrderActionResult::NoTransition(OrderStatus::Completed.into()));
        assert_eq!(order, order_with(OrderStatus::Completed.into()));
    }

    #[test]
    fn unrecognized_status_does_not_move() {
        let status = RecordedStatus::parse("ON_HOLD");
        let mut order = order_with(status.clone());
        let outcome = order.handle_action(OrderAction::Advance).unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.result, OrderActionResult::NoTransition(status.clone()));
        assert_eq!(order.status, status);
    }

    #[test]
    fn zero_quantity_payload_is_rejected() {
        let payload = OrderCreate { user_id: 1, lines: vec![OrderLine::new(3, 0)] };
        assert!(Order::validate_create(&payload).is_err());
        let payload = OrderCreate { user_id: 1, lines: vec![] };
        assert!(Order::validate_create(&payload).is_err());
    }

    #[test]
    fn every_line_needs_a_unit() {
        let payload = OrderCreate { user_id: 1, lines: vec![OrderLine::new(3, 0), OrderLine::new(4, 3)] };
        let reason = Order::validate_create(&payload).unwrap_err();
        assert!(reason.contains("menu item 3"));

        let payload = OrderCreate { user_id: 1, lines: vec![OrderLine::new(4, 3)] };
        assert!(Order::validate_create(&payload).is_ok());
    }

    #[test]
    fn placed_orders_are_immutable() {
        let mut order = order_with(OrderStatus::Pending.into());
        assert!(order.on_update(()).is_err());
        assert!(order.on_delete().is_err());
    }
}
