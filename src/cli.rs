use std::time::Duration;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};
use crate::actor_framework::Repository;
use crate::app_system::KitchenSystem;
use crate::clients::OrderClient;
use crate::config::AppConfig;
use crate::domain::{
    join_options, parse_options, parse_price, password_digest, Credentials, MenuItem,
    MenuItemCreate, MenuItemId, MenuItemPatch, MenuQuery, Order, OrderId, OrderLine,
    Registration, Role, Session, User, UserCreate,
};
use crate::order_actor::OrderActionResult;
use crate::store::{MemoryStore, PgStore};
use crate::tracker::OrderTracker;

#[derive(Parser)]
#[command(name = "cloud_kitchen")]
#[command(about = "Cloud Kitchen ordering", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Args)]
pub struct Login {
    #[arg(long, env = "CLOUDKITCHEN_EMAIL")]
    email: String,

    #[arg(long, env = "CLOUDKITCHEN_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or upgrade the database schema
    Migrate,

    /// Create a customer account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Show the menu (available items unless --all)
    Menu {
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Place an order
    Order {
        #[command(flatten)]
        login: Login,

        /// Basket line as ID:QTY[:OPTION], repeatable
        #[arg(long = "item", required = true)]
        items: Vec<OrderLine>,

        /// Follow the new order's status until it completes
        #[arg(long, default_value_t = false)]
        track: bool,
    },

    /// Your 20 most recent orders
    Orders {
        #[command(flatten)]
        login: Login,
    },

    /// Follow one of your orders (any order for staff) until it completes
    Track {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        id: OrderId,
    },

    /// Add a menu item (staff)
    MenuAdd {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_price)]
        price: Decimal,
        /// Comma-separated option labels
        #[arg(long)]
        options: Option<String>,
        #[arg(long, default_value_t = false)]
        unavailable: bool,
    },

    /// Change a menu item (staff); an empty --options clears them
    MenuUpdate {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        id: MenuItemId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = parse_price)]
        price: Option<Decimal>,
        #[arg(long)]
        available: Option<bool>,
        #[arg(long)]
        options: Option<String>,
    },

    /// Remove a menu item (staff)
    MenuDelete {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        id: MenuItemId,
    },

    /// Every order, newest first (staff)
    AllOrders {
        #[command(flatten)]
        login: Login,
    },

    /// Move an order to its next status (staff)
    Advance {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        id: OrderId,
    },

    /// Run a scripted session against an in-process store
    Demo,
}

pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let period = config.tracking.interval();
    match cli.cmd {
        Commands::Migrate => {
            let store = PgStore::connect(&config.database).await?;
            store.migrate().await?;
            println!("Schema is up to date");
            Ok(())
        }
        Commands::Demo => run_demo(period).await,
        cmd => {
            let store = PgStore::connect(&config.database).await?;
            let system = KitchenSystem::new(store);
            let outcome = dispatch(&system, cmd, period).await;
            system.shutdown().await?;
            outcome
        }
    }
}

async fn dispatch(system: &KitchenSystem, cmd: Commands, period: Duration) -> Result<()> {
    match cmd {
        Commands::Register { name, email, password } => {
            let id = system.user_client.register(Registration::new(name, email, password)).await?;
            println!("Registered user #{}", id);
        }
        Commands::Menu { all } => {
            let query = if all { MenuQuery::All } else { MenuQuery::Available };
            for item in system.menu_client.list_menu(query).await? {
                print_menu_item(&item);
            }
        }
        Commands::Order { login, items, track } => {
            let session = sign_in(system, login).await?;
            let id = system.order_client.place_order(&session, items).await?;
            println!("Order #{} placed", id);
            if track {
                follow(&mut system.tracker(period), id).await;
            }
        }
        Commands::Orders { login } => {
            let session = sign_in(system, login).await?;
            for order in system.order_client.my_orders(&session).await? {
                print_order(&order);
            }
        }
        Commands::Track { login, id } => {
            let session = sign_in(system, login).await?;
            system.order_client.check_tracking_access(&session, id).await?;
            follow(&mut system.tracker(period), id).await;
        }
        Commands::MenuAdd { login, name, price, options, unavailable } => {
            let session = sign_in(system, login).await?;
            let mut item = MenuItemCreate::new(name, price).with_options(options.as_deref().unwrap_or(""));
            if unavailable {
                item = item.unavailable();
            }
            let id = system.menu_client.add_menu_item(&session, item).await?;
            println!("Menu item #{} added", id);
        }
        Commands::MenuUpdate { login, id, name, price, available, options } => {
            let session = sign_in(system, login).await?;
            let patch = MenuItemPatch {
                name,
                price,
                available,
                options: options.as_deref().map(parse_options),
            };
            let item = system.menu_client.update_menu_item(&session, id, patch).await?;
            print_menu_item(&item);
        }
        Commands::MenuDelete { login, id } => {
            let session = sign_in(system, login).await?;
            system.menu_client.delete_menu_item(&session, id).await?;
            println!("Menu item #{} deleted", id);
        }
        Commands::AllOrders { login } => {
            let session = sign_in(system, login).await?;
            for order in system.order_client.list_orders(&session).await? {
                print_order(&order);
            }
        }
        Commands::Advance { login, id } => {
            let session = sign_in(system, login).await?;
            let result = system.order_client.advance_order(&session, id).await?;
            match result {
                OrderActionResult::Advanced { from, to } => println!("Order #{}: {} -> {}", id, from, to),
                OrderActionResult::NoTransition(status) => println!("Order #{} is {}; nothing to advance", id, status),
            }
        }
        Commands::Migrate | Commands::Demo => {}
    }
    Ok(())
}

async fn sign_in(system: &KitchenSystem, login: Login) -> Result<Session> {
    let session = system
        .user_client
        .login(Credentials::new(login.email, login.password))
        .await
        .context("Login failed")?;
    info!(user_id = session.user_id, role = %session.role, "Signed in");
    Ok(session)
}

/// Prints every state change until the loop ends or Ctrl-C is pressed.
async fn follow(tracker: &mut OrderTracker<OrderClient>, id: OrderId) {
    let mut rx = tracker.track(id);
    println!("Order #{}: {}", id, *rx.borrow_and_update());
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("Order #{}: {}", id, *rx.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => {
                warn!(order_id = id, "Tracking interrupted");
                break;
            }
        }
    }
    tracker.stop();
}

fn print_menu_item(item: &MenuItem) {
    let availability = if item.available { "" } else { " (unavailable)" };
    match join_options(&item.options) {
        Some(options) => println!("#{:<4} {:<24} {:>8}  [{}]{}", item.id, item.name, item.price, options, availability),
        None => println!("#{:<4} {:<24} {:>8}{}", item.id, item.name, item.price, availability),
    }
}

fn print_order(order: &Order) {
    println!(
        "Order #{} {} {} {} total {}",
        order.id,
        order.created_at.format("%Y-%m-%d %H:%M"),
        order.customer_name.as_deref().unwrap_or("?"),
        order.status,
        order.total,
    );
    for item in &order.items {
        let option = item.option_selected.as_deref().map(|o| format!(" ({})", o)).unwrap_or_default();
        println!("    {} x #{}{} @ {}", item.quantity, item.menu_item_id, option, item.unit_price);
    }
}

async fn run_demo(period: Duration) -> Result<()> {
    let store = MemoryStore::new();
    Repository::<User>::insert(&store, UserCreate {
        name: "Kitchen".into(),
        email: "staff@kitchen.local".into(),
        password_digest: password_digest("staff@kitchen.local", "staff"),
        role: Role::Admin,
    })
    .await?;
    let system = KitchenSystem::new(store);

    system.user_client.register(Registration::new("Demo Customer", "demo@kitchen.local", "demo")).await?;
    let customer = system.user_client.login(Credentials::new("demo@kitchen.local", "demo")).await?;
    let staff = system.user_client.login(Credentials::new("staff@kitchen.local", "staff")).await?;

    let curry = system
        .menu_client
        .add_menu_item(&staff, MenuItemCreate::new("Butter Chicken", dec!(12.50)).with_options("Mild, Medium, Hot"))
        .await?;
    let rice = system.menu_client.add_menu_item(&staff, MenuItemCreate::new("Jeera Rice", dec!(3.75))).await?;
    system
        .menu_client
        .add_menu_item(&staff, MenuItemCreate::new("Mango Lassi", dec!(4.00)).unavailable())
        .await?;

    println!("Menu:");
    for item in system.menu_client.list_menu(MenuQuery::Available).await? {
        print_menu_item(&item);
    }

    let lines = vec![OrderLine::new(curry, 2).with_option("Hot"), OrderLine::new(rice, 1)];
    let order_id = system.order_client.place_order(&customer, lines).await?;
    println!("Order #{} placed", order_id);

    // Staff works through the order while the customer watches.
    let kitchen = system.order_client.clone();
    let cook = tokio::spawn(async move {
        for _ in 0..2 {
            tokio::time::sleep(period * 2).await;
            kitchen.advance_order(&staff, order_id).await?;
        }
        Ok::<_, anyhow::Error>(())
    });

    let mut tracker = system.tracker(period);
    follow(&mut tracker, order_id).await;
    drop(tracker);
    cook.await??;

    println!("Your orders:");
    for order in system.order_client.my_orders(&customer).await? {
        print_order(&order);
    }

    system.shutdown().await?;
    Ok(())
}
