mod common;

use chatshop::application::storefront::{Ack, GatewayReply, Reply};
use chatshop::domain::command::{Command, GatewayEvent};
use chatshop::domain::intent::{IntentId, IntentStatus};
use chatshop::domain::product::{Money, ProductId};
use chatshop::domain::user::{ChatId, UserId};
use common::{Shop, product};

const USER: UserId = UserId(1);
const CHAT: ChatId = ChatId(100);

fn command(action: &str) -> Command {
    action.parse().unwrap()
}

fn catalog() -> Shop {
    let mut tea = product("tea", "Green Tea", 50, 10);
    tea.category = "Drinks".to_string();
    tea.featured = true;
    let mut pot = product("pot", "Clay Teapot", 300, 1);
    pot.category = "Home".to_string();
    let mut cup = product("cup", "Cup", 40, 0);
    cup.category = "Home".to_string();
    Shop::new(vec![tea, pot, cup])
}

#[tokio::test]
async fn test_browsing() {
    let shop = catalog();

    let menu = shop.storefront.handle(USER, CHAT, command("main_menu")).await;
    match menu.reply {
        Reply::Menu { featured } => {
            assert_eq!(featured.len(), 1);
            assert_eq!(featured[0].id, ProductId::from("tea"));
        }
        other => panic!("unexpected reply {other:?}"),
    }

    let categories = shop.storefront.handle(USER, CHAT, command("back_to_shop")).await;
    assert_eq!(
        categories.reply,
        Reply::Categories(vec!["Drinks".to_string(), "Home".to_string()])
    );

    let home = shop.storefront.handle(USER, CHAT, command("category:home")).await;
    match home.reply {
        Reply::Products { products, .. } => assert_eq!(products.len(), 2),
        other => panic!("unexpected reply {other:?}"),
    }

    let search = shop.storefront.handle(USER, CHAT, command("search:clay")).await;
    match search.reply {
        Reply::Products { products, .. } => assert_eq!(products[0].id, ProductId::from("pot")),
        other => panic!("unexpected reply {other:?}"),
    }

    let nothing = shop.storefront.handle(USER, CHAT, command("search:coffee")).await;
    assert!(matches!(nothing.reply, Reply::Notice(_)));
}

#[tokio::test]
async fn test_add_to_cart_acks() {
    let shop = catalog();

    let added = shop.storefront.handle(USER, CHAT, command("add_cart:tea")).await;
    assert_eq!(added.ack, Ack::Toast("Added to cart".to_string()));

    let sold_out = shop.storefront.handle(USER, CHAT, command("add_cart:cup")).await;
    assert_eq!(sold_out.ack, Ack::Alert("Cup is sold out.".to_string()));

    let missing = shop.storefront.handle(USER, CHAT, command("add_cart:nope")).await;
    assert_eq!(missing.ack, Ack::Alert("Product not found.".to_string()));

    assert_eq!(shop.carts.item_count(USER).await.unwrap(), 1);
}

#[tokio::test]
async fn test_quantity_changes() {
    let shop = catalog();
    shop.storefront.handle(USER, CHAT, command("add_cart:pot")).await;

    let too_many = shop.storefront.handle(USER, CHAT, command("quantity:pot:1")).await;
    assert_eq!(
        too_many.ack,
        Ack::Alert("Not enough stock, only 1 left.".to_string())
    );
    assert_eq!(shop.carts.item_count(USER).await.unwrap(), 1);

    shop.storefront.handle(USER, CHAT, command("add_cart:tea")).await;
    let more = shop.storefront.handle(USER, CHAT, command("quantity:tea:2")).await;
    match more.reply {
        Reply::CartItem(line) => {
            assert_eq!(line.quantity, 3);
            assert_eq!(line.subtotal, Money::new(150));
        }
        other => panic!("unexpected reply {other:?}"),
    }

    let gone = shop.storefront.handle(USER, CHAT, command("quantity:tea:-5")).await;
    match gone.reply {
        Reply::Cart(summary) => {
            assert_eq!(summary.lines.len(), 1);
            assert_eq!(summary.total, Money::new(300));
        }
        other => panic!("unexpected reply {other:?}"),
    }
}

#[tokio::test]
async fn test_checkout_and_payment_flow() {
    let shop = catalog();
    shop.storefront.handle(USER, CHAT, command("add_cart:tea")).await;
    shop.storefront.handle(USER, CHAT, command("quantity:tea:1")).await;

    let checkout = shop.storefront.handle(USER, CHAT, command("checkout")).await;
    let receipt = match checkout.reply {
        Reply::Invoiced(receipt) => receipt,
        other => panic!("unexpected reply {other:?}"),
    };
    assert_eq!(receipt.total, Money::new(100));

    let precheck = shop
        .storefront
        .on_gateway_event(GatewayEvent::PreCheckout {
            token: receipt.token.clone(),
        })
        .await;
    assert_eq!(
        precheck,
        GatewayReply::PreCheckout {
            ok: true,
            error_message: None
        }
    );

    let payment = GatewayEvent::Payment {
        token: receipt.token.clone(),
        charge_id: "ch_1".to_string(),
        amount: Money::new(100),
    };
    match shop.storefront.on_gateway_event(payment.clone()).await {
        GatewayReply::Payment {
            notify: Some((chat, message)),
        } => {
            assert_eq!(chat, CHAT);
            assert!(message.contains("ch_1"));
        }
        other => panic!("unexpected reply {other:?}"),
    }
    assert_eq!(
        shop.storefront.on_gateway_event(payment).await,
        GatewayReply::Payment { notify: None }
    );
    assert_eq!(shop.stock_of("tea").await, 8);

    let after = shop
        .storefront
        .on_gateway_event(GatewayEvent::PreCheckout {
            token: receipt.token,
        })
        .await;
    assert!(matches!(after, GatewayReply::PreCheckout { ok: false, .. }));
}

#[tokio::test]
async fn test_empty_checkout_is_a_notice() {
    let shop = catalog();
    let outcome = shop.storefront.handle(USER, CHAT, command("checkout")).await;
    assert_eq!(outcome.reply, Reply::Notice("Your cart is empty.".to_string()));
    assert_eq!(outcome.ack, Ack::Silent);
}

#[tokio::test]
async fn test_unknown_token_is_rejected() {
    let shop = catalog();
    let token = IntentId::from("pay_0_1_0");

    let precheck = shop
        .storefront
        .on_gateway_event(GatewayEvent::PreCheckout {
            token: token.clone(),
        })
        .await;
    assert_eq!(
        precheck,
        GatewayReply::PreCheckout {
            ok: false,
            error_message: Some("Order expired or not found.".to_string())
        }
    );

    // Nobody to notify: the token maps to no chat.
    let payment = shop
        .storefront
        .on_gateway_event(GatewayEvent::Payment {
            token: token.clone(),
            charge_id: "ch_x".to_string(),
            amount: Money::new(1),
        })
        .await;
    assert_eq!(payment, GatewayReply::Payment { notify: None });
    assert!(shop.ledger.get(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_late_payment_notifies_buyer() {
    let shop = catalog();
    shop.storefront.handle(USER, CHAT, command("add_cart:tea")).await;
    let receipt = shop.coordinator.checkout(USER, CHAT).await.unwrap();
    shop.ledger.expire(0).await.unwrap();

    let reply = shop
        .storefront
        .on_gateway_event(GatewayEvent::Payment {
            token: receipt.token.clone(),
            charge_id: "ch_late".to_string(),
            amount: Money::new(50),
        })
        .await;
    match reply {
        GatewayReply::Payment {
            notify: Some((chat, message)),
        } => {
            assert_eq!(chat, CHAT);
            assert!(message.contains(receipt.token.as_str()));
        }
        other => panic!("unexpected reply {other:?}"),
    }
    let intent = shop.ledger.get(&receipt.token).await.unwrap().unwrap();
    assert_eq!(intent.status(), IntentStatus::Expired);
    assert_eq!(shop.stock_of("tea").await, 10);
}
