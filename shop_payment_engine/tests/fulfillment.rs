//! Tests for the fulfillment side effects: loyalty award and digital delivery.
use chrono::{Duration, Utc};
use shop_payment_engine::{
    db_types::{LoyaltyTransaction, ProductKind, LOYALTY_KIND_EARNED},
    PaymentGatewayDatabase,
};

use crate::support::{checkout, digital_item, notification, open_payment, physical_item, setup, sign, tear_down};

mod support;

#[tokio::test]
async fn a_paid_order_earns_one_point_per_whole_unit() {
    let api = setup().await;
    // 50.00 USD
    let order = checkout(&api, vec![physical_item("Hoodie", 5000, 1)]).await;
    open_payment(&api, &order, "np_2001").await;
    let body = notification("np_2001", "finished");
    api.apply_notification(&body, &sign(&body)).await.unwrap();

    let user = api.db().fetch_user(order.user_id).await.unwrap().unwrap();
    assert_eq!(user.loyalty_points, 50);
    assert_eq!(user.total_spent, order.total_amount);
    assert_eq!(user.total_orders, 1);
    tear_down(api).await;
}

#[tokio::test]
async fn fractional_remainders_are_dropped() {
    let api = setup().await;
    // 12.99 USD earns 12 points
    let order = checkout(&api, vec![physical_item("Print", 1299, 1)]).await;
    open_payment(&api, &order, "np_2002").await;
    let body = notification("np_2002", "finished");
    api.apply_notification(&body, &sign(&body)).await.unwrap();

    let user = api.db().fetch_user(order.user_id).await.unwrap().unwrap();
    assert_eq!(user.loyalty_points, 12);
    tear_down(api).await;
}

#[tokio::test]
async fn orders_under_one_unit_earn_nothing() {
    let api = setup().await;
    let order = checkout(&api, vec![physical_item("Sticker", 99, 1)]).await;
    open_payment(&api, &order, "np_2003").await;
    let body = notification("np_2003", "finished");
    api.apply_notification(&body, &sign(&body)).await.unwrap();

    let user = api.db().fetch_user(order.user_id).await.unwrap().unwrap();
    assert_eq!(user.loyalty_points, 0);
    tear_down(api).await;
}

#[tokio::test]
async fn a_direct_double_award_is_a_no_op() {
    let api = setup().await;
    let order = checkout(&api, vec![physical_item("Hoodie", 5000, 1)]).await;
    open_payment(&api, &order, "np_2004").await;
    let body = notification("np_2004", "finished");
    api.apply_notification(&body, &sign(&body)).await.unwrap();

    let order = api.db().fetch_order_by_number(&order.order_number).await.unwrap().unwrap();
    let second = api.db().award_loyalty_points(&order).await.unwrap();
    assert!(second.is_none(), "the ledger entry already exists, so no second award");
    let user = api.db().fetch_user(order.user_id).await.unwrap().unwrap();
    assert_eq!(user.loyalty_points, 50);
    tear_down(api).await;
}

#[tokio::test]
async fn the_earned_entry_references_the_order() {
    let api = setup().await;
    let order = checkout(&api, vec![physical_item("Hoodie", 5000, 1)]).await;
    open_payment(&api, &order, "np_2005").await;
    let body = notification("np_2005", "finished");
    api.apply_notification(&body, &sign(&body)).await.unwrap();

    let entries: Vec<LoyaltyTransaction> =
        sqlx::query_as("SELECT * FROM loyalty_transactions WHERE order_id = $1")
            .bind(order.id)
            .fetch_all(api.db().pool())
            .await
            .unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.kind, LOYALTY_KIND_EARNED);
    assert_eq!(entry.points, 50);
    assert_eq!(entry.reference.as_deref(), Some(order.order_number.as_str()));
    assert!(entry.description.contains(order.order_number.as_str()));
    tear_down(api).await;
}

#[tokio::test]
async fn a_replayed_completion_repairs_a_missed_loyalty_award() {
    let api = setup().await;
    let order = checkout(&api, vec![physical_item("Hoodie", 5000, 1)]).await;
    open_payment(&api, &order, "np_2010").await;
    let body = notification("np_2010", "finished");
    api.apply_notification(&body, &sign(&body)).await.unwrap();

    // Make it look like the award handler died after the payment committed.
    sqlx::query("DELETE FROM loyalty_transactions WHERE order_id = $1")
        .bind(order.id)
        .execute(api.db().pool())
        .await
        .unwrap();
    sqlx::query("UPDATE users SET loyalty_points = 0, total_spent = 0, total_orders = 0 WHERE id = $1")
        .bind(order.user_id)
        .execute(api.db().pool())
        .await
        .unwrap();

    api.apply_notification(&body, &sign(&body)).await.unwrap();

    let user = api.db().fetch_user(order.user_id).await.unwrap().unwrap();
    assert_eq!(user.loyalty_points, 50, "the replay must redo the missing award");
    assert_eq!(user.total_orders, 1);
    let entries: Vec<LoyaltyTransaction> = sqlx::query_as("SELECT * FROM loyalty_transactions WHERE order_id = $1")
        .bind(order.id)
        .fetch_all(api.db().pool())
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].points, 50);
    tear_down(api).await;
}

#[tokio::test]
async fn a_replayed_completion_reissues_a_missing_download_token() {
    let api = setup().await;
    let order = checkout(&api, vec![digital_item("Beat Pack", 3000)]).await;
    open_payment(&api, &order, "np_2011").await;
    let body = notification("np_2011", "finished");
    api.apply_notification(&body, &sign(&body)).await.unwrap();

    // Make it look like the delivery handler died after the payment committed.
    sqlx::query(
        "UPDATE order_items SET download_token = NULL, download_expires_at = NULL, downloads_remaining = NULL \
         WHERE order_id = $1",
    )
    .bind(order.id)
    .execute(api.db().pool())
    .await
    .unwrap();

    api.apply_notification(&body, &sign(&body)).await.unwrap();

    let items = api.db().fetch_order_items(order.id).await.unwrap();
    assert!(items[0].download_token.is_some(), "the replay must reissue the missing token");
    assert_eq!(items[0].downloads_remaining, Some(5));
    tear_down(api).await;
}

#[tokio::test]
async fn digital_items_get_download_tokens_with_default_policy() {
    let api = setup().await;
    let order = checkout(&api, vec![digital_item("Beat Pack", 3000)]).await;
    open_payment(&api, &order, "np_2006").await;
    let body = notification("np_2006", "finished");
    let before = Utc::now();
    api.apply_notification(&body, &sign(&body)).await.unwrap();

    let items = api.db().fetch_order_items(order.id).await.unwrap();
    assert_eq!(items.len(), 1);
    let item = &items[0];
    let token = item.download_token.as_deref().expect("a digital item must receive a token");
    assert_eq!(token.len(), 64);
    assert_eq!(item.downloads_remaining, Some(5));
    let expires = item.download_expires_at.expect("a token must carry an expiry");
    assert!(expires >= before + Duration::days(29));
    assert!(expires <= Utc::now() + Duration::days(31));
    tear_down(api).await;
}

#[tokio::test]
async fn replays_never_regenerate_tokens() {
    let api = setup().await;
    let order = checkout(&api, vec![digital_item("Sample Pack", 2000)]).await;
    open_payment(&api, &order, "np_2007").await;
    let body = notification("np_2007", "finished");
    api.apply_notification(&body, &sign(&body)).await.unwrap();

    let first = api.db().fetch_order_items(order.id).await.unwrap()[0].clone();
    api.apply_notification(&body, &sign(&body)).await.unwrap();
    let second = api.db().fetch_order_items(order.id).await.unwrap()[0].clone();

    assert_eq!(first.download_token, second.download_token);
    assert_eq!(first.download_expires_at, second.download_expires_at);
    assert_eq!(first.downloads_remaining, second.downloads_remaining);
    tear_down(api).await;
}

#[tokio::test]
async fn physical_items_are_never_touched_by_delivery() {
    let api = setup().await;
    let order = checkout(&api, vec![physical_item("Hoodie", 5000, 1), digital_item("Beat Pack", 3000)]).await;
    open_payment(&api, &order, "np_2008").await;
    let body = notification("np_2008", "finished");
    api.apply_notification(&body, &sign(&body)).await.unwrap();

    let items = api.db().fetch_order_items(order.id).await.unwrap();
    let physical = items.iter().find(|i| i.product_kind == ProductKind::Physical).unwrap();
    let digital = items.iter().find(|i| i.product_kind == ProductKind::Digital).unwrap();
    assert!(physical.download_token.is_none());
    assert!(physical.downloads_remaining.is_none());
    assert!(digital.download_token.is_some());
    tear_down(api).await;
}

#[tokio::test]
async fn per_item_delivery_overrides_are_honored() {
    let api = setup().await;
    let mut item = digital_item("Master WAV", 8000);
    item.download_expiry_days = Some(7);
    item.download_limit = Some(2);
    let order = checkout(&api, vec![item]).await;
    open_payment(&api, &order, "np_2009").await;
    let body = notification("np_2009", "finished");
    api.apply_notification(&body, &sign(&body)).await.unwrap();

    let items = api.db().fetch_order_items(order.id).await.unwrap();
    assert_eq!(items[0].downloads_remaining, Some(2));
    let expires = items[0].download_expires_at.unwrap();
    assert!(expires <= Utc::now() + Duration::days(8));
    tear_down(api).await;
}
