use mockall::mock;
use shop_payment_engine::{
    db_types::{
        DeliveryToken,
        LoyaltyTransaction,
        NewOrder,
        NewPayment,
        Order,
        OrderItem,
        OrderNumber,
        Payment,
        PaymentUpdate,
        User,
    },
    traits::{PaymentGatewayDatabase, PaymentGatewayError, ReconciliationOutcome},
};

mock! {
    pub PaymentGateway {}

    impl Clone for PaymentGateway {
        fn clone(&self) -> Self;
    }

    impl PaymentGatewayDatabase for PaymentGateway {
        fn url(&self) -> &str;
        async fn fetch_or_create_user<'a>(&self, telegram_id: &str, username: Option<&'a str>) -> Result<User, PaymentGatewayError>;
        async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, PaymentGatewayError>;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError>;
        async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, PaymentGatewayError>;
        async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, PaymentGatewayError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, PaymentGatewayError>;
        async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentGatewayError>;
        async fn fetch_payment(&self, payment_id: &str) -> Result<Option<Payment>, PaymentGatewayError>;
        async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, PaymentGatewayError>;
        async fn apply_payment_update(&self, update: PaymentUpdate) -> Result<ReconciliationOutcome, PaymentGatewayError>;
        async fn award_loyalty_points(&self, order: &Order) -> Result<Option<LoyaltyTransaction>, PaymentGatewayError>;
        async fn issue_delivery_tokens(&self, order: &Order) -> Result<Vec<DeliveryToken>, PaymentGatewayError>;
    }
}
