use mockall::mock;
use voucher_payment_engine::{
    db_types::IntentDetails,
    traits::{GatewayError, IntentRequest, PaymentGateway, RemoteStatusReport, StatusQuery},
};

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_intent(&self, request: IntentRequest) -> Result<IntentDetails, GatewayError>;
        async fn check_status(&self, query: StatusQuery) -> Result<RemoteStatusReport, GatewayError>;
    }
}
