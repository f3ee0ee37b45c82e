use async_graphql::{EmptyMutation, EmptySubscription, Object};

/// A schema whose single field never resolves, for timeout tests.
pub type PendingSchema = async_graphql::Schema<PendingQuery, EmptyMutation, EmptySubscription>;

pub fn pending_schema() -> PendingSchema {
    async_graphql::Schema::new(PendingQuery, EmptyMutation, EmptySubscription)
}

pub struct PendingQuery;

#[Object]
impl PendingQuery {
    async fn pending(&self) -> String {
        std::future::pending().await
    }
}
