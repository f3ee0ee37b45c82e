use async_graphql::{EmptyMutation, Object, Subscription};
use futures::Stream;

/// Greetings for James in several languages, as a query returning them all
/// at once and as a subscription emitting them one by one.
pub type GreetingsSchema =
    async_graphql::Schema<GreetingsQuery, EmptyMutation, GreetingsSubscription>;

pub fn greetings_schema() -> GreetingsSchema {
    async_graphql::Schema::new(GreetingsQuery, EmptyMutation, GreetingsSubscription)
}

const GREETINGS: [&str; 5] = [
    "Hi James",
    "Bonjour James",
    "Hola James",
    "Ciao James",
    "Zdravo James",
];

pub struct GreetingsQuery;

#[Object]
impl GreetingsQuery {
    async fn greeting(&self) -> &'static str {
        "Hello James"
    }

    async fn greetings(&self) -> Vec<&'static str> {
        GREETINGS.to_vec()
    }

    async fn broken(&self) -> async_graphql::Result<String> {
        Err(async_graphql::Error::new("this field always fails"))
    }
}

pub struct GreetingsSubscription;

#[Subscription]
impl GreetingsSubscription {
    async fn greetings(&self) -> impl Stream<Item = &'static str> {
        futures::stream::iter(GREETINGS)
    }
}
