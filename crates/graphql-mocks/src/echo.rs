use async_graphql::{Context, EmptyMutation, EmptySubscription, InputObject, Json, Object, ID};

use crate::RequestHeaders;

/// A schema that echoes stuff back at you.
///
/// Useful for testing inputs & outputs
pub type EchoSchema = async_graphql::Schema<EchoQuery, EmptyMutation, EmptySubscription>;

pub fn echo_schema() -> EchoSchema {
    async_graphql::Schema::new(EchoQuery, EmptyMutation, EmptySubscription)
}

pub struct EchoQuery;

#[Object]
impl EchoQuery {
    async fn string(&self, input: String) -> String {
        input
    }

    async fn int(&self, input: u32) -> u32 {
        input
    }

    async fn float(&self, input: f32) -> f32 {
        input
    }

    async fn id(&self, input: ID) -> ID {
        input
    }

    async fn list_of_strings(&self, input: Vec<String>) -> Vec<String> {
        input
    }

    async fn input_object(&self, input: InputObj) -> Json<InputObj> {
        Json(input)
    }

    async fn header(&self, ctx: &Context<'_>, name: String) -> Option<String> {
        ctx.data_opt::<RequestHeaders>()?
            .get(&name)
            .map(ToString::to_string)
    }

    /// Every value of the header, in the order the transport carried them.
    async fn headers(&self, ctx: &Context<'_>, name: String) -> Vec<String> {
        ctx.data_opt::<RequestHeaders>()
            .map(|headers| headers.all(&name).into_iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }
}

#[derive(InputObject, serde::Serialize)]
struct InputObj {
    string: Option<String>,
    int: Option<u32>,
    recursive_object: Option<Box<InputObj>>,
}
