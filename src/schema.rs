//! The example schema served by the binary.

use crate::graphql::RequestContext;
use async_graphql::{Context, EmptySubscription, Object, Schema};

/// The example schema.
pub type ExampleSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Builds the example schema.
pub fn build_schema() -> ExampleSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription).finish()
}

/// The query root.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryRoot;

#[Object(name = "QueryRoot")]
impl QueryRoot {
    /// Always fails. Nullable, so only this field is lost.
    async fn thrower(&self) -> async_graphql::Result<Option<String>> {
        Err("Throws!".into())
    }

    /// The context of the request.
    ///
    /// A context given to the view is returned as-is, otherwise the method
    /// and URI of the HTTP request.
    async fn context(&self, ctx: &Context<'_>) -> String {
        if let Some(context) = ctx.data_opt::<String>() {
            return context.clone();
        }
        ctx.data_opt::<RequestContext>()
            .map(|request| format!("{} {}", request.method, request.uri))
            .unwrap_or_default()
    }

    async fn test(&self) -> &'static str {
        "Hello World"
    }

    /// Greets `name`.
    #[graphql(name = "test_args")]
    async fn test_args(&self, name: Option<String>) -> String {
        format!("Hello {}", name.as_deref().unwrap_or("stranger"))
    }

    /// Greets `name`, or the world.
    #[graphql(name = "test_def_args")]
    async fn test_def_args(
        &self,
        #[graphql(default_with = "String::from(\"World\")")] name: String,
    ) -> String {
        format!("Hello {name}")
    }
}

/// The mutation root.
#[derive(Clone, Copy, Debug, Default)]
pub struct MutationRoot;

#[Object(name = "MutationRoot")]
impl MutationRoot {
    /// Hands back the query root.
    async fn write_test(&self) -> QueryRoot {
        QueryRoot
    }
}
