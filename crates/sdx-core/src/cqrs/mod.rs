pub use mediator::DefaultAsyncMediator;

use crate::context::AppContext;

pub mod middleware;

pub type AppMediator = DefaultAsyncMediator;

pub fn build_mediator(ctx: AppContext) -> AppMediator {
    DefaultAsyncMediator::builder()
        // Staging
        .add_handler({
            let ctx = ctx.clone();
            move |cmd| {
                let ctx = ctx.clone();
                async move { crate::features::staging::commands::create_record::handle(ctx, cmd).await }
            }
        })
        .add_handler({
            let ctx = ctx.clone();
            move |cmd| {
                let ctx = ctx.clone();
                async move { crate::features::staging::commands::update_record::handle(ctx, cmd).await }
            }
        })
        .add_handler({
            let ctx = ctx.clone();
            move |cmd| {
                let ctx = ctx.clone();
                async move { crate::features::staging::commands::delete_record::handle(ctx, cmd).await }
            }
        })
        .add_handler({
            let ctx = ctx.clone();
            move |cmd| {
                let ctx = ctx.clone();
                async move { crate::features::staging::commands::process_record::handle(ctx, cmd).await }
            }
        })
        .add_handler({
            let ctx = ctx.clone();
            move |query| {
                let ctx = ctx.clone();
                async move { crate::features::staging::queries::get_record::handle(ctx, query).await }
            }
        })
        .add_handler({
            let ctx = ctx.clone();
            move |query| {
                let ctx = ctx.clone();
                async move { crate::features::staging::queries::list_records::handle(ctx, query).await }
            }
        })
        // Matching
        .add_handler({
            let ctx = ctx.clone();
            move |query| {
                let ctx = ctx.clone();
                async move { crate::features::matching::queries::find_matches::handle(ctx, query).await }
            }
        })
        .add_handler({
            let ctx = ctx.clone();
            move |query| {
                let ctx = ctx.clone();
                async move {
                    crate::features::matching::queries::find_matches_for_json::handle(ctx, query)
                        .await
                }
            }
        })
        // Jobs
        .add_handler({
            let ctx = ctx.clone();
            move |cmd| {
                let ctx = ctx.clone();
                async move { crate::features::jobs::commands::submit_batch::handle(ctx, cmd).await }
            }
        })
        .add_handler({
            let ctx = ctx.clone();
            move |query| {
                let ctx = ctx.clone();
                async move { crate::features::jobs::queries::get_job::handle(ctx, query).await }
            }
        })
        .add_handler({
            let ctx = ctx.clone();
            move |query| {
                let ctx = ctx.clone();
                async move { crate::features::jobs::queries::list_jobs::handle(ctx, query).await }
            }
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::test_context;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mediator_builds() {
        let harness = test_context().await;
        let _mediator = build_mediator(harness.ctx.clone());
    }
}
