//! Command implementations.

use std::path::PathBuf;

use shelfscan_application::pagination::{catalog_pages, result_pages, task_pages};
use shelfscan_application::{
    ApplicationError, ApplicationResult, LoadOutcome, PageAggregator, PageSource, PollHandle,
    ResultPoller, ShelfApi,
};
use shelfscan_domain::{
    ApiEnvelope, CatalogSummary, CollectionKind, DomainError, ImageResult, Page, PageRequest,
    ResultStatusCounts, ResultWindow, UploadPolicy,
};
use shelfscan_infrastructure::{ClientConfig, load_images};
use tracing::info;
use uuid::Uuid;

use crate::cli::Command;
use crate::render;

/// Runs one command to completion.
pub async fn run(command: Command, api: ShelfApi, config: &ClientConfig) -> ApplicationResult<()> {
    match command {
        Command::Catalog {
            limit,
            pages,
            incomplete,
        } => catalog(api, limit.unwrap_or(config.page_size), pages, incomplete).await,
        Command::Tasks { limit, pages } => tasks(api, limit.unwrap_or(config.page_size), pages).await,
        Command::Submit {
            task,
            files,
            callback,
        } => submit(&api, task, &files, callback.as_deref()).await,
        Command::Results {
            task,
            limit,
            since,
            until,
            watch,
        } => {
            let window = ResultWindow::between(since, until)?;
            let page_size = limit.unwrap_or(config.page_size);
            if watch {
                watch_results(api, task, page_size, window).await
            } else {
                results(api, task, page_size, window).await
            }
        }
        Command::SingleResult {
            task,
            result,
            watch,
        } => single_result(api, task, result, watch).await,
    }
}

/// Loads up to `pages` pages, stopping early once everything is loaded.
async fn load_pages<T, S>(aggregate: &PageAggregator<T, S>, pages: u32) -> ApplicationResult<()>
where
    T: Clone + Send,
    S: PageSource<T>,
{
    for _ in 0..pages {
        match aggregate.load_more().await {
            LoadOutcome::Loaded { .. } => {}
            LoadOutcome::Failed(error) => return Err(error.into()),
            LoadOutcome::Exhausted | LoadOutcome::InFlight | LoadOutcome::Stale => break,
        }
    }
    Ok(())
}

async fn catalog(api: ShelfApi, page_size: u32, pages: u32, incomplete_only: bool) -> ApplicationResult<()> {
    let aggregate = PageAggregator::new(CollectionKind::CatalogItems, page_size, catalog_pages(api))?;
    load_pages(&aggregate, pages).await?;

    let items = aggregate.items();
    for item in items.iter().filter(|item| !incomplete_only || item.is_incomplete()) {
        println!("{}", render::catalog_line(item));
    }
    println!("{}", CatalogSummary::of(&items, aggregate.total()));
    if aggregate.has_more() {
        println!("More items available; pass --pages to load them");
    }
    Ok(())
}

async fn tasks(api: ShelfApi, page_size: u32, pages: u32) -> ApplicationResult<()> {
    let aggregate = PageAggregator::new(CollectionKind::IrTasks, page_size, task_pages(api))?;
    load_pages(&aggregate, pages).await?;

    let tasks = aggregate.items();
    for task in &tasks {
        println!("{}", render::task_line(task));
    }
    println!("Showing {} of {} tasks", tasks.len(), aggregate.total());
    Ok(())
}

async fn submit(
    api: &ShelfApi,
    task: Uuid,
    files: &[PathBuf],
    callback: Option<&str>,
) -> ApplicationResult<()> {
    let batch = load_images(files, &UploadPolicy::default()).await;
    for rejection in batch.rejected() {
        eprintln!("{}", render::rejection_line(rejection));
    }
    if batch.is_empty() {
        return Err(DomainError::InvalidUpload("no file passed the upload checks".to_string()).into());
    }

    info!(%task, files = batch.accepted().len(), "submitting images");
    let created = api
        .submit_images(task, batch.accepted(), callback)
        .await
        .into_result()?;
    for result in &created {
        println!("{result}");
    }
    println!("Submitted {} image(s)", created.len());
    Ok(())
}

async fn results(api: ShelfApi, task: Uuid, page_size: u32, window: ResultWindow) -> ApplicationResult<()> {
    let aggregate = PageAggregator::new(
        CollectionKind::TaskResults(task),
        page_size,
        result_pages(api, task, window),
    )?;
    load_pages(&aggregate, 1).await?;

    for result in aggregate.items() {
        println!("{}", render::result_line(&result));
    }
    println!("{}", render::counts_line(&aggregate.status_counts()));
    Ok(())
}

async fn watch_results(api: ShelfApi, task: Uuid, page_size: u32, window: ResultWindow) -> ApplicationResult<()> {
    let first = PageRequest::first(page_size)?;
    let handle = ResultPoller::new(api).watch_results(task, first, window);
    follow(handle, |page: &Page<ImageResult>| {
        for result in &page.items {
            println!("{}", render::result_line(result));
        }
        println!("{}", render::counts_line(&ResultStatusCounts::of(&page.items)));
    })
    .await
}

async fn single_result(api: ShelfApi, task: Uuid, result: Uuid, watch: bool) -> ApplicationResult<()> {
    let print = |result: &ImageResult| println!("{}", render::result_line(result));
    if watch {
        follow(ResultPoller::new(api).watch_result(task, result), print).await
    } else {
        let result = api.fetch_single_result(task, result).await.into_result()?;
        print(&result);
        Ok(())
    }
}

/// Prints every snapshot of a poll until it ends. A failed fetch ends the
/// poll and is returned as the error.
async fn follow<T: Clone>(mut handle: PollHandle<T>, print: impl Fn(&T)) -> ApplicationResult<()> {
    let mut last: Option<ApiEnvelope<T>> = None;
    while let Some(envelope) = handle.changed().await {
        if let Some(data) = envelope.data() {
            print(data);
            println!();
        }
        last = Some(envelope);
    }
    handle.finished().await?;

    match last {
        Some(envelope) => envelope.into_result().map(|_| ()).map_err(ApplicationError::from),
        None => Err(ApplicationError::Internal("poll ended without a response".to_string())),
    }
}
