//! Where pages come from.

use std::future::Future;

use shelfscan_domain::{
    ApiEnvelope, CatalogItem, ImageResult, IrTask, Page, PageRequest, ResultWindow,
};
use uuid::Uuid;

use crate::api::ShelfApi;

/// Fetches one page of a collection.
///
/// Implemented for any `Fn(PageRequest) -> impl Future<Output = ApiEnvelope<Page<T>>>`,
/// so a closure over a `ShelfApi` is a page source.
pub trait PageSource<T>: Send + Sync {
    /// Fetches the page described by `request`.
    fn fetch_page(&self, request: PageRequest) -> impl Future<Output = ApiEnvelope<Page<T>>> + Send;
}

impl<T, F, Fut> PageSource<T> for F
where
    F: Fn(PageRequest) -> Fut + Send + Sync,
    Fut: Future<Output = ApiEnvelope<Page<T>>> + Send,
{
    fn fetch_page(&self, request: PageRequest) -> impl Future<Output = ApiEnvelope<Page<T>>> + Send {
        self(request)
    }
}

/// Catalog items from `api`.
pub fn catalog_pages(api: ShelfApi) -> impl PageSource<CatalogItem> {
    move |request: PageRequest| {
        let api = api.clone();
        async move { api.fetch_catalog_page(request).await }
    }
}

/// Image-recognition tasks from `api`.
pub fn task_pages(api: ShelfApi) -> impl PageSource<IrTask> {
    move |request: PageRequest| {
        let api = api.clone();
        async move { api.fetch_task_page(request).await }
    }
}

/// Results of `task` within `window` from `api`.
pub fn result_pages(api: ShelfApi, task: Uuid, window: ResultWindow) -> impl PageSource<ImageResult> {
    move |request: PageRequest| {
        let api = api.clone();
        async move { api.fetch_task_results(task, request, window).await }
    }
}
