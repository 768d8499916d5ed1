//! Query submission and cursor paging.

use std::collections::VecDeque;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::{GraphError, GraphRef, GraphService, ResultCursor, Statement};
use crate::graphson;

struct Paging {
    cursor: Box<dyn ResultCursor>,
    pending: VecDeque<Value>,
    batches: usize,
    items: usize,
}

/// Turn a cursor into a lazy stream of typed items.
///
/// Batches are fetched only when the previous one is used up, and items come
/// out in batch order. The stream owns the cursor, so it cannot be replayed.
/// The first error ends the stream.
pub fn into_stream<T>(cursor: Box<dyn ResultCursor>) -> BoxStream<'static, Result<T, GraphError>>
where
    T: DeserializeOwned + Send + 'static,
{
    let paging = Paging {
        cursor,
        pending: VecDeque::new(),
        batches: 0,
        items: 0,
    };

    stream::try_unfold(paging, advance::<T>).boxed()
}

async fn advance<T: DeserializeOwned>(
    mut paging: Paging,
) -> Result<Option<(T, Paging)>, GraphError> {
    loop {
        if let Some(raw) = paging.pending.pop_front() {
            let item = serde_json::from_value(graphson::normalize(raw))?;
            paging.items += 1;
            return Ok(Some((item, paging)));
        }
        if !paging.cursor.has_more_results() {
            tracing::debug!(
                batches = paging.batches,
                items = paging.items,
                request_charge = paging.cursor.request_charge(),
                "Query drained"
            );
            return Ok(None);
        }
        let batch = paging.cursor.next_batch().await?;
        paging.batches += 1;
        tracing::debug!(batch = paging.batches, size = batch.len(), "Fetched batch");
        paging.pending.extend(batch);
    }
}

/// Runs statements against one graph container.
#[derive(Clone, Copy)]
pub struct QueryRunner<'a> {
    service: &'a dyn GraphService,
    graph: &'a GraphRef,
}

impl<'a> QueryRunner<'a> {
    pub fn new(service: &'a dyn GraphService, graph: &'a GraphRef) -> Self {
        Self { service, graph }
    }

    pub fn graph(&self) -> &GraphRef {
        self.graph
    }

    /// Submit `statement` and stream its results.
    pub async fn stream<T>(
        &self,
        statement: &Statement,
    ) -> Result<BoxStream<'static, Result<T, GraphError>>, GraphError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let cursor = self.service.submit(self.graph, statement).await?;
        Ok(into_stream(cursor))
    }

    /// Execute a mutation, paging through and discarding whatever it returns.
    pub async fn run(&self, statement: &Statement) -> Result<(), GraphError> {
        let discarded = self
            .stream::<Value>(statement)
            .await?
            .try_fold(0usize, |n, _| async move { Ok(n + 1) })
            .await?;
        tracing::debug!(gremlin = statement.text(), discarded, "Statement applied");
        Ok(())
    }

    /// Execute a read and collect every result in cursor order.
    pub async fn collect<T>(&self, statement: &Statement) -> Result<Vec<T>, GraphError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.stream(statement).await?.try_collect().await
    }
}
