// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{sync::Arc, time::Duration};

use futures_util::{stream::FuturesUnordered, StreamExt as _};
use log::debug;
use tokio::{
    select,
    sync::oneshot,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    client::StatusSource,
    error::{self, Result},
    model::CaptureStatus,
};

/// What to do when a tick comes due while an earlier fetch is still running.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum Overlap {
    /// Skip the tick. At most one fetch is ever in flight.
    #[default]
    SingleFlight,
    /// Fetch anyway. Results may then arrive out of order.
    Allow,
}

/// Keeps fetching status on a fixed interval and hands each result to the
/// subscriber until stopped.
///
/// All callbacks run on the polling task, one at a time. A failed fetch is
/// reported and polling carries on.
pub(crate) struct PollingController {
    stop_tx: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl PollingController {
    /// Starts polling right away; the first fetch is issued immediately.
    pub(crate) fn start<S, U, E>(
        source: Arc<S>,
        interval: Duration,
        overlap: Overlap,
        mut on_update: U,
        mut on_error: E,
    ) -> Self
    where
        S: StatusSource + ?Sized + 'static,
        U: FnMut(CaptureStatus) + Send + 'static,
        E: FnMut(error::Error) + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let worker = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut in_flight = FuturesUnordered::new();

            loop {
                select! {
                    biased;

                    _ = &mut stop_rx => break,
                    Some(result) = in_flight.next(), if !in_flight.is_empty() => match result {
                        Ok(status) => on_update(status),
                        Err(e) => {
                            debug!("Status fetch failed: {}", e);
                            on_error(e);
                        }
                    },
                    _ = ticker.tick() => {
                        if overlap == Overlap::SingleFlight && !in_flight.is_empty() {
                            debug!("Previous status fetch is still running; skipping this tick");
                            continue;
                        }

                        let source = Arc::clone(&source);
                        in_flight.push(async move { source.fetch_status().await });
                    }
                }
            }

            debug!("Polling stopped with {} fetches abandoned", in_flight.len());
        });

        Self {
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        }
    }

    /// Stops polling. Once this returns no callback will run again.
    pub(crate) async fn stop(mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The worker only goes away on its own if a callback panicked,
            // which joining below reports.
            let _ = stop_tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            worker.await?;
        }
        Ok(())
    }
}

impl Drop for PollingController {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
