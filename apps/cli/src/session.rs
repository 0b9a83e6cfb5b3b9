// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A host thread plus the bridge that feeds it.
//!
//! The in-memory host is moved onto a dedicated thread that sleeps until the
//! bridge raises its wake signal, mirroring how a desktop host schedules an
//! external event on its API thread.

use anyhow::{anyhow, bail, Context, Result};
use bimjson_host::memory::InMemoryHost;
use bimjson_host::{HostExecutor, ImportOptions};
use bimjson_messaging::{Dispatcher, Request, RequestBody, Response};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

enum Signal {
    Wake,
    Stop,
}

pub struct HostSession {
    dispatcher: Arc<Dispatcher>,
    signals: mpsc::Sender<Signal>,
    handle: JoinHandle<InMemoryHost>,
    timeout: Duration,
}

impl HostSession {
    pub fn start(mut host: InMemoryHost, options: ImportOptions, timeout: Duration) -> Result<Self> {
        let (signals, receiver) = mpsc::channel();
        let wake = Mutex::new(signals.clone());
        let dispatcher = Arc::new(Dispatcher::with_wake_signal(Arc::new(move || {
            if let Ok(sender) = wake.lock() {
                let _ = sender.send(Signal::Wake);
            }
        })));

        let executor = HostExecutor::with_options(dispatcher.clone(), options);
        let handle = thread::Builder::new()
            .name("host-api".to_string())
            .spawn(move || {
                while let Ok(Signal::Wake) = receiver.recv() {
                    executor.on_activation(&mut host);
                }
                tracing::debug!("Host thread stopping");
                host
            })
            .context("Failed to spawn host thread")?;

        Ok(Self {
            dispatcher,
            signals,
            handle,
            timeout,
        })
    }

    /// Submit a request and wait for the host's answer
    pub async fn request(&self, body: RequestBody) -> Result<Response> {
        let kind = body.kind().to_string();
        let pending = self.dispatcher.submit(Request::new(body))?;
        let correlation_id = pending.correlation_id();
        tracing::debug!(%correlation_id, kind = %kind, "Request submitted");

        match tokio::time::timeout(self.timeout, pending).await {
            Ok(response) => Ok(response?),
            Err(_) => bail!(
                "No response to {} within {}s",
                kind,
                self.timeout.as_secs()
            ),
        }
    }

    /// Stop the host thread and hand the application back
    pub fn stop(self) -> Result<InMemoryHost> {
        self.dispatcher.shutdown();
        self.signals
            .send(Signal::Stop)
            .map_err(|_| anyhow!("Host thread already exited"))?;
        self.handle
            .join()
            .map_err(|_| anyhow!("Host thread panicked"))
    }
}
