// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission API listener (spec.md §6): accepts connections on the state
//! directory's Unix socket and dispatches each framed request against the
//! store, mirroring the teacher's `listener/mod.rs` accept-loop-per-
//! connection shape.

use std::sync::Arc;

use batchflow_core::{IdGen, UuidIdGen};
use batchflow_engine::{dag, TaskInputs};
use batchflow_store::Store;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{error, info, warn};

use crate::protocol::{Request, Response};

const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

pub async fn run(listener: UnixListener, store: Arc<Store>) {
    loop {
        let (stream, _addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "accept failed");
                continue;
            }
        };
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, store).await {
                warn!(error = %e, "connection ended with error");
            }
        });
    }
}

async fn handle_connection(mut stream: UnixStream, store: Arc<Store>) -> std::io::Result<()> {
    loop {
        let req = match read_request(&mut stream).await {
            Ok(Some(req)) => req,
            Ok(None) => return Ok(()),
            Err(e) => {
                let resp = Response::Error { message: e.to_string() };
                write_response(&mut stream, &resp).await?;
                return Ok(());
            }
        };
        let resp = dispatch(&store, req);
        write_response(&mut stream, &resp).await?;
    }
}

async fn read_request(stream: &mut UnixStream) -> std::io::Result<Option<Request>> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "request too large"));
    }
    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).await?;
    let req: Request = serde_json::from_slice(&payload)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(Some(req))
}

async fn write_response(stream: &mut UnixStream, resp: &Response) -> std::io::Result<()> {
    let payload = serde_json::to_vec(resp)?;
    stream.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    stream.write_all(&payload).await?;
    Ok(())
}

fn dispatch(store: &Store, req: Request) -> Response {
    match req {
        Request::Submit { group } => submit(store, group),
        Request::ListTasks => Response::Tasks {
            tasks: store.all_task_ids().into_iter().filter_map(|id| store.get_task(&id)).collect(),
        },
        Request::DescribeTask { task_id } => match store.get_task(&task_id) {
            Some(task) => Response::Task { task },
            None => not_found(&task_id.to_string()),
        },
        Request::CancelTask { task_id } => match store.set_task_external_state(&task_id, batchflow_core::ExternalState::Kill) {
            Ok(_) => Response::Ack,
            Err(e) => Response::Error { message: e.to_string() },
        },
        Request::RetryTask { task_id } => match store.set_task_external_state(&task_id, batchflow_core::ExternalState::Retry) {
            Ok(_) => Response::Ack,
            Err(e) => Response::Error { message: e.to_string() },
        },
        Request::ListDatasets => Response::Datasets {
            datasets: store.glob_datasets("*").into_iter().filter_map(|id| store.get_dataset(&id)).collect(),
        },
        Request::DescribeDataset { dataset_id } => match store.get_dataset(&dataset_id) {
            Some(dataset) => Response::Dataset { dataset },
            None => not_found(&dataset_id.to_string()),
        },
    }
}

fn submit(store: &Store, group: Vec<TaskInputs>) -> Response {
    let ids = UuidIdGen;
    match dag::validate_and_register_group(store, &ids, &group) {
        Ok(task_ids) => {
            info!(count = task_ids.len(), "submitted task group");
            Response::Submitted { task_ids }
        }
        Err(e) => Response::Error { message: e.to_string() },
    }
}

fn not_found(id: &str) -> Response {
    Response::Error { message: format!("not found: {id}") }
}
