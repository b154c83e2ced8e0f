//! Waiting on vCenter tasks

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;
use vc_shared_types::{MoRef, TaskError, TaskRef, TaskState};

use crate::client::VSphereClient;
use crate::error::VCenterError;
use crate::Result;

pub const DEFAULT_TASK_POLL_INTERVAL: Duration = Duration::from_secs(2);

const UNKNOWN_TASK_FAILURE: &str = "Task failed with some error";

/// Polls a submitted task until it reaches a terminal state.
///
/// Many waiters may run at once, one per in-flight mutating call. When a
/// cancellation token is attached, a cancelled token makes the waiter ask
/// vCenter to cancel the task (if it is cancelable) and keep waiting for the
/// terminal state.
#[derive(Clone)]
pub struct TaskWaiter {
    client: Arc<dyn VSphereClient>,
    poll_interval: Duration,
    cancellation: Option<CancellationToken>,
}

impl TaskWaiter {
    pub fn new(client: Arc<dyn VSphereClient>) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_TASK_POLL_INTERVAL,
            cancellation: None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait for `task` and return its result object, if it produced one
    pub async fn wait_for_task(&self, task: &TaskRef, operation: &str) -> Result<Option<MoRef>> {
        let mut cancel_requested = false;

        loop {
            let task_info = self
                .client
                .task_info(task)
                .await
                .map_err(|e| VCenterError::remote(format!("{} (task {})", operation, task), e))?;

            match task_info.state {
                TaskState::Success => {
                    debug!("Task {} for '{}' succeeded", task, operation);
                    return Ok(task_info.result);
                }
                TaskState::Error => {
                    let message = task_fault_message(task_info.error.as_ref());
                    warn!("Task {} for '{}' failed: {}", task, operation, message);
                    return Err(VCenterError::TaskFault {
                        operation: operation.to_string(),
                        message,
                    });
                }
                TaskState::Queued | TaskState::Running => {
                    if !cancel_requested && self.cancellation_requested() {
                        if task_info.cancelable && !task_info.cancelled {
                            info!("Cancelling task {} for '{}'", task, operation);
                            self.client.cancel_task(task).await.map_err(|e| {
                                VCenterError::remote(format!("cancel {}", operation), e)
                            })?;
                        }
                        cancel_requested = true;
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    fn cancellation_requested(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(|token| token.is_cancelled())
            .unwrap_or(false)
    }
}

/// Fault messages joined with "; ", else the task message, else a generic text
pub fn task_fault_message(error: Option<&TaskError>) -> String {
    let Some(error) = error else {
        return UNKNOWN_TASK_FAILURE.to_string();
    };

    let faults: Vec<&str> = error
        .fault_messages
        .iter()
        .map(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .collect();
    if !faults.is_empty() {
        return faults.join("; ");
    }

    match error.msg.as_deref() {
        Some(msg) if !msg.is_empty() => msg.to_string(),
        _ => UNKNOWN_TASK_FAILURE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use vc_shared_types::TaskInfo;

    use super::*;
    use crate::client::MockVSphereClient;

    fn task_info(state: TaskState) -> TaskInfo {
        TaskInfo {
            key: MoRef::new("task-1"),
            description: "AddDVPortgroup_Task".to_string(),
            state,
            result: None,
            error: None,
            cancelable: true,
            cancelled: false,
            queue_time: Utc::now(),
            complete_time: None,
        }
    }

    fn waiter(client: MockVSphereClient) -> TaskWaiter {
        TaskWaiter::new(Arc::new(client)).with_poll_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn polls_until_success_and_returns_result() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let mut client = MockVSphereClient::new();
        client.expect_task_info().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let mut info = task_info(match n {
                0 => TaskState::Queued,
                1 | 2 => TaskState::Running,
                _ => TaskState::Success,
            });
            if info.state == TaskState::Success {
                info.result = Some(MoRef::new("dvportgroup-7"));
            }
            Ok(info)
        });

        let result = waiter(client)
            .wait_for_task(&MoRef::new("task-1"), "create port group")
            .await
            .unwrap();
        assert_eq!(result, Some(MoRef::new("dvportgroup-7")));
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn task_error_becomes_fault_with_joined_messages() {
        let mut client = MockVSphereClient::new();
        client.expect_task_info().returning(|_| {
            let mut info = task_info(TaskState::Error);
            info.error = Some(TaskError {
                msg: Some("ignored".to_string()),
                fault_messages: vec!["first".to_string(), "second".to_string()],
            });
            Ok(info)
        });

        let err = waiter(client)
            .wait_for_task(&MoRef::new("task-1"), "reconfigure vm")
            .await
            .unwrap_err();
        match err {
            VCenterError::TaskFault { operation, message } => {
                assert_eq!(operation, "reconfigure vm");
                assert_eq!(message, "first; second");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn fault_message_fallbacks() {
        assert_eq!(task_fault_message(None), UNKNOWN_TASK_FAILURE);
        let only_msg = TaskError {
            msg: Some("disk full".to_string()),
            fault_messages: vec![],
        };
        assert_eq!(task_fault_message(Some(&only_msg)), "disk full");
        assert_eq!(
            task_fault_message(Some(&TaskError::default())),
            UNKNOWN_TASK_FAILURE
        );
    }

    #[tokio::test]
    async fn cancellation_requests_cancel_once() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let mut client = MockVSphereClient::new();
        client.expect_task_info().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 3 {
                Ok(task_info(TaskState::Running))
            } else {
                let mut info = task_info(TaskState::Error);
                info.cancelled = true;
                info.error = Some(TaskError {
                    msg: Some("The task was canceled by a user.".to_string()),
                    fault_messages: vec![],
                });
                Ok(info)
            }
        });
        client.expect_cancel_task().times(1).returning(|_| Ok(()));

        let token = CancellationToken::new();
        token.cancel();
        let err = waiter(client)
            .with_cancellation(token)
            .wait_for_task(&MoRef::new("task-1"), "reconfigure vm")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("canceled"));
    }

    #[tokio::test]
    async fn non_cancelable_task_is_left_alone() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let mut client = MockVSphereClient::new();
        client.expect_task_info().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let mut info = task_info(if n < 2 {
                TaskState::Running
            } else {
                TaskState::Success
            });
            info.cancelable = false;
            Ok(info)
        });
        client.expect_cancel_task().never();

        let token = CancellationToken::new();
        token.cancel();
        let result = waiter(client)
            .with_cancellation(token)
            .wait_for_task(&MoRef::new("task-1"), "destroy")
            .await
            .unwrap();
        assert_eq!(result, None);
    }
}
