// SPDX-License-Identifier: LGPL-3.0-only
//! XDG Desktop Portal integration for inhibiting app suspension.
//!
//! The [PortalBus] trait is the seam between the inhibition state machine and
//! the session bus. `SessionPortal` implements it with `zbus`. Calls go
//! through a [CallQueue], so they reach the bus in the order they were made
//! while the caller never waits for a reply.

use std::future::Future;

use bitflags::bitflags;
use smol::channel::Sender;

use crate::error::PowerSaveError;
use crate::tasks;

/// Well-known bus name of the portal.
pub const PORTAL_SERVICE: &str = "org.freedesktop.portal.Desktop";
/// Object path of the portal.
pub const PORTAL_OBJECT_PATH: &str = "/org/freedesktop/portal/desktop";
/// Interface carrying the `Inhibit` method.
pub const INHIBIT_INTERFACE: &str = "org.freedesktop.portal.Inhibit";
/// Interface of request objects, carrying `Close`.
pub const REQUEST_INTERFACE: &str = "org.freedesktop.portal.Request";
/// Namespace under which the portal publishes request objects.
pub const REQUEST_PATH_PREFIX: &str = "/org/freedesktop/portal/desktop/request/";

bitflags! {
    /// What an `Inhibit` call blocks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InhibitFlags: u32 {
        /// Logging out.
        const LOGOUT = 1;
        /// Switching users.
        const USER_SWITCH = 2;
        /// Suspending the session.
        const SUSPEND = 4;
        /// Marking the session idle.
        const IDLE = 8;
    }
}

/// Derive the object path the portal will use for a request.
///
/// The sender is the connection's unique name without the leading `:` and
/// with its first `.` replaced by `_`, so `:1.23` and token `T` give
/// `/org/freedesktop/portal/desktop/request/1_23/T`.
pub fn request_path(unique_name: &str, handle_token: &str) -> String {
    let sender = unique_name.strip_prefix(':').unwrap_or(unique_name);
    let sender = sender.replacen('.', "_", 1);
    format!("{REQUEST_PATH_PREFIX}{sender}/{handle_token}")
}

/// The calls the inhibitor needs from the session bus.
///
/// `inhibit` and `close` only have to *issue* the call; an `Err` means the call
/// could not be sent at all.
pub trait PortalBus: Send {
    /// The unique name of the connection the calls are sent from, e.g. `:1.23`.
    fn unique_name(&mut self) -> Result<String, PowerSaveError>;

    /// Issue `org.freedesktop.portal.Inhibit.Inhibit`.
    fn inhibit(
        &mut self,
        parent_window: &str,
        flags: InhibitFlags,
        handle_token: &str,
        reason: &str,
    ) -> Result<(), PowerSaveError>;

    /// Issue `org.freedesktop.portal.Request.Close` on `request_path`.
    fn close(&mut self, request_path: &str) -> Result<(), PowerSaveError>;
}

/// A portal method call waiting to be issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalCall {
    /// `org.freedesktop.portal.Inhibit.Inhibit`.
    Inhibit {
        /// Parent window identifier, e.g. `x11:1c00007`.
        parent_window: String,
        /// What to inhibit.
        flags: InhibitFlags,
        /// The token the request path is derived from.
        handle_token: String,
        /// Human readable reason.
        reason: String,
    },
    /// `org.freedesktop.portal.Request.Close`.
    Close {
        /// Path of the request object to close.
        request_path: String,
    },
}

impl PortalCall {
    /// The D-Bus member name of the call.
    pub fn method(&self) -> &'static str {
        match self {
            PortalCall::Inhibit { .. } => "Inhibit",
            PortalCall::Close { .. } => "Close",
        }
    }
}

/// Issues queued calls one at a time from a single detached task.
///
/// A call is only issued once the one before it has been answered, so the
/// bus never sees a `Close` ahead of the `Inhibit` it belongs to.
pub struct CallQueue {
    sender: Sender<PortalCall>,
}

impl CallQueue {
    /// Start the task draining the queue into `issue`.
    ///
    /// The task ends once the queue is dropped and every pending call is issued.
    pub fn new<F, Fut>(mut issue: F) -> Self
    where
        F: FnMut(PortalCall) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, receiver) = smol::channel::unbounded::<PortalCall>();
        tasks::spawn(async move {
            while let Ok(call) = receiver.recv().await {
                issue(call).await;
            }
        });
        Self { sender }
    }

    /// Queue `call` behind every call queued before it.
    pub fn push(&self, call: PortalCall) -> Result<(), PowerSaveError> {
        self.sender
            .try_send(call)
            .map_err(|err| PowerSaveError::Call(format!("Portal call queue is closed: {err}")))
    }
}

#[cfg(all(target_os = "linux", feature = "xdg-portal"))]
pub use session_portal::SessionPortal;

#[cfg(all(target_os = "linux", feature = "xdg-portal"))]
mod session_portal {
    use std::collections::HashMap;

    use zbus::Connection;
    use zvariant::{ObjectPath, Value};

    use super::*;

    /// [PortalBus] over the session bus.
    ///
    /// The connection is opened on first use and kept, so the unique name used
    /// for the request path always belongs to the connection sending the call.
    #[derive(Default)]
    pub struct SessionPortal {
        connection: Option<Connection>,
        queue: Option<CallQueue>,
    }

    impl SessionPortal {
        /// Create a portal client. No connection is made until the first call.
        pub fn new() -> Self {
            Self::default()
        }

        fn connection(&mut self) -> Result<Connection, PowerSaveError> {
            if let Some(connection) = &self.connection {
                return Ok(connection.clone());
            }

            let connection = zbus::block_on(Connection::session())?;
            log::debug!(
                "Connected to session bus as {:?}",
                connection.unique_name().map(|name| name.as_str())
            );
            self.connection = Some(connection.clone());
            Ok(connection)
        }

        fn queue(&mut self) -> Result<&CallQueue, PowerSaveError> {
            let connection = self.connection()?;
            Ok(self
                .queue
                .get_or_insert_with(|| CallQueue::new(move |call| issue_call(connection.clone(), call))))
        }
    }

    async fn issue_call(connection: Connection, call: PortalCall) {
        let result = match &call {
            PortalCall::Inhibit {
                parent_window,
                flags,
                handle_token,
                reason,
            } => {
                let mut options: HashMap<&str, Value<'_>> = HashMap::new();
                options.insert("handle_token", Value::from(handle_token.as_str()));
                options.insert("reason", Value::from(reason.as_str()));

                connection
                    .call_method(
                        Some(PORTAL_SERVICE),
                        PORTAL_OBJECT_PATH,
                        Some(INHIBIT_INTERFACE),
                        "Inhibit",
                        &(parent_window.as_str(), flags.bits(), options),
                    )
                    .await
            },
            PortalCall::Close { request_path } => {
                connection
                    .call_method(
                        Some(PORTAL_SERVICE),
                        request_path.as_str(),
                        Some(REQUEST_INTERFACE),
                        "Close",
                        &(),
                    )
                    .await
            },
        };

        if let Err(err) = result {
            log::warn!("Portal {} call failed: {}", call.method(), err);
        }
    }

    impl PortalBus for SessionPortal {
        fn unique_name(&mut self) -> Result<String, PowerSaveError> {
            let connection = self.connection()?;
            connection
                .unique_name()
                .map(|name| name.to_string())
                .ok_or_else(|| PowerSaveError::Bus("Session bus connection has no unique name".to_string()))
        }

        fn inhibit(
            &mut self,
            parent_window: &str,
            flags: InhibitFlags,
            handle_token: &str,
            reason: &str,
        ) -> Result<(), PowerSaveError> {
            self.queue()?.push(PortalCall::Inhibit {
                parent_window: parent_window.to_owned(),
                flags,
                handle_token: handle_token.to_owned(),
                reason: reason.to_owned(),
            })
        }

        fn close(&mut self, request_path: &str) -> Result<(), PowerSaveError> {
            ObjectPath::try_from(request_path)
                .map_err(|e| PowerSaveError::Call(format!("Invalid request path {request_path}: {e}")))?;

            self.queue()?.push(PortalCall::Close {
                request_path: request_path.to_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_request_path_from_unique_name() {
        assert_eq!(
            request_path(":1.23", "T"),
            "/org/freedesktop/portal/desktop/request/1_23/T"
        );
    }

    #[test]
    fn test_request_path_only_replaces_first_dot() {
        assert_eq!(
            request_path(":1.2.3", "desktop_app42"),
            "/org/freedesktop/portal/desktop/request/1_2.3/desktop_app42"
        );
    }

    #[test]
    fn test_request_path_without_dot() {
        assert_eq!(
            request_path(":42", "tok"),
            "/org/freedesktop/portal/desktop/request/42/tok"
        );
    }

    #[test]
    fn test_suspend_flag_value() {
        assert_eq!(InhibitFlags::SUSPEND.bits(), 4);
    }

    #[tokio::test]
    async fn test_queued_calls_are_issued_in_order() {
        let (issued_tx, issued_rx) = smol::channel::unbounded();
        let queue = CallQueue::new(move |call| {
            let issued_tx = issued_tx.clone();
            async move {
                // Inhibit is slower to answer than the Close queued right behind it
                if matches!(call, PortalCall::Inhibit { .. }) {
                    smol::Timer::after(Duration::from_millis(2)).await;
                }
                let _ = issued_tx.send(call).await;
            }
        });

        let mut expected = Vec::new();
        for i in 0..20 {
            let handle_token = format!("desktop_app{i}");
            expected.push(PortalCall::Inhibit {
                parent_window: String::new(),
                flags: InhibitFlags::SUSPEND,
                reason: "call".to_string(),
                handle_token: handle_token.clone(),
            });
            expected.push(PortalCall::Close {
                request_path: request_path(":1.23", &handle_token),
            });
        }
        for call in &expected {
            queue.push(call.clone()).unwrap();
        }

        let mut issued = Vec::new();
        for _ in 0..expected.len() {
            issued.push(issued_rx.recv().await.unwrap());
        }
        assert_eq!(issued, expected);
    }

    #[tokio::test]
    async fn test_dropped_queue_still_issues_pending_calls() {
        let (issued_tx, issued_rx) = smol::channel::unbounded();
        let queue = CallQueue::new(move |call| {
            let issued_tx = issued_tx.clone();
            async move {
                let _ = issued_tx.send(call).await;
            }
        });

        let close = PortalCall::Close {
            request_path: request_path(":1.23", "desktop_app1"),
        };
        queue.push(close.clone()).unwrap();
        drop(queue);

        assert_eq!(issued_rx.recv().await.unwrap(), close);
        assert!(issued_rx.recv().await.is_err());
    }
}
