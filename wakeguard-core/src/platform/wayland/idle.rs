// SPDX-License-Identifier: LGPL-3.0-only
#![cfg(target_os = "linux")]

//! Idle inhibit support via zwp_idle_inhibit_manager_v1.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use wayland_client::backend::ObjectId;
use wayland_client::globals::{registry_queue_init, BindError, GlobalListContents};
use wayland_client::protocol::wl_registry;
use wayland_client::{Connection, Dispatch, EventQueue, Proxy, QueueHandle};
use wayland_protocols::wp::idle_inhibit::zv1::client::{zwp_idle_inhibit_manager_v1, zwp_idle_inhibitor_v1};

use crate::error::PowerSaveError;
use crate::platform::session::IdleInhibit;
use crate::platform::WindowHandle;

const ZWP_IDLE_INHIBIT_MANAGER_V1_VERSION: u32 = 1;

/// Dispatch state of the idle inhibit queue. Neither interface sends events.
pub struct IdleInhibitState;

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for IdleInhibitState {
    fn event(
        _state: &mut Self,
        _registry: &wl_registry::WlRegistry,
        _event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // Globals appearing later are not of interest
    }
}

impl Dispatch<zwp_idle_inhibit_manager_v1::ZwpIdleInhibitManagerV1, ()> for IdleInhibitState {
    fn event(
        _state: &mut Self,
        _manager: &zwp_idle_inhibit_manager_v1::ZwpIdleInhibitManagerV1,
        _event: zwp_idle_inhibit_manager_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // No events for manager
    }
}

impl Dispatch<zwp_idle_inhibitor_v1::ZwpIdleInhibitorV1, ()> for IdleInhibitState {
    fn event(
        _state: &mut Self,
        _inhibitor: &zwp_idle_inhibitor_v1::ZwpIdleInhibitorV1,
        _event: zwp_idle_inhibitor_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // No events for inhibitors
    }
}

/// Blocks display sleep per `wl_surface` through the compositor.
///
/// One `zwp_idle_inhibitor_v1` is kept per surface; the compositor honours it
/// while the surface is visible.
pub struct WaylandIdleInhibitor {
    connection: Connection,
    queue_handle: QueueHandle<IdleInhibitState>,
    manager: zwp_idle_inhibit_manager_v1::ZwpIdleInhibitManagerV1,
    inhibitors: Mutex<HashMap<ObjectId, zwp_idle_inhibitor_v1::ZwpIdleInhibitorV1>>,
    _queue: Mutex<EventQueue<IdleInhibitState>>,
}

impl WaylandIdleInhibitor {
    /// Bind the idle inhibit manager on `connection`.
    ///
    /// `connection` must be the one the application's surfaces live on. Fails
    /// with [PowerSaveError::Wayland] if the compositor does not offer the protocol.
    pub fn new(connection: &Connection) -> Result<Self, PowerSaveError> {
        let (globals, queue) = registry_queue_init::<IdleInhibitState>(connection)
            .map_err(|e| PowerSaveError::Wayland(format!("Failed to read Wayland globals: {e}")))?;
        let queue_handle = queue.handle();

        let manager = match globals.bind::<zwp_idle_inhibit_manager_v1::ZwpIdleInhibitManagerV1, _, _>(
            &queue_handle,
            1..=ZWP_IDLE_INHIBIT_MANAGER_V1_VERSION,
            (),
        ) {
            Ok(manager) => {
                log::info!("Bound to zwp_idle_inhibit_manager_v1");
                manager
            },
            Err(BindError::NotPresent) => {
                log::debug!("zwp_idle_inhibit_manager_v1 not available");
                return Err(PowerSaveError::Wayland(
                    "zwp_idle_inhibit_manager_v1 not offered by the compositor".to_string(),
                ));
            },
            Err(err) => {
                return Err(PowerSaveError::Wayland(format!(
                    "Failed to bind zwp_idle_inhibit_manager_v1: {:?}",
                    err
                )));
            },
        };

        Ok(Self {
            connection: connection.clone(),
            queue_handle,
            manager,
            inhibitors: Mutex::new(HashMap::new()),
            _queue: Mutex::new(queue),
        })
    }

    fn flush(&self) -> Result<(), PowerSaveError> {
        self.connection
            .flush()
            .map_err(|e| PowerSaveError::Wayland(format!("Failed to flush Wayland connection: {e}")))
    }
}

impl IdleInhibit for WaylandIdleInhibitor {
    fn prevent_display_sleep(&self, prevent: bool, window: &WindowHandle) -> Result<bool, PowerSaveError> {
        let Some(surface) = window.surface() else {
            return Err(PowerSaveError::Wayland("Window has no Wayland surface".to_string()));
        };
        // Protocol ids are recycled once a surface is gone, object ids are not
        let surface_id = surface.id();

        let mut inhibitors = self.inhibitors.lock().unwrap_or_else(PoisonError::into_inner);
        if prevent {
            if inhibitors.contains_key(&surface_id) {
                return Ok(false);
            }
            let inhibitor = self.manager.create_inhibitor(surface, &self.queue_handle, ());
            log::info!("Created idle inhibitor for surface {}", surface_id);
            inhibitors.insert(surface_id, inhibitor);
        } else {
            let Some(inhibitor) = inhibitors.remove(&surface_id) else {
                return Ok(false);
            };
            inhibitor.destroy();
            log::info!("Destroyed idle inhibitor for surface {}", surface_id);
        }
        drop(inhibitors);

        self.flush()?;
        Ok(true)
    }

    fn has_inhibitors(&self) -> bool {
        !self
            .inhibitors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl Drop for WaylandIdleInhibitor {
    fn drop(&mut self) {
        let inhibitors = self.inhibitors.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, inhibitor) in inhibitors.drain() {
            inhibitor.destroy();
        }
        self.manager.destroy();
        if let Err(err) = self.flush() {
            log::warn!("{err}");
        }
    }
}
